use crate::command::{CommandFactory, ExecutableCommand, Flow};
use crate::error::QuizError;
use crate::interpreter::Factory;
use crate::model::QuizDraft;
use crate::out::colorize;
use crate::play::{answers_match, play_round};
use crate::session::Session;
use crate::validate::validate_id;
use async_trait::async_trait;
use colored::Color;
use tracing::debug;

/// Built-in commands known to the quiz at compile time.
pub(crate) trait BuiltinCommand: Sized + Send + 'static {
    /// Executes the command on `session`.
    ///
    /// Errors are reported to the client by the caller, which then re-arms the
    /// prompt. Returning [`Flow::Quit`] skips the re-arm.
    fn run(
        self,
        session: &mut Session,
    ) -> impl std::future::Future<Output = Result<Flow, QuizError>> + Send;
}

/// A built-in command reachable by one or more verbs.
pub(crate) trait Verb: BuiltinCommand {
    /// Lower-case verbs this command answers to, e.g. `["p", "play"]`.
    fn names() -> &'static [&'static str];

    /// Build the command from the optional argument following the verb.
    fn from_arg(arg: Option<&str>) -> Self;
}

#[async_trait]
impl<T: BuiltinCommand> ExecutableCommand for T {
    async fn execute(self: Box<Self>, session: &mut Session) -> Result<Flow, QuizError> {
        match (*self).run(session).await {
            Ok(Flow::Quit) => return Ok(Flow::Quit),
            Ok(Flow::Continue) => {}
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                debug!(error = %e, "command failed");
                session.report(&e).await?;
            }
        }
        session.prompt().await?;
        Ok(Flow::Continue)
    }
}

impl<T: Verb> CommandFactory for Factory<T> {
    fn try_create(&self, name: &str, arg: Option<&str>) -> Option<Box<dyn ExecutableCommand>> {
        if T::names().contains(&name) {
            Some(Box::new(T::from_arg(arg)))
        } else {
            None
        }
    }
}

fn arrow() -> String {
    colorize("=>", Color::Magenta)
}

fn key(id: i64) -> String {
    colorize(id.to_string(), Color::Magenta)
}

/// Print the list of commands.
pub struct Help;

impl BuiltinCommand for Help {
    async fn run(self, session: &mut Session) -> Result<Flow, QuizError> {
        const LINES: &[&str] = &[
            "Commands:",
            "  h|help - Show this help.",
            "  list - List the existing quizzes.",
            "  show <id> - Show the question and the answer of the given quiz.",
            "  add - Add a new quiz interactively.",
            "  delete <id> - Delete the given quiz.",
            "  edit <id> - Edit the given quiz.",
            "  test <id> - Try to answer the given quiz.",
            "  p|play - Answer every quiz in random order.",
            "  credits - Credits.",
            "  q|quit - Leave the quiz.",
        ];
        for line in LINES {
            session.log(line).await?;
        }
        Ok(Flow::Continue)
    }
}

impl Verb for Help {
    fn names() -> &'static [&'static str] {
        &["h", "help"]
    }

    fn from_arg(_arg: Option<&str>) -> Self {
        Help
    }
}

/// Print every quiz question with its id.
pub struct List;

impl BuiltinCommand for List {
    async fn run(self, session: &mut Session) -> Result<Flow, QuizError> {
        for quiz in session.store().find_all().await? {
            session
                .log(&format!(" [{}]: {}", key(quiz.id), quiz.question))
                .await?;
        }
        Ok(Flow::Continue)
    }
}

impl Verb for List {
    fn names() -> &'static [&'static str] {
        &["list"]
    }

    fn from_arg(_arg: Option<&str>) -> Self {
        List
    }
}

/// Print the question and answer of one quiz.
pub struct Show {
    pub id: Option<String>,
}

impl BuiltinCommand for Show {
    async fn run(self, session: &mut Session) -> Result<Flow, QuizError> {
        let id = validate_id(self.id.as_deref())?;
        let quiz = session
            .store()
            .find_by_id(id)
            .await?
            .ok_or(QuizError::NotFound(id))?;
        session
            .log(&format!(
                " [{}]: {} {} {}",
                key(quiz.id),
                quiz.question,
                arrow(),
                quiz.answer
            ))
            .await?;
        Ok(Flow::Continue)
    }
}

impl Verb for Show {
    fn names() -> &'static [&'static str] {
        &["show"]
    }

    fn from_arg(arg: Option<&str>) -> Self {
        Show {
            id: arg.map(str::to_string),
        }
    }
}

/// Ask for a question and an answer, then store them as a new quiz.
pub struct Add;

impl BuiltinCommand for Add {
    async fn run(self, session: &mut Session) -> Result<Flow, QuizError> {
        let question = session.ask("Enter a question: ").await?;
        let answer = session.ask("Enter the answer: ").await?;
        let quiz = session
            .store()
            .create(QuizDraft::new(question, answer))
            .await?;
        session
            .log(&format!(
                " [{}] {}: {} {} {}",
                key(quiz.id),
                colorize("added", Color::Magenta),
                quiz.question,
                arrow(),
                quiz.answer
            ))
            .await?;
        Ok(Flow::Continue)
    }
}

impl Verb for Add {
    fn names() -> &'static [&'static str] {
        &["add"]
    }

    fn from_arg(_arg: Option<&str>) -> Self {
        Add
    }
}

/// Delete one quiz. Deleting a missing id is not an error.
pub struct Delete {
    pub id: Option<String>,
}

impl BuiltinCommand for Delete {
    async fn run(self, session: &mut Session) -> Result<Flow, QuizError> {
        let id = validate_id(self.id.as_deref())?;
        let removed = session.store().destroy(id).await?;
        debug!(id, removed, "delete");
        Ok(Flow::Continue)
    }
}

impl Verb for Delete {
    fn names() -> &'static [&'static str] {
        &["delete"]
    }

    fn from_arg(arg: Option<&str>) -> Self {
        Delete {
            id: arg.map(str::to_string),
        }
    }
}

/// Replace the question and answer of one quiz.
///
/// On terminals the current values are offered as editable text.
pub struct Edit {
    pub id: Option<String>,
}

impl BuiltinCommand for Edit {
    async fn run(self, session: &mut Session) -> Result<Flow, QuizError> {
        let id = validate_id(self.id.as_deref())?;
        let mut quiz = session
            .store()
            .find_by_id(id)
            .await?
            .ok_or(QuizError::NotFound(id))?;

        let question = session
            .ask_with_initial("Enter the question: ", Some(&quiz.question))
            .await?;
        let answer = session
            .ask_with_initial("Enter the answer: ", Some(&quiz.answer))
            .await?;
        quiz.question = question;
        quiz.answer = answer;

        let quiz = session.store().save(&quiz).await?;
        session
            .log(&format!(
                "Quiz [{}] changed to: {} {} {}",
                key(quiz.id),
                quiz.question,
                arrow(),
                quiz.answer
            ))
            .await?;
        Ok(Flow::Continue)
    }
}

impl Verb for Edit {
    fn names() -> &'static [&'static str] {
        &["edit"]
    }

    fn from_arg(arg: Option<&str>) -> Self {
        Edit {
            id: arg.map(str::to_string),
        }
    }
}

/// Ask one quiz and judge the reply.
pub struct Test {
    pub id: Option<String>,
}

impl BuiltinCommand for Test {
    async fn run(self, session: &mut Session) -> Result<Flow, QuizError> {
        let id = validate_id(self.id.as_deref())?;
        let quiz = session
            .store()
            .find_by_id(id)
            .await?
            .ok_or(QuizError::NotFound(id))?;

        let answer = session.ask(&format!("{}: ", quiz.question)).await?;
        if answers_match(&answer, &quiz.answer) {
            session.log("Your answer is correct.").await?;
            session.biglog("Correct", Color::Green).await?;
        } else {
            session.log("Your answer is incorrect.").await?;
            session.biglog("Incorrect", Color::Red).await?;
        }
        Ok(Flow::Continue)
    }
}

impl Verb for Test {
    fn names() -> &'static [&'static str] {
        &["test"]
    }

    fn from_arg(arg: Option<&str>) -> Self {
        Test {
            id: arg.map(str::to_string),
        }
    }
}

/// Play a round over every quiz.
pub struct Play;

impl BuiltinCommand for Play {
    async fn run(self, session: &mut Session) -> Result<Flow, QuizError> {
        play_round(session).await?;
        Ok(Flow::Continue)
    }
}

impl Verb for Play {
    fn names() -> &'static [&'static str] {
        &["p", "play"]
    }

    fn from_arg(_arg: Option<&str>) -> Self {
        Play
    }
}

pub struct Credits;

impl BuiltinCommand for Credits {
    async fn run(self, session: &mut Session) -> Result<Flow, QuizError> {
        session.log("Authors of this quiz:").await?;
        session
            .log_colored("Javier Guijarro Benitez", Color::Green)
            .await?;
        Ok(Flow::Continue)
    }
}

impl Verb for Credits {
    fn names() -> &'static [&'static str] {
        &["credits"]
    }

    fn from_arg(_arg: Option<&str>) -> Self {
        Credits
    }
}

/// Close the session.
pub struct Quit;

impl BuiltinCommand for Quit {
    async fn run(self, session: &mut Session) -> Result<Flow, QuizError> {
        session.close().await?;
        Ok(Flow::Quit)
    }
}

impl Verb for Quit {
    fn names() -> &'static [&'static str] {
        &["q", "quit"]
    }

    fn from_arg(_arg: Option<&str>) -> Self {
        Quit
    }
}

/// Fallback for verbs no factory recognizes.
pub(crate) struct Unknown {
    pub name: String,
}

impl BuiltinCommand for Unknown {
    async fn run(self, session: &mut Session) -> Result<Flow, QuizError> {
        session
            .log(&format!(
                "Unknown command: '{}'",
                colorize(&self.name, Color::Red)
            ))
            .await?;
        session
            .log("Use 'help' to see all available commands.")
            .await?;
        Ok(Flow::Continue)
    }
}
