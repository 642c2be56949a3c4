use crate::builtin::Unknown;
use crate::command::{CommandFactory, ExecutableCommand, Flow};
use crate::error::QuizError;
use crate::session::Session;
use colored::Color;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Factory allows creating instances of ExecutableCommand.
///
/// Only supports commands defined in this crate.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<fn() -> T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// Reads command lines from a session and dispatches them to commands.
///
/// The interpreter keeps no per-client state, so one instance serves every
/// session. See [`Default`] for the commands included out of the box.
pub struct Interpreter {
    commands: Vec<Box<dyn CommandFactory>>,
}

impl Interpreter {
    /// Create a new interpreter with a custom set of command factories.
    pub fn new(commands: Vec<Box<dyn CommandFactory>>) -> Self {
        Self { commands }
    }

    /// Split `line` into a lower-case verb and its first argument.
    ///
    /// Returns `None` for blank lines.
    pub fn tokenize(line: &str) -> Option<(String, Option<&str>)> {
        let mut words = line.split_whitespace();
        let verb = words.next()?.to_lowercase();
        Some((verb, words.next()))
    }

    fn create(&self, verb: &str, arg: Option<&str>) -> Box<dyn ExecutableCommand> {
        self.commands
            .iter()
            .find_map(|factory| factory.try_create(verb, arg))
            .unwrap_or_else(|| {
                Box::new(Unknown {
                    name: verb.to_string(),
                })
            })
    }

    /// Execute one command line on `session`.
    ///
    /// Blank lines only re-arm the prompt.
    pub async fn execute_line(
        &self,
        session: &mut Session,
        line: &str,
    ) -> Result<Flow, QuizError> {
        let Some((verb, arg)) = Self::tokenize(line) else {
            session.prompt().await?;
            return Ok(Flow::Continue);
        };
        debug!(%verb, ?arg, "dispatch");
        self.create(&verb, arg).execute(session).await
    }

    /// Drive `session` until the client quits, input ends, or `cancel` fires.
    ///
    /// Cancellation drops whatever the session was waiting for without writing
    /// anything more to the client.
    pub async fn repl(
        &self,
        session: &mut Session,
        cancel: CancellationToken,
    ) -> Result<(), QuizError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("session cancelled");
                Ok(())
            }
            result = self.serve(session) => result,
        }
    }

    async fn serve(&self, session: &mut Session) -> Result<(), QuizError> {
        session.biglog("CORE Quiz", Color::Green).await?;
        session.prompt().await?;
        while let Some(line) = session.next_line().await? {
            match self.execute_line(session, &line).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => {
                    info!("client quit");
                    return Ok(());
                }
                Err(QuizError::Closed) => break,
                Err(e) => return Err(e),
            }
        }
        info!("client input ended");
        Ok(())
    }
}

impl Default for Interpreter {
    /// Create an interpreter with every built-in quiz command.
    fn default() -> Self {
        use crate::builtin::*;
        Self::new(vec![
            Box::new(Factory::<Help>::default()),
            Box::new(Factory::<List>::default()),
            Box::new(Factory::<Show>::default()),
            Box::new(Factory::<Add>::default()),
            Box::new(Factory::<Delete>::default()),
            Box::new(Factory::<Edit>::default()),
            Box::new(Factory::<Test>::default()),
            Box::new(Factory::<Play>::default()),
            Box::new(Factory::<Credits>::default()),
            Box::new(Factory::<Quit>::default()),
        ])
    }
}
