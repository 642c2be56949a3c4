use crate::command::{Channel, LinePrompt};
use crate::error::QuizError;
use crate::out::{banner, colorize};
use crate::play::{Draw, RandomDraw};
use crate::store::QuizStore;
use colored::Color;
use std::io;
use std::sync::Arc;

/// One client's view of the quiz: its connection plus the collaborators
/// commands run against.
///
/// A session keeps no quiz data between commands. Per-command state such as a
/// play round lives in the command that owns it.
pub struct Session {
    channel: Box<dyn Channel>,
    prompt: Box<dyn LinePrompt>,
    store: Arc<dyn QuizStore>,
    draw: Box<dyn Draw>,
}

impl Session {
    /// Create a session whose play rounds draw from OS-seeded randomness.
    pub fn new(
        channel: impl Channel + 'static,
        prompt: impl LinePrompt + 'static,
        store: Arc<dyn QuizStore>,
    ) -> Self {
        Self {
            channel: Box::new(channel),
            prompt: Box::new(prompt),
            store,
            draw: Box::new(RandomDraw::from_os()),
        }
    }

    /// Replace the randomness source used by play rounds.
    pub fn with_draw(mut self, draw: impl Draw + 'static) -> Self {
        self.draw = Box::new(draw);
        self
    }

    pub fn store(&self) -> Arc<dyn QuizStore> {
        Arc::clone(&self.store)
    }

    pub(crate) fn draw(&mut self) -> &mut dyn Draw {
        self.draw.as_mut()
    }

    /// Write one line of text.
    pub async fn log(&mut self, text: &str) -> io::Result<()> {
        self.channel.write(&format!("{text}\n")).await
    }

    pub async fn log_colored(&mut self, text: &str, color: Color) -> io::Result<()> {
        self.log(&colorize(text, color)).await
    }

    /// Write `text` as a large-format banner.
    pub async fn biglog(&mut self, text: &str, color: Color) -> io::Result<()> {
        self.log(&colorize(banner(text), color)).await
    }

    /// Write one error line.
    pub async fn error(&mut self, text: &str) -> io::Result<()> {
        let line = format!("{}: {}", colorize("Error", Color::Red), colorize(text, Color::Red));
        self.log(&line).await
    }

    /// Write `err` the way the user should see it: one line, or one line per
    /// rejected field for validation failures.
    pub async fn report(&mut self, err: &QuizError) -> io::Result<()> {
        match err {
            QuizError::Validation(messages) => {
                self.error("The quiz is invalid:").await?;
                for message in messages {
                    self.error(message).await?;
                }
                Ok(())
            }
            other => self.error(&other.to_string()).await,
        }
    }

    /// Re-arm the prompt for the next command.
    pub async fn prompt(&mut self) -> io::Result<()> {
        self.prompt.prompt().await
    }

    pub(crate) async fn next_line(&mut self) -> io::Result<Option<String>> {
        self.prompt.next_line().await
    }

    /// Ask one question and wait for the reply, trimmed.
    ///
    /// Fails with [`QuizError::Closed`] if input ends first.
    pub async fn ask(&mut self, query: &str) -> Result<String, QuizError> {
        self.ask_with_initial(query, None).await
    }

    /// Like [`Session::ask`], pre-filling `initial` on interactive terminals.
    pub async fn ask_with_initial(
        &mut self,
        query: &str,
        initial: Option<&str>,
    ) -> Result<String, QuizError> {
        let initial = initial.filter(|_| self.channel.is_terminal());
        let query = colorize(query, Color::Red);
        match self.prompt.question(&query, initial).await? {
            Some(line) => Ok(line.trim().to_string()),
            None => Err(QuizError::Closed),
        }
    }

    /// Stop reading input and end the connection.
    pub async fn close(&mut self) -> io::Result<()> {
        self.prompt.close();
        self.channel.close().await
    }
}
