use crate::error::QuizError;
use crate::session::Session;
use async_trait::async_trait;
use std::io;

/// What the read loop does once a command has finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// The prompt was re-armed; read the next command.
    Continue,
    /// The session was closed by the command.
    Quit,
}

/// Output half of a client connection.
///
/// Implementors typically wrap a socket write half or the process stdout.
#[async_trait]
pub trait Channel: Send {
    /// Write `text` verbatim to the client.
    async fn write(&mut self, text: &str) -> io::Result<()>;

    /// End the connection. Writes after `close` fail.
    async fn close(&mut self) -> io::Result<()>;

    /// Whether the client is an interactive terminal that supports pre-filled input.
    fn is_terminal(&self) -> bool {
        false
    }
}

/// Input half of a client connection, read one line at a time.
///
/// A session has at most one outstanding read on its prompt.
#[async_trait]
pub trait LinePrompt: Send {
    /// Show the command marker so the client knows the next command is awaited.
    async fn prompt(&mut self) -> io::Result<()>;

    /// Next command line, without the line terminator. `None` once input ended.
    async fn next_line(&mut self) -> io::Result<Option<String>>;

    /// Display `query` and return the line typed in reply.
    ///
    /// `initial` is offered as editable text by prompts that can edit lines;
    /// others ignore it. `None` once input ended.
    async fn question(&mut self, query: &str, initial: Option<&str>)
    -> io::Result<Option<String>>;

    /// Stop accepting input. Subsequent reads return `None`.
    fn close(&mut self);
}

/// Object-safe trait for any command that can be executed on a session.
///
/// Implemented by built-ins via a blanket impl.
#[async_trait]
pub trait ExecutableCommand: Send {
    /// Executes the command and re-arms the prompt unless the session was closed.
    ///
    /// Only errors that make the session unusable are returned.
    async fn execute(self: Box<Self>, session: &mut Session) -> Result<Flow, QuizError>;
}

/// Factory that tries to create a command from a verb and its argument.
///
/// Returns `None` when the factory doesn't recognize the `name`.
pub trait CommandFactory: Send + Sync {
    /// Attempt to create a command instance for the provided verb and argument.
    fn try_create(&self, name: &str, arg: Option<&str>) -> Option<Box<dyn ExecutableCommand>>;
}
