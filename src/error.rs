use std::io;
use thiserror::Error;

/// Errors raised while a session executes a command.
///
/// Everything except [`QuizError::Closed`] and [`QuizError::Io`] is reported to the
/// client as an error line; those two end the session.
#[derive(Error, Debug)]
pub enum QuizError {
    #[error("missing parameter <id>")]
    MissingArgument,

    #[error("parameter <id> is not a number")]
    InvalidArgument,

    #[error("no such quiz id={0}")]
    NotFound(i64),

    #[error("the quiz is invalid")]
    Validation(Vec<String>),

    #[error("quiz store unavailable: {0}")]
    StoreUnavailable(String),

    /// Input ended while the session was waiting for a line.
    #[error("session closed")]
    Closed,

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl QuizError {
    /// Returns true when the session cannot continue after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Closed | Self::Io(_))
    }
}

/// Errors reported by a [`QuizStore`](crate::store::QuizStore).
#[derive(Error, Debug)]
pub enum StoreError {
    /// One or more fields were rejected; one message per field.
    #[error("validation failed")]
    Validation(Vec<String>),

    #[error("no such quiz id={0}")]
    NotFound(i64),

    #[error("{0}")]
    Unavailable(String),

    #[error("store file: {0}")]
    Io(#[from] io::Error),

    #[error("store file is malformed: {0}")]
    Format(#[from] serde_json::Error),
}

impl From<StoreError> for QuizError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(messages) => QuizError::Validation(messages),
            StoreError::NotFound(id) => QuizError::NotFound(id),
            other => QuizError::StoreUnavailable(other.to_string()),
        }
    }
}
