//! An interactive quiz served to many clients at once.
//!
//! Every client gets its own [`Session`]: a line-oriented command loop to list,
//! show, add, edit, delete and test quizzes, or to play a randomized round over
//! all of them. Sessions share nothing but the [`QuizStore`].
//!
//! The main entry points are [`Interpreter`], which reads command lines from a
//! session and dispatches them to the built-in commands, and [`Server`], which
//! accepts TCP clients and runs one session per connection. The [`command`]
//! module exposes the channel and prompt traits a session runs over, and
//! [`io_adapters`] provides implementations for sockets, the local terminal and
//! in-memory testing.

mod builtin;
pub mod command;
pub mod config;
pub mod error;
mod interpreter;
pub mod io_adapters;
pub mod model;
pub mod out;
pub mod play;
mod server;
mod session;
pub mod store;
pub mod validate;

pub use builtin::{Add, Credits, Delete, Edit, Help, List, Play, Quit, Show, Test};
pub use error::{QuizError, StoreError};
pub use interpreter::Interpreter;
pub use server::Server;
pub use session::Session;
pub use store::{MemoryStore, QuizStore};
