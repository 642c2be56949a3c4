use argh::FromArgs;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Port the quiz is served on unless `--listen` says otherwise.
pub const DEFAULT_PORT: u16 = 3030;

fn default_listen() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT))
}

#[derive(FromArgs, Debug)]
/// Serve an interactive quiz to many clients over TCP.
pub struct Options {
    #[argh(option, short = 'l', default = "default_listen()")]
    /// address to accept clients on. Defaults to 127.0.0.1:3030.
    pub listen: SocketAddr,

    #[argh(option, short = 's')]
    /// JSON file holding the quizzes; created with sample quizzes when missing.
    /// Quizzes are kept in memory only when omitted.
    pub store: Option<PathBuf>,

    #[argh(option)]
    /// seed for play rounds, making question order reproducible.
    pub seed: Option<u64>,

    #[argh(switch)]
    /// run a single session on this terminal instead of serving TCP clients.
    pub local: bool,

    #[argh(option, default = "String::from(\"info\")")]
    /// log filter such as `debug` or `quiz_server=trace`; RUST_LOG takes precedence.
    pub log_level: String,

    #[argh(switch)]
    /// do not color output.
    pub no_color: bool,
}

impl Options {
    /// Log filter from `RUST_LOG`, falling back to `--log-level`.
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.log_level))
    }
}
