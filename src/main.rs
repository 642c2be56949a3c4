use anyhow::{Context, Result};
use quiz_server::config::Options;
use quiz_server::io_adapters::{RustylinePrompt, TerminalChannel};
use quiz_server::play::RandomDraw;
use quiz_server::{Interpreter, MemoryStore, QuizStore, Server, Session};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let options: Options = argh::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(options.env_filter())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if options.no_color {
        colored::control::set_override(false);
    } else if !options.local {
        // Clients are terminals even though our own stdout may not be.
        colored::control::set_override(true);
    }

    let store: Arc<dyn QuizStore> = match &options.store {
        Some(path) => Arc::new(
            MemoryStore::open(path)
                .await
                .with_context(|| format!("can't open quiz store {}", path.display()))?,
        ),
        None => Arc::new(MemoryStore::default()),
    };

    if options.local {
        return run_local(store, options.seed).await;
    }

    let listener = TcpListener::bind(options.listen)
        .await
        .with_context(|| format!("can't listen on {}", options.listen))?;

    let shutdown = CancellationToken::new();
    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("interrupt received"),
            Err(e) => warn!(error = %e, "can't listen for interrupt"),
        }
        on_signal.cancel();
    });

    Server::new(store)
        .with_seed(options.seed)
        .run(listener, shutdown)
        .await
}

async fn run_local(store: Arc<dyn QuizStore>, seed: Option<u64>) -> Result<()> {
    let prompt = RustylinePrompt::spawn().context("can't start the line editor")?;
    let mut session = Session::new(TerminalChannel::new(), prompt, store)
        .with_draw(RandomDraw::for_session(seed, 0));
    Interpreter::default()
        .repl(&mut session, CancellationToken::new())
        .await
        .context("local session failed")
}
