use crate::interpreter::Interpreter;
use crate::io_adapters::socket_pair;
use crate::play::RandomDraw;
use crate::session::Session;
use crate::store::QuizStore;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span, warn};

/// Accepts TCP clients and runs one independent session per connection.
///
/// Sessions share only the store and the (stateless) interpreter.
pub struct Server {
    store: Arc<dyn QuizStore>,
    interpreter: Arc<Interpreter>,
    seed: Option<u64>,
}

impl Server {
    pub fn new(store: Arc<dyn QuizStore>) -> Self {
        Self {
            store,
            interpreter: Arc::new(Interpreter::default()),
            seed: None,
        }
    }

    /// Derive every session's play order from `seed`.
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Build the `n`th session over `stream`.
    pub fn session<S>(&self, stream: S, n: u64) -> Session
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (channel, prompt) = socket_pair(stream);
        Session::new(channel, prompt, Arc::clone(&self.store))
            .with_draw(RandomDraw::for_session(self.seed, n))
    }

    /// Serve clients from `listener` until `shutdown` is cancelled, then wait for
    /// every open session to stop.
    pub async fn run(
        &self,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> anyhow::Result<()> {
        let mut sessions = JoinSet::new();
        let mut accepted = 0u64;
        if let Ok(addr) = listener.local_addr() {
            info!(%addr, "accepting quiz clients");
        }

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                Some(joined) = sessions.join_next(), if !sessions.is_empty() => {
                    reap(joined);
                }
                incoming = listener.accept() => {
                    let (stream, peer) = match incoming {
                        Ok(incoming) => incoming,
                        Err(e) => {
                            warn!(error = %e, "failed to accept client");
                            continue;
                        }
                    };
                    accepted += 1;
                    let mut session = self.session(stream, accepted);
                    let interpreter = Arc::clone(&self.interpreter);
                    let cancel = shutdown.child_token();
                    let span = info_span!("session", id = accepted, %peer);
                    sessions.spawn(
                        async move {
                            info!("client connected");
                            match interpreter.repl(&mut session, cancel).await {
                                Ok(()) => info!("client disconnected"),
                                Err(e) => warn!(error = %e, "session ended"),
                            }
                        }
                        .instrument(span),
                    );
                }
            }
        }

        info!(open = sessions.len(), "shutting down");
        while let Some(joined) = sessions.join_next().await {
            reap(joined);
        }
        Ok(())
    }
}

/// Log a session task that panicked or was aborted. Returns whether it ended cleanly.
fn reap(joined: Result<(), JoinError>) -> bool {
    match joined {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "session task failed");
            false
        }
    }
}
