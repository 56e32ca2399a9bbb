use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::config::ServerConfig;
use crate::connection::handle_connection;
use crate::error::{Result, ServerError};
use crate::publish::Publisher;
use crate::store::AggregationStore;

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);
const MAX_ACCEPT_BACKOFF: Duration = Duration::from_secs(1);

/// Accepts reader connections and runs one independent pipeline per peer.
pub struct RfidListener {
    listener: TcpListener,
    config: Arc<ServerConfig>,
    publisher: Arc<dyn Publisher>,
    next_conn_id: u64,
}

impl RfidListener {
    /// Validate `config` and bind its listen address.
    pub async fn bind(config: ServerConfig, publisher: Arc<dyn Publisher>) -> Result<Self> {
        config.validate()?;

        let listener = TcpListener::bind(config.listen_addr.as_str())
            .await
            .map_err(|source| ServerError::Bind {
                addr: config.listen_addr.clone(),
                source,
            })?;
        tracing::info!(
            addr = %listener.local_addr()?,
            debounce_ms = config.debounce.as_millis() as u64,
            topic = %config.topic,
            "listening for readers"
        );

        Ok(Self {
            listener,
            config: Arc::new(config),
            publisher,
            next_conn_id: 1,
        })
    }

    /// Bound socket address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until `shutdown` fires.
    ///
    /// On the way out every connection is told to stop and awaited, so bursts
    /// still inside their debounce window are published before this returns.
    /// Fails only when the listening socket itself is unusable; running out of
    /// descriptors or memory is retried with a growing backoff.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<()> {
        let conn_shutdown = shutdown.child_token();
        let mut connections = JoinSet::new();
        let mut failures = 0u32;

        let result = loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break Ok(()),

                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    log_join(joined);
                }

                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        failures = 0;
                        let shutdown = conn_shutdown.clone();
                        self.spawn_connection(&mut connections, stream, peer, shutdown);
                    }
                    Err(err) if is_peer_abort(err.kind()) => {
                        tracing::debug!(error = %err, "connection aborted before accept");
                    }
                    Err(err) if is_fatal_accept(err.kind()) => {
                        tracing::error!(error = %err, "listening socket unusable");
                        break Err(ServerError::Accept(err));
                    }
                    Err(err) => {
                        failures = failures.saturating_add(1);
                        let backoff = accept_backoff(failures);
                        tracing::warn!(
                            error = %err,
                            failures,
                            backoff_ms = backoff.as_millis() as u64,
                            "accept failed, backing off"
                        );
                        tokio::select! {
                            _ = shutdown.cancelled() => break Ok(()),
                            _ = tokio::time::sleep(backoff) => {}
                        }
                    }
                },
            }
        };

        conn_shutdown.cancel();
        let open = connections.len();
        if open > 0 {
            tracing::info!(connections = open, "closing reader connections");
        }
        while let Some(joined) = connections.join_next().await {
            log_join(joined);
        }
        tracing::info!("listener stopped");

        result
    }

    fn spawn_connection(
        &mut self,
        connections: &mut JoinSet<()>,
        stream: TcpStream,
        peer: SocketAddr,
        shutdown: CancellationToken,
    ) {
        let id = self.next_conn_id;
        self.next_conn_id += 1;

        let store = AggregationStore::new(Arc::clone(&self.publisher), &self.config);
        let config = Arc::clone(&self.config);
        let span = tracing::info_span!("connection", conn = %format!("conn-{id}"), %peer);

        connections.spawn(
            async move {
                tracing::info!("reader connected");
                match handle_connection(stream, store, &config, shutdown).await {
                    Ok(stats) => tracing::info!(frames = stats.frames, "reader disconnected"),
                    Err(err) => tracing::warn!(error = %err, "reader connection failed"),
                }
            }
            .instrument(span),
        );
    }
}

fn log_join(joined: std::result::Result<(), JoinError>) {
    if let Err(err) = joined {
        if err.is_panic() {
            tracing::error!(error = %err, "connection task panicked");
        }
    }
}

fn is_peer_abort(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::ConnectionAborted | ErrorKind::ConnectionReset | ErrorKind::Interrupted
    )
}

/// Errors that mean the socket is no longer listening. Everything else,
/// including `EMFILE`/`ENFILE` and `ENOBUFS`, is treated as transient.
fn is_fatal_accept(kind: ErrorKind) -> bool {
    matches!(kind, ErrorKind::InvalidInput | ErrorKind::NotConnected)
}

/// Linear backoff per consecutive failure, capped at one second.
fn accept_backoff(failures: u32) -> Duration {
    ACCEPT_BACKOFF
        .saturating_mul(failures.max(1))
        .min(MAX_ACCEPT_BACKOFF)
}
