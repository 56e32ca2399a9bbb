/// Errors that can occur while running the gateway.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind the listening socket.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    /// The listening socket can no longer accept connections.
    #[error("failed to accept connections: {0}")]
    Accept(std::io::Error),

    /// An I/O error occurred on a connection.
    #[error("connection I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Errors reported by a [`Publisher`](crate::publish::Publisher).
///
/// The aggregation store logs these and drops the reading; they never end a
/// connection.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// The bus side is gone.
    #[error("publisher closed")]
    Closed,

    /// The bus refused the message.
    #[error("publish rejected: {0}")]
    Rejected(String),
}

pub type Result<T> = std::result::Result<T, ServerError>;
