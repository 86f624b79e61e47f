//! Domain errors for connection establishment.

use thiserror::Error;

/// Errors surfaced by the handshake pipeline.
///
/// The first terminal condition wins and is delivered exactly once through
/// the completion callback; errors are never recovered inside the pipeline.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HandshakeError {
    /// A handshaker rejected the connection. The message is surfaced
    /// verbatim to the caller.
    #[error("{0}")]
    Failed(String),

    /// The chain was shut down before it completed.
    ///
    /// Synthesized only when the shutdown raced an ok completion; a
    /// handshaker's own error always wins over the shutdown reason.
    #[error("handshaker shutdown")]
    Shutdown,

    /// The deadline elapsed before the chain completed.
    #[error("Handshake timed out")]
    TimedOut,
}

impl HandshakeError {
    /// Build a handshaker failure from any displayable reason.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }
}

/// Errors produced by endpoint I/O.
#[derive(Debug, Error)]
pub enum EndpointError {
    /// The peer closed the connection.
    #[error("Endpoint closed by peer")]
    Closed,

    /// Underlying transport failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<EndpointError> for HandshakeError {
    fn from(error: EndpointError) -> Self {
        Self::Failed(error.to_string())
    }
}
