//! Server-side accept context.

use bytes::BytesMut;
use std::net::SocketAddr;

/// Context carried by a server-side accept.
///
/// For externally-accepted connections the acceptor may already have read
/// bytes off the wire before handing the connection to the handshake
/// pipeline; the manager steals those into the chain's read buffer without
/// copying. Client-side handshakes carry no acceptor.
#[derive(Debug, Default)]
pub struct Acceptor {
    /// The connection was accepted outside the stack's own listener.
    pub external_connection: bool,
    /// Bytes the acceptor read before the pipeline took over.
    pub pending_data: Option<BytesMut>,
    /// Peer address observed at accept time, if known.
    pub peer_addr: Option<SocketAddr>,
}

impl Acceptor {
    /// Accept context for a connection owned by the stack's own listener.
    #[must_use]
    pub fn internal(peer_addr: Option<SocketAddr>) -> Self {
        Self {
            external_connection: false,
            pending_data: None,
            peer_addr,
        }
    }

    /// Accept context for an externally-accepted connection with bytes
    /// already read off the wire.
    #[must_use]
    pub fn external(pending_data: BytesMut, peer_addr: Option<SocketAddr>) -> Self {
        Self {
            external_connection: true,
            pending_data: Some(pending_data),
            peer_addr,
        }
    }
}
