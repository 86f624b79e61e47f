//! Byte endpoint port.

use crate::domain::EndpointError;
use async_trait::async_trait;
use bytes::BytesMut;
use std::net::SocketAddr;

/// An exclusively-owned, bidirectional byte channel - outbound port.
///
/// The pipeline itself never reads or writes; it only carries the endpoint
/// from handshaker to handshaker. A handshaker may replace the endpoint it
/// was handed with a wrapped one (TLS over TCP, for example) by taking the
/// current value out of the handshake state and installing its own.
#[async_trait]
pub trait Endpoint: Send {
    /// Read available bytes into `buf`, returning how many arrived.
    /// A return of `0` means the peer half-closed the connection.
    async fn read(&mut self, buf: &mut BytesMut) -> Result<usize, EndpointError>;

    /// Write all of `data` to the peer.
    async fn write(&mut self, data: &[u8]) -> Result<(), EndpointError>;

    /// Address of the remote peer, if known.
    fn peer_addr(&self) -> Option<SocketAddr>;

    /// Local address of this endpoint, if known.
    fn local_addr(&self) -> Option<SocketAddr>;
}
