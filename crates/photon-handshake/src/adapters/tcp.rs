//! TCP endpoint adapter.

use crate::domain::EndpointError;
use crate::ports::Endpoint;
use async_trait::async_trait;
use bytes::BytesMut;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// [`Endpoint`] over a tokio TCP stream.
///
/// This is the endpoint a handshake chain typically starts from; TLS-like
/// handshakers replace it with their own wrapping endpoint as negotiation
/// progresses.
pub struct TcpEndpoint {
    stream: TcpStream,
    peer: Option<SocketAddr>,
    local: Option<SocketAddr>,
}

impl TcpEndpoint {
    /// Wrap a connected stream. Addresses are captured up front so they
    /// stay observable after the peer disconnects.
    #[must_use]
    pub fn new(stream: TcpStream) -> Self {
        let peer = stream.peer_addr().ok();
        let local = stream.local_addr().ok();
        Self {
            stream,
            peer,
            local,
        }
    }

    /// Recover the underlying stream, e.g. to hand it to a framing layer
    /// after the handshake completes.
    #[must_use]
    pub fn into_inner(self) -> TcpStream {
        self.stream
    }
}

#[async_trait]
impl Endpoint for TcpEndpoint {
    async fn read(&mut self, buf: &mut BytesMut) -> Result<usize, EndpointError> {
        let n = self.stream.read_buf(buf).await?;
        Ok(n)
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), EndpointError> {
        self.stream.write_all(data).await?;
        Ok(())
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        self.local
    }
}
