//! Source trait for inbound datagrams

use bytes::Bytes;
use std::net::SocketAddr;

use crate::Result;

/// One received datagram and its sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    pub bytes: Bytes,
    pub from: SocketAddr,
}

/// Trait for inbound byte sources
///
/// Sources abstract over where raw MAVLink bytes come from (a UDP socket, a
/// scripted test feed). They deliver whole datagrams in arrival order; framing
/// is left to the stream parser.
#[async_trait::async_trait]
pub trait DatagramSource: Send + 'static {
    /// Wait for the next datagram
    ///
    /// Returns:
    /// - `Ok(Some(datagram))` - Bytes arrived
    /// - `Ok(None)` - Source closed (normal termination)
    /// - `Err(e)` - Receive failed; the driver retries with backoff
    async fn next_datagram(&mut self) -> Result<Option<Datagram>>;

    /// Local address the source listens on, if any
    fn local_addr(&self) -> Option<SocketAddr>;
}
