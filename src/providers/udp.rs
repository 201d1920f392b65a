//! UDP datagram source

use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tracing::{info, trace};

use crate::provider::{Datagram, DatagramSource};
use crate::{LinkError, Result};

/// Largest UDP payload we accept.
const MAX_DATAGRAM: usize = 65_536;

/// Receives from a socket shared with the sending half of the link.
pub struct UdpSource {
    socket: Arc<UdpSocket>,
    buf: Vec<u8>,
}

impl UdpSource {
    pub fn new(socket: Arc<UdpSocket>) -> Self {
        Self { socket, buf: vec![0u8; MAX_DATAGRAM] }
    }

    /// Bind a socket for a link endpoint.
    pub async fn bind(addr: SocketAddr) -> Result<Arc<UdpSocket>> {
        let socket =
            UdpSocket::bind(addr).await.map_err(|e| LinkError::bind_failed(addr.to_string(), e))?;
        info!(local = %addr, bound = ?socket.local_addr().ok(), "UDP endpoint bound");
        Ok(Arc::new(socket))
    }
}

#[async_trait::async_trait]
impl DatagramSource for UdpSource {
    async fn next_datagram(&mut self) -> Result<Option<Datagram>> {
        let (len, from) = self.socket.recv_from(&mut self.buf).await.map_err(|e| {
            let addr = self.local_addr().map(|a| a.to_string()).unwrap_or_default();
            LinkError::receive_failed(addr, e)
        })?;
        trace!(len, %from, "Datagram received");
        Ok(Some(Datagram { bytes: Bytes::copy_from_slice(&self.buf[..len]), from }))
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.local_addr().ok()
    }
}
