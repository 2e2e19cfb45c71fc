//! UDP socket source

use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tracing::{debug, info, trace};

use crate::config::MAX_DATAGRAM_SIZE;
use crate::source::{Datagram, DatagramSource};
use crate::{Result, TransportError};

/// Datagram source backed by a bound tokio UDP socket
pub struct UdpSource {
    socket: UdpSocket,

    /// Receive buffer, reused across datagrams
    buf: Box<[u8]>,
}

impl UdpSource {
    /// Bind a UDP socket on `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Bind`] if the address is unavailable.
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(addr).await.map_err(|e| TransportError::bind(addr, e))?;

        info!(
            local_addr = %socket.local_addr().map_err(|e| TransportError::bind(addr, e))?,
            "Bound UDP telemetry socket"
        );

        Ok(Self::from_socket(socket))
    }

    /// Wrap an already bound socket
    pub fn from_socket(socket: UdpSocket) -> Self {
        Self { socket, buf: vec![0u8; MAX_DATAGRAM_SIZE].into_boxed_slice() }
    }
}

#[async_trait::async_trait]
impl DatagramSource for UdpSource {
    async fn next_datagram(&mut self) -> std::io::Result<Datagram> {
        // recv_from is cancel safe: if the future is dropped no data was consumed
        let (len, peer) = self.socket.recv_from(&mut self.buf).await?;
        trace!(len, %peer, "Datagram received");

        let payload = self.buf.get(..len).map(<[u8]>::to_vec).unwrap_or_default();
        Ok(Datagram::new(payload, peer))
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.local_addr().ok()
    }
}

impl Drop for UdpSource {
    fn drop(&mut self) {
        debug!(local_addr = ?self.local_addr(), "Releasing UDP telemetry socket");
    }
}
