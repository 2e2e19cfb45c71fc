//! Source trait for raw datagrams

use std::net::SocketAddr;

/// One raw datagram as received from the network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    /// Payload bytes, exactly as long as the datagram
    pub payload: Vec<u8>,

    /// Sender address
    pub peer: SocketAddr,
}

impl Datagram {
    pub fn new(payload: Vec<u8>, peer: SocketAddr) -> Self {
        Self { payload, peer }
    }
}

/// Trait for datagram sources
///
/// Sources abstract over where datagrams come from (a UDP socket, an
/// in-process channel). The listener owns its source, so dropping the
/// listener releases whatever the source holds.
#[async_trait::async_trait]
pub trait DatagramSource: Send + 'static {
    /// Wait for the next datagram.
    ///
    /// Returns:
    /// - `Ok(datagram)` - A datagram arrived
    /// - `Err(e)` - The transport failed; no further datagrams will arrive
    ///
    /// Implementations must be cancel safe: the listener races this future
    /// against its cancellation token and drops it when cancellation wins.
    async fn next_datagram(&mut self) -> std::io::Result<Datagram>;

    /// Local address of the underlying endpoint, if it has one
    fn local_addr(&self) -> Option<SocketAddr>;
}
