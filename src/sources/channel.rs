//! In-process datagram source

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tokio::sync::mpsc;

use crate::source::{Datagram, DatagramSource};

const DEFAULT_CAPACITY: usize = 64;

/// Loopback peer used for datagrams pushed without an explicit sender
pub const LOCAL_PEER: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0);

/// Datagram source fed from an mpsc channel
///
/// Useful for replaying captured datagrams and for driving the listener in
/// tests without a socket. When every [`DatagramSender`] is dropped the source
/// reports `UnexpectedEof`, which the listener treats like a dead socket.
pub struct ChannelSource {
    rx: mpsc::Receiver<std::io::Result<Datagram>>,
}

/// Sending half of a [`ChannelSource`]
#[derive(Clone)]
pub struct DatagramSender {
    tx: mpsc::Sender<std::io::Result<Datagram>>,
}

impl ChannelSource {
    /// Create a sender/source pair with the default buffer capacity
    pub fn channel() -> (DatagramSender, Self) {
        Self::channel_with_capacity(DEFAULT_CAPACITY)
    }

    pub fn channel_with_capacity(capacity: usize) -> (DatagramSender, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (DatagramSender { tx }, Self { rx })
    }
}

impl DatagramSender {
    /// Queue a payload from [`LOCAL_PEER`].
    ///
    /// Returns `false` once the source has been dropped.
    pub async fn send(&self, payload: impl Into<Vec<u8>>) -> bool {
        self.send_from(payload, LOCAL_PEER).await
    }

    /// Queue a payload from a specific peer
    pub async fn send_from(&self, payload: impl Into<Vec<u8>>, peer: SocketAddr) -> bool {
        self.tx.send(Ok(Datagram::new(payload.into(), peer))).await.is_ok()
    }

    /// Queue a transport failure
    pub async fn fail(&self, error: std::io::Error) -> bool {
        self.tx.send(Err(error)).await.is_ok()
    }
}

#[async_trait::async_trait]
impl DatagramSource for ChannelSource {
    async fn next_datagram(&mut self) -> std::io::Result<Datagram> {
        match self.rx.recv().await {
            Some(item) => item,
            None => Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "all datagram senders dropped",
            )),
        }
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_in_order_then_eof() {
        let (tx, mut source) = ChannelSource::channel();
        assert!(tx.send(vec![1u8]).await);
        assert!(tx.send(vec![2u8, 2]).await);
        drop(tx);

        assert_eq!(source.next_datagram().await.unwrap().payload, vec![1]);
        assert_eq!(source.next_datagram().await.unwrap().payload, vec![2, 2]);

        let err = source.next_datagram().await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn injected_faults_surface_as_errors() {
        let (tx, mut source) = ChannelSource::channel();
        assert!(tx.fail(std::io::Error::from(std::io::ErrorKind::ConnectionReset)).await);

        let err = source.next_datagram().await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::ConnectionReset);
    }
}
