//! Listener owns the datagram source and runs the receive/decode/dispatch loop

use std::net::IpAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::codec;
use crate::config::{ListenerConfig, source_matches};
use crate::dispatcher::Dispatcher;
use crate::source::DatagramSource;
use crate::sources::UdpSource;
use crate::{Result, TransportError};

/// Counters collected over one listen run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenStats {
    /// Datagrams read from the source, filtered ones included
    pub datagrams: u64,
    pub frames: u64,
    pub decode_errors: u64,
    /// Datagrams dropped by the source-host filter
    pub filtered: u64,
}

/// Why the listen loop stopped
#[derive(Debug)]
pub enum ListenOutcome {
    /// The cancellation token fired
    Cancelled(ListenStats),

    /// The transport failed. The error has already been delivered to observers.
    Failed(ListenStats, TransportError),
}

impl ListenOutcome {
    pub fn stats(&self) -> ListenStats {
        match self {
            ListenOutcome::Cancelled(stats) | ListenOutcome::Failed(stats, _) => *stats,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ListenOutcome::Cancelled(_))
    }

    /// Convert into a `Result`, surfacing transport failures
    pub fn into_result(self) -> Result<ListenStats> {
        match self {
            ListenOutcome::Cancelled(stats) => Ok(stats),
            ListenOutcome::Failed(_, error) => Err(error),
        }
    }
}

/// Receive loop over a single datagram source
///
/// One listener feeds one [`Dispatcher`]. Delivery is synchronous with
/// reception: the next datagram is not read until every observer has handled
/// the current one, so slow observers push back onto the OS socket buffer.
pub struct Listener<S = UdpSource> {
    source: S,

    /// Only datagrams from this host are decoded
    source_filter: Option<IpAddr>,
}

impl Listener<UdpSource> {
    /// Bind a UDP listener.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Bind`] if the socket cannot be bound. No
    /// loop is started in that case.
    pub async fn bind(config: &ListenerConfig) -> Result<Self> {
        let source = UdpSource::bind(config.bind_addr()).await?;
        Ok(Self::new(source).with_source_filter(config.source))
    }
}

impl<S: DatagramSource> Listener<S> {
    pub fn new(source: S) -> Self {
        Self { source, source_filter: None }
    }

    /// Drop datagrams that were not sent by `host`
    pub fn with_source_filter(mut self, host: Option<IpAddr>) -> Self {
        self.source_filter = host;
        self
    }

    pub fn local_addr(&self) -> Option<std::net::SocketAddr> {
        self.source.local_addr()
    }

    /// Run the loop on a tokio task
    pub fn spawn(
        self,
        dispatcher: Arc<Dispatcher>,
        cancel: CancellationToken,
    ) -> JoinHandle<ListenOutcome> {
        tokio::spawn(async move { self.listen(&dispatcher, cancel).await })
    }

    /// Receive, decode and dispatch until cancelled or the transport fails.
    ///
    /// - Decoded frames go to [`Dispatcher::next`]
    /// - Undecodable datagrams go to [`Dispatcher::decode_error`] and the
    ///   loop continues
    /// - A source failure goes to [`Dispatcher::transport_error`] and ends
    ///   the loop
    ///
    /// The dispatcher is reopened first, so a dispatcher completed by an
    /// earlier run delivers this run's events. On every exit
    /// [`Dispatcher::complete`] runs once, after which the source is dropped.
    pub async fn listen(self, dispatcher: &Dispatcher, cancel: CancellationToken) -> ListenOutcome {
        let Listener { mut source, source_filter } = self;
        info!(local_addr = ?source.local_addr(), source_filter = ?source_filter, "Listener started");

        // Completion belongs to one run; a restarted listener feeds the same
        // subscribers again
        if dispatcher.reopen() {
            debug!("Dispatcher reopened after a previous run");
        }

        let mut stats = ListenStats::default();

        let failure = loop {
            // Cancellation wins ties so a busy socket cannot starve shutdown
            let received = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Listener cancelled");
                    break None;
                }
                received = source.next_datagram() => received,
            };

            let datagram = match received {
                Ok(datagram) => datagram,
                Err(e) => {
                    let error = TransportError::receive(e);
                    error!(error = %error, cause = ?error.kind(), "Transport failed, stopping listener");
                    dispatcher.transport_error(&error).await;
                    break Some(error);
                }
            };

            stats.datagrams += 1;

            if !source_matches(source_filter, &datagram.peer) {
                stats.filtered += 1;
                trace!(peer = %datagram.peer, "Datagram from unexpected host dropped");
                continue;
            }

            match codec::decode(&datagram.payload) {
                Ok(frame) => {
                    stats.frames += 1;
                    trace!(
                        frame = stats.frames,
                        timestamp_ms = frame.core.timestamp_ms,
                        dash = frame.has_dash(),
                        "Frame decoded"
                    );
                    dispatcher.next(&frame).await;
                }
                Err(e) => {
                    stats.decode_errors += 1;
                    warn!(peer = %datagram.peer, error = %e, "Dropping malformed datagram");
                    dispatcher.decode_error(&e).await;
                }
            }
        };

        dispatcher.complete().await;
        drop(source);

        info!(
            datagrams = stats.datagrams,
            frames = stats.frames,
            decode_errors = stats.decode_errors,
            filtered = stats.filtered,
            "Listener stopped"
        );
        debug!(failed = failure.is_some(), "Source released");

        match failure {
            Some(error) => ListenOutcome::Failed(stats, error),
            None => ListenOutcome::Cancelled(stats),
        }
    }
}
