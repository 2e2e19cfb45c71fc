//! Error types for telemetry ingestion.
//!
//! The pipeline separates failures by how far they reach:
//!
//! - **Decode errors**: a single datagram did not match a known layout. The
//!   listener reports it on the domain error channel and keeps receiving.
//! - **Transport errors**: the socket itself failed (bind or receive). These
//!   end the listen loop and are always followed by completion.
//! - **Sink errors**: raised by key-value sinks. Consumers handle them locally;
//!   they never travel through the dispatcher.
//! - **Config errors**: invalid or unreadable relay configuration.
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use slipstream::TransportError;
//!
//! let error = TransportError::receive(std::io::Error::other("network down"));
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for listener operations.
pub type Result<T, E = TransportError> = std::result::Result<T, E>;

/// A datagram could not be decoded into a telemetry frame.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecodeError {
    #[error(
        "unrecognized datagram length {0} (expected {core} or {extended} bytes)",
        core = crate::codec::CORE_SIZE,
        extended = crate::codec::EXTENDED_SIZE
    )]
    UnrecognizedLength(usize),
}

/// The datagram transport failed and can no longer deliver telemetry.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TransportError {
    #[error("Failed to bind UDP socket on {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to receive datagram")]
    Receive {
        #[source]
        source: std::io::Error,
    },
}

impl TransportError {
    /// Helper constructor for bind failures.
    pub fn bind(addr: SocketAddr, source: std::io::Error) -> Self {
        TransportError::Bind { addr, source }
    }

    /// Helper constructor for receive failures.
    pub fn receive(source: std::io::Error) -> Self {
        TransportError::Receive { source }
    }

    /// Underlying I/O error kind.
    pub fn kind(&self) -> std::io::ErrorKind {
        match self {
            TransportError::Bind { source, .. } | TransportError::Receive { source } => {
                source.kind()
            }
        }
    }

    /// Returns whether restarting the listener could plausibly succeed.
    ///
    /// The current listener never retries by itself; this is guidance for the
    /// host process deciding whether to restart.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Bind { source, .. } => {
                !matches!(source.kind(), std::io::ErrorKind::PermissionDenied)
            }
            TransportError::Receive { source } => !matches!(
                source.kind(),
                std::io::ErrorKind::UnexpectedEof | std::io::ErrorKind::PermissionDenied
            ),
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            TransportError::Bind { .. } => vec![
                "Check no other process is listening on the port",
                "Use a port above 1024 or run with sufficient privileges",
                "Verify the bind address belongs to this host",
            ],
            TransportError::Receive { .. } => vec![
                "Check the network interface is still up",
                "Restart the listener",
                "Verify the game's Data Out settings",
            ],
        }
    }
}

/// A key-value sink rejected or failed a write.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SinkError {
    #[error("Key-value sink I/O error")]
    Io(#[from] std::io::Error),

    #[error("Key-value sink rejected SET {key}: {reply}")]
    Protocol { key: String, reply: String },

    #[error("Key-value sink connection closed")]
    Closed,
}

/// Relay configuration could not be loaded.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("Failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_yaml_ng::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn decode_error_message_names_the_length(len in 0usize..4096) {
            let msg = DecodeError::UnrecognizedLength(len).to_string();
            prop_assert!(msg.contains(&len.to_string()));
            prop_assert!(msg.contains("232"));
            prop_assert!(msg.contains("312"));
        }
    }

    #[test]
    fn transport_error_chains_io_source() {
        let err = TransportError::receive(std::io::Error::other("cable unplugged"));
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("cable unplugged"));
        assert_eq!(err.kind(), std::io::ErrorKind::Other);
    }

    #[test]
    fn retry_classification() {
        let addr: SocketAddr = "127.0.0.1:5300".parse().unwrap();
        let in_use =
            TransportError::bind(addr, std::io::Error::from(std::io::ErrorKind::AddrInUse));
        let denied = TransportError::bind(
            addr,
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        let closed =
            TransportError::receive(std::io::Error::from(std::io::ErrorKind::UnexpectedEof));

        assert!(in_use.is_retryable());
        assert!(!denied.is_retryable());
        assert!(!closed.is_retryable());
        assert!(in_use.to_string().contains("127.0.0.1:5300"));

        for suggestion in in_use.recovery_suggestions() {
            assert!(suggestion.len() > 5);
        }
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<DecodeError>();
        assert_send_sync_static::<TransportError>();
        assert_send_sync_static::<SinkError>();
        assert_send_sync_static::<ConfigError>();
    }

    #[test]
    fn sink_error_from_io() {
        let err: SinkError = std::io::Error::from(std::io::ErrorKind::ConnectionRefused).into();
        assert!(matches!(err, SinkError::Io(_)));
    }
}
