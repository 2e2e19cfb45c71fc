//! Forza "Data Out" UDP telemetry decoder and fan-out relay.
//!
//! Slipstream receives the fixed-layout datagrams Forza games emit at 60 Hz,
//! decodes each one into a [`TelemetryFrame`] and pushes it to any number of
//! independent [`Observer`]s through a [`Dispatcher`].
//!
//! # Features
//!
//! - **Two wire layouts**: Sled (232 bytes) and Sled + Dash (312 bytes)
//! - **Typed error channels**: malformed datagrams never stop the feed;
//!   socket failures end it with a single completion
//! - **Cancellable**: shutdown through a [`CancellationToken`], no polling
//! - **Consumers included**: a throttled console reporter and a key-value
//!   publisher for Redis-compatible servers
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use slipstream::consumers::{ConsoleReporter, KeyValuePublisher};
//! use slipstream::sink::RespSink;
//! use slipstream::{Dispatcher, Listener, ListenerConfig, ReportRate};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let listener = Listener::bind(&ListenerConfig::new(5300)).await?;
//!
//!     let dispatcher = Arc::new(Dispatcher::new());
//!     dispatcher.subscribe(Arc::new(ConsoleReporter::stdout(ReportRate::Max(4))));
//!     dispatcher.subscribe(Arc::new(KeyValuePublisher::new(RespSink::new("127.0.0.1:6379"))));
//!
//!     let cancel = CancellationToken::new();
//!     let stats = listener.listen(&dispatcher, cancel).await.into_result()?;
//!     println!("{} frames", stats.frames);
//!     Ok(())
//! }
//! ```
//!
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

// Core types and error handling
pub mod codec;
pub mod config;
mod error;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Ingestion pipeline
pub mod dispatcher;
pub mod listener;
pub mod source;
pub mod sources;

// Downstream
pub mod consumers;
pub mod sink;

// Core exports
pub use codec::{decode, encode};
pub use config::{ListenerConfig, RelayConfig};
pub use dispatcher::{Dispatcher, Observer, SubscriptionId};
pub use error::*;
pub use listener::{ListenOutcome, ListenStats, Listener};
pub use source::{Datagram, DatagramSource};
pub use types::*;
