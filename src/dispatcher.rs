//! Push-based fan-out of decoded telemetry to subscribed observers.
//!
//! The [`Dispatcher`] holds an insertion-ordered set of [`Observer`]s and
//! forwards four kinds of events to them:
//!
//! | event | observer method | meaning |
//! |---|---|---|
//! | frame | [`Observer::on_next`] | one datagram decoded |
//! | domain error | [`Observer::on_decode_error`] | one datagram was garbage, the feed continues |
//! | transport error | [`Observer::on_transport_error`] | the feed is gone, completion follows |
//! | completion | [`Observer::on_completed`] | delivered once per run, nothing follows until [`Dispatcher::reopen`] |
//!
//! ## Delivery guarantees
//!
//! - Observers see each event in subscription order, and an event reaches
//!   every observer before the next event is dispatched.
//! - Late subscribers only see future events.
//! - Membership is checked right before each observer's turn, so an observer
//!   unsubscribed mid-event is skipped for the rest of that event. A callback
//!   that is already running always finishes.
//! - A panicking observer is logged and skipped; the remaining observers
//!   still receive the event.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use slipstream::{DecodeError, Dispatcher, Observer, TelemetryFrame, TransportError};
//!
//! struct Printer;
//!
//! #[async_trait::async_trait]
//! impl Observer for Printer {
//!     async fn on_next(&self, frame: &TelemetryFrame) {
//!         println!("rpm {}", frame.core.engine_rpm_current);
//!     }
//!     async fn on_decode_error(&self, error: &DecodeError) {
//!         eprintln!("{error}");
//!     }
//!     async fn on_transport_error(&self, error: &TransportError) {
//!         eprintln!("{error}");
//!     }
//!     async fn on_completed(&self) {}
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let dispatcher = Dispatcher::new();
//! let id = dispatcher.subscribe(Arc::new(Printer));
//! dispatcher.next(&TelemetryFrame::default()).await;
//! dispatcher.unsubscribe(id);
//! # }
//! ```

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, error, trace, warn};

use crate::types::TelemetryFrame;
use crate::{DecodeError, TransportError};

/// Receiver of telemetry events
///
/// Implementations handle their own downstream failures; nothing an observer
/// does is reported back to the dispatcher.
#[async_trait::async_trait]
pub trait Observer: Send + Sync + 'static {
    /// A datagram was decoded into a frame
    async fn on_next(&self, frame: &TelemetryFrame);

    /// A datagram could not be decoded; more datagrams may follow
    async fn on_decode_error(&self, error: &DecodeError);

    /// The transport failed; [`Observer::on_completed`] follows immediately
    async fn on_transport_error(&self, error: &TransportError);

    /// The stream ended. Called at most once.
    async fn on_completed(&self);
}

/// Handle identifying one subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

#[derive(Clone)]
struct Subscriber {
    id: SubscriptionId,
    observer: Arc<dyn Observer>,
}

/// One event on its way to the observers
#[derive(Clone, Copy)]
enum Event<'a> {
    Next(&'a TelemetryFrame),
    DecodeError(&'a DecodeError),
    TransportError(&'a TransportError),
    Completed,
}

impl Event<'_> {
    fn name(self) -> &'static str {
        match self {
            Event::Next(_) => "next",
            Event::DecodeError(_) => "decode_error",
            Event::TransportError(_) => "transport_error",
            Event::Completed => "completed",
        }
    }

    async fn notify(self, observer: &dyn Observer) {
        match self {
            Event::Next(frame) => observer.on_next(frame).await,
            Event::DecodeError(error) => observer.on_decode_error(error).await,
            Event::TransportError(error) => observer.on_transport_error(error).await,
            Event::Completed => observer.on_completed().await,
        }
    }
}

/// Ordered fan-out of telemetry events
#[derive(Default)]
pub struct Dispatcher {
    subscribers: RwLock<Vec<Subscriber>>,
    next_id: AtomicU64,
    completed: AtomicBool,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer.
    ///
    /// Subscribing the same `Arc` twice is a no-op that returns the original
    /// subscription id.
    pub fn subscribe(&self, observer: Arc<dyn Observer>) -> SubscriptionId {
        let mut subscribers = self.subscribers.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = subscribers.iter().find(|s| same_observer(&s.observer, &observer))
        {
            debug!(id = existing.id.0, "Observer already subscribed");
            return existing.id;
        }

        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        subscribers.push(Subscriber { id, observer });
        debug!(id = id.0, subscribers = subscribers.len(), "Observer subscribed");
        id
    }

    /// Remove an observer. Returns `false` if it was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write().unwrap_or_else(PoisonError::into_inner);
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);

        let removed = subscribers.len() != before;
        if removed {
            debug!(id = id.0, subscribers = subscribers.len(), "Observer unsubscribed");
        }
        removed
    }

    pub fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.subscribers.read().unwrap_or_else(PoisonError::into_inner).iter().any(|s| s.id == id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether completion has been delivered
    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }

    /// Deliver a decoded frame
    pub async fn next(&self, frame: &TelemetryFrame) {
        self.deliver(Event::Next(frame)).await;
    }

    /// Deliver a per-datagram decode failure
    pub async fn decode_error(&self, error: &DecodeError) {
        self.deliver(Event::DecodeError(error)).await;
    }

    /// Deliver a transport failure. Callers follow up with [`Dispatcher::complete`].
    pub async fn transport_error(&self, error: &TransportError) {
        self.deliver(Event::TransportError(error)).await;
    }

    /// Start a new run after completion.
    ///
    /// Events are delivered again and the next [`Dispatcher::complete`]
    /// reaches subscribers. Returns whether a previous run had completed.
    pub fn reopen(&self) -> bool {
        self.completed.swap(false, Ordering::AcqRel)
    }

    /// Deliver completion. Only the first call of a run has any effect.
    pub async fn complete(&self) {
        if self.completed.swap(true, Ordering::AcqRel) {
            debug!("Completion already delivered");
            return;
        }
        self.fan_out(Event::Completed).await;
    }

    async fn deliver(&self, event: Event<'_>) {
        if self.is_completed() {
            warn!(event = event.name(), "Event after completion dropped");
            return;
        }
        self.fan_out(event).await;
    }

    async fn fan_out(&self, event: Event<'_>) {
        let snapshot = self.snapshot();
        trace!(event = event.name(), subscribers = snapshot.len(), "Dispatching");

        for subscriber in snapshot {
            // An earlier observer may have unsubscribed this one
            if !self.is_subscribed(subscriber.id) {
                continue;
            }

            let delivery = AssertUnwindSafe(event.notify(subscriber.observer.as_ref()));
            if let Err(panic) = delivery.catch_unwind().await {
                error!(
                    id = subscriber.id.0,
                    event = event.name(),
                    panic = panic_message(panic.as_ref()),
                    "Observer panicked; continuing with remaining observers"
                );
            }
        }
    }

    fn snapshot(&self) -> Vec<Subscriber> {
        self.subscribers.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

fn same_observer(a: &Arc<dyn Observer>, b: &Arc<dyn Observer>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic>")
}
