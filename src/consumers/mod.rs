//! Downstream consumers subscribed to the dispatcher
//!
//! Each consumer owns its own state and sink. Failures inside a consumer are
//! handled there and never reach the dispatcher or the other consumers.

mod console;
mod metrics;
mod publisher;

pub use console::{ConsoleReporter, format_frame};
pub use metrics::{DerivedMetrics, Odometer, TRAILER_MASS_KG};
pub use publisher::KeyValuePublisher;
