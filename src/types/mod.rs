//! Core types for decoded telemetry.
//!
//! ## Architecture
//!
//! - [`TelemetryFrame`] is one decoded datagram: a [`CoreBlock`] plus an
//!   optional [`DashBlock`]
//! - [`ReportRate`] throttles human-facing output
//!
//! All frame types are `Copy`; a consumer that wants to keep a frame around
//! takes its own copy instead of holding on to the dispatcher's instance.
//!
//! ## Usage Example
//!
//! ```rust
//! use slipstream::types::{CoreBlock, DashBlock, TelemetryFrame};
//!
//! let frame = TelemetryFrame::core_only(CoreBlock {
//!     is_race_active: true,
//!     engine_rpm_current: 4500.0,
//!     ..CoreBlock::default()
//! });
//!
//! // Sled-only datagrams read as zeroed dash fields
//! assert_eq!(frame.dash_or_default(), DashBlock::default());
//! ```

mod frame;
mod report_rate;

pub use frame::{CoreBlock, DashBlock, TelemetryFrame};
pub use report_rate::ReportRate;
