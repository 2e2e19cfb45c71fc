//! Output rate control for human-facing consumers

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How often a reporter should render frames.
///
/// Forza sends 60 datagrams per second; rendering every one of them to a
/// terminal is rarely useful.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportRate {
    /// Render every frame
    #[default]
    EveryFrame,

    /// Render at most this many frames per second.
    /// `Max(0)` is treated as `EveryFrame`.
    Max(u32),
}

impl ReportRate {
    /// Source rate of Forza Data Out
    pub const SOURCE_HZ: u32 = 60;

    /// Normalize against the source rate. Returns the effective rate.
    pub fn normalize(self, source_hz: u32) -> Self {
        match self {
            ReportRate::EveryFrame => ReportRate::EveryFrame,
            ReportRate::Max(0) => ReportRate::EveryFrame,
            ReportRate::Max(hz) if hz >= source_hz => ReportRate::EveryFrame,
            ReportRate::Max(hz) => ReportRate::Max(hz),
        }
    }

    /// Minimum spacing between two rendered frames, if any
    pub fn min_interval(self) -> Option<Duration> {
        match self.normalize(Self::SOURCE_HZ) {
            ReportRate::EveryFrame => None,
            ReportRate::Max(hz) => Some(Duration::from_secs_f64(1.0 / f64::from(hz))),
        }
    }
}

impl From<Option<u32>> for ReportRate {
    fn from(hz: Option<u32>) -> Self {
        hz.map_or(ReportRate::EveryFrame, ReportRate::Max)
    }
}
