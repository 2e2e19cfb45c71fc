//! Human-readable live reporter

use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::warn;

use crate::dispatcher::Observer;
use crate::types::{ReportRate, TelemetryFrame};
use crate::{DecodeError, TransportError};

/// Observer that renders frames as one line each
///
/// Frame output is throttled to the configured [`ReportRate`]; errors and
/// completion are always written.
pub struct ConsoleReporter<W> {
    min_interval: Option<Duration>,
    state: Mutex<ConsoleState<W>>,
}

struct ConsoleState<W> {
    out: W,
    last_render: Option<Instant>,
    skipped: u64,
}

impl ConsoleReporter<io::Stdout> {
    pub fn stdout(rate: ReportRate) -> Self {
        Self::new(io::stdout(), rate)
    }
}

impl<W: Write + Send + 'static> ConsoleReporter<W> {
    pub fn new(out: W, rate: ReportRate) -> Self {
        Self {
            min_interval: rate.min_interval(),
            state: Mutex::new(ConsoleState { out, last_render: None, skipped: 0 }),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, ConsoleState<W>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_line(state: &mut ConsoleState<W>, line: std::fmt::Arguments<'_>) {
        if let Err(e) = writeln!(state.out, "{line}").and_then(|()| state.out.flush()) {
            warn!(error = %e, "Console write failed");
        }
    }

    /// Render `frame` if the throttle allows it at `now`
    fn report(&self, frame: &TelemetryFrame, now: Instant) -> bool {
        let mut state = self.state();

        if let (Some(interval), Some(last)) = (self.min_interval, state.last_render) {
            if now.saturating_duration_since(last) < interval {
                state.skipped += 1;
                return false;
            }
        }

        state.last_render = Some(now);
        let line = format_frame(frame);
        Self::write_line(&mut state, format_args!("{line}"));
        true
    }
}

/// One status line for a frame
pub fn format_frame(frame: &TelemetryFrame) -> String {
    let core = &frame.core;
    let status = if core.is_race_active { "RACE" } else { "IDLE" };
    match frame.dash {
        Some(dash) => format!(
            "[{status}] t={}ms rpm={:.0} speed={:.0}km/h gear={} throttle={} brake={} lap={} pos={}",
            core.timestamp_ms,
            core.engine_rpm_current,
            dash.speed * 3.6,
            dash.gear,
            dash.throttle_input,
            dash.brake_input,
            dash.lap_number,
            dash.race_position,
        ),
        None => format!(
            "[{status}] t={}ms rpm={:.0} car={} class={}",
            core.timestamp_ms, core.engine_rpm_current, core.vehicle_ordinal, core.car_class,
        ),
    }
}

#[async_trait::async_trait]
impl<W: Write + Send + 'static> Observer for ConsoleReporter<W> {
    async fn on_next(&self, frame: &TelemetryFrame) {
        self.report(frame, Instant::now());
    }

    async fn on_decode_error(&self, error: &DecodeError) {
        Self::write_line(&mut self.state(), format_args!("! {error}"));
    }

    async fn on_transport_error(&self, error: &TransportError) {
        Self::write_line(&mut self.state(), format_args!("!! {error}"));
    }

    async fn on_completed(&self) {
        let mut state = self.state();
        let skipped = state.skipped;
        Self::write_line(
            &mut state,
            format_args!("-- telemetry completed ({skipped} frames throttled)"),
        );
    }
}
