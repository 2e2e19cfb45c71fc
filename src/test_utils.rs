//! Telemetry fixtures shared by unit tests and benchmarks
//!
//! Frames here look like a car mid-race: plausible RPM, a gear, pedal input
//! and warm tires. Timestamps and speed are left to the caller.

#![cfg(any(test, feature = "benchmark"))]

use crate::codec;
use crate::types::{CoreBlock, DashBlock, TelemetryFrame};

/// Sled block of a race-active car at `timestamp_ms`
pub fn race_core(timestamp_ms: u32) -> CoreBlock {
    CoreBlock {
        is_race_active: true,
        timestamp_ms,
        engine_max_rpm: 8000.0,
        engine_idle_rpm: 900.0,
        engine_rpm_current: 4200.0,
        velocity_longitudinal: 20.0,
        vehicle_ordinal: 77,
        car_class: 3,
        performance_index: 650,
        drivetrain: 1,
        num_cylinders: 6,
        ..CoreBlock::default()
    }
}

/// Race-active frame with dash data travelling at `speed` m/s
pub fn race_frame(timestamp_ms: u32, speed: f32) -> TelemetryFrame {
    TelemetryFrame::with_dash(
        race_core(timestamp_ms),
        DashBlock {
            speed,
            tire_temp_front_left: 180.0,
            tire_temp_front_right: 180.0,
            tire_temp_rear_left: 176.0,
            tire_temp_rear_right: 176.0,
            fuel: 0.8,
            lap_number: 1,
            race_position: 4,
            throttle_input: 255,
            gear: 3,
            ..DashBlock::default()
        },
    )
}

/// Encoded sled-only datagram
pub fn sled_datagram(timestamp_ms: u32) -> Vec<u8> {
    codec::encode(&TelemetryFrame::core_only(race_core(timestamp_ms)))
}

/// Encoded sled + dash datagram
pub fn extended_datagram(timestamp_ms: u32, speed: f32) -> Vec<u8> {
    codec::encode(&race_frame(timestamp_ms, speed))
}

/// One datagram per 60 Hz tick, alternating layouts
pub fn mixed_session(count: usize) -> Vec<Vec<u8>> {
    (0..count)
        .map(|i| {
            let timestamp_ms = (i as u32).wrapping_mul(16);
            if i % 2 == 0 { extended_datagram(timestamp_ms, 40.0) } else { sled_datagram(timestamp_ms) }
        })
        .collect()
}
