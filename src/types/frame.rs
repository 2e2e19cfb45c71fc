//! Decoded telemetry frame types

use serde::{Deserialize, Serialize};

/// Race physics fields present in every datagram (the "Sled" region).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CoreBlock {
    /// Derived from the raw race flag; `0` means the player is not in a race
    pub is_race_active: bool,

    /// Game timestamp in milliseconds, monotonic within a race (wraps at u32::MAX)
    pub timestamp_ms: u32,

    pub engine_max_rpm: f32,
    pub engine_idle_rpm: f32,
    pub engine_rpm_current: f32,

    /// Acceleration along the car's forward axis (m/s²)
    pub acceleration_longitudinal: f32,

    /// Velocity along the car's forward axis (m/s)
    pub velocity_longitudinal: f32,

    /// Opaque vehicle identifier
    pub vehicle_ordinal: i32,

    pub car_class: i32,
    pub performance_index: i32,

    /// 0 = FWD, 1 = RWD, 2 = AWD
    pub drivetrain: i32,

    pub num_cylinders: i32,
}

/// Driver input and dashboard fields, only present in the extended layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DashBlock {
    /// Vehicle speed (m/s)
    pub speed: f32,

    /// Engine power (W)
    pub power: f32,

    /// Engine torque (Nm)
    pub torque: f32,

    pub tire_temp_front_left: f32,
    pub tire_temp_front_right: f32,
    pub tire_temp_rear_left: f32,
    pub tire_temp_rear_right: f32,

    pub boost: f32,
    pub fuel: f32,

    /// Cumulative distance as reported by the game
    pub distance_traveled: f32,

    pub best_lap: f32,
    pub last_lap: f32,
    pub current_lap: f32,
    pub current_race_time: f32,

    pub lap_number: u16,
    pub race_position: u8,

    /// 0–255
    pub throttle_input: u8,
    /// 0–255
    pub brake_input: u8,
    pub clutch_input: u8,
    pub handbrake_input: u8,
    pub gear: u8,

    /// Raw steering byte. The game writes a signed value (-127..=127);
    /// use [`DashBlock::steer_signed`] to read it that way.
    pub steer_input: u8,
}

impl DashBlock {
    /// Steering input reinterpreted as the signed byte the game sends.
    pub fn steer_signed(&self) -> i8 {
        i8::from_le_bytes([self.steer_input])
    }

    /// Mean of the four tire temperatures.
    pub fn mean_tire_temp(&self) -> f32 {
        (self.tire_temp_front_left
            + self.tire_temp_front_right
            + self.tire_temp_rear_left
            + self.tire_temp_rear_right)
            / 4.0
    }
}

/// One decoded telemetry sample.
///
/// Frames are built once per datagram and handed to every consumer by
/// reference; consumers copy what they need.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetryFrame {
    pub core: CoreBlock,
    pub dash: Option<DashBlock>,
}

impl TelemetryFrame {
    /// Create a frame from the core block only
    pub fn core_only(core: CoreBlock) -> Self {
        Self { core, dash: None }
    }

    /// Create a frame carrying both blocks
    pub fn with_dash(core: CoreBlock, dash: DashBlock) -> Self {
        Self { core, dash: Some(dash) }
    }

    /// Dash fields, or all-zero defaults when the datagram had none.
    pub fn dash_or_default(&self) -> DashBlock {
        self.dash.unwrap_or_default()
    }

    pub fn has_dash(&self) -> bool {
        self.dash.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_dash_reads_as_zero() {
        let frame = TelemetryFrame::core_only(CoreBlock {
            is_race_active: true,
            timestamp_ms: 10,
            ..CoreBlock::default()
        });

        let dash = frame.dash_or_default();
        assert!(!frame.has_dash());
        assert_eq!(dash, DashBlock::default());
        assert_eq!(dash.throttle_input, 0);
        assert_eq!(dash.speed, 0.0);
    }

    #[test]
    fn steer_byte_is_twos_complement() {
        let left = DashBlock { steer_input: 0x81, ..DashBlock::default() };
        let right = DashBlock { steer_input: 127, ..DashBlock::default() };
        assert_eq!(left.steer_signed(), -127);
        assert_eq!(right.steer_signed(), 127);
    }

    #[test]
    fn mean_tire_temp_averages_all_corners() {
        let dash = DashBlock {
            tire_temp_front_left: 80.0,
            tire_temp_front_right: 90.0,
            tire_temp_rear_left: 100.0,
            tire_temp_rear_right: 110.0,
            ..DashBlock::default()
        };
        assert!((dash.mean_tire_temp() - 95.0).abs() < f32::EPSILON);
    }
}
