//! Derived metrics published to the key-value store

use crate::types::TelemetryFrame;

/// Trailer mass reported alongside every frame (kg)
pub const TRAILER_MASS_KG: i32 = 1750;

const MS_TO_KMH: f32 = 3.6;
const INPUT_TO_PERCENT: f32 = 2.55;
const STEER_TO_PERCENT: f32 = 1.27;

/// Running distance integrated from dash speed and game timestamps
///
/// Owned by one consumer. A frame without dash data integrates zero speed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Odometer {
    distance_km: f32,
    last_timestamp_ms: Option<u32>,
}

impl Odometer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn distance_km(&self) -> f32 {
        self.distance_km
    }

    /// Integrate one race-active frame and return the new distance.
    ///
    /// The first frame only seeds the timestamp. Each later frame adds whole
    /// metres covered since the previous timestamp; repeated timestamps add
    /// nothing.
    pub fn advance(&mut self, frame: &TelemetryFrame) -> f32 {
        let now = frame.core.timestamp_ms;
        let previous = *self.last_timestamp_ms.get_or_insert(now);

        if now != previous {
            let elapsed_ms = now.wrapping_sub(previous) as f32;
            let metres = (frame.dash_or_default().speed * elapsed_ms / 1000.0).trunc();
            self.distance_km += metres / 1000.0;
            self.last_timestamp_ms = Some(now);
        }

        self.distance_km
    }

    /// Forget the last timestamp so time spent outside a race is not integrated
    pub fn pause(&mut self) {
        self.last_timestamp_ms = None;
    }

    /// Back to zero distance
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Values derived from one frame, in publishing order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedMetrics {
    pub engine_rpm: i32,
    pub truck_model: i32,
    /// km/h
    pub speed: i32,
    pub brake_temperature: i32,
    /// Percent of full throttle
    pub user_throttle: i32,
    /// Percent of full brake
    pub user_brake: i32,
    /// Percent of full lock, negative to the left
    pub user_steer: i32,
    pub trailer_mass: i32,
    pub truck_odometer_km: f32,
}

impl DerivedMetrics {
    /// Derive metrics from a frame and the current odometer reading.
    ///
    /// Missing dash data reads as zero; float to int conversions truncate.
    pub fn from_frame(frame: &TelemetryFrame, odometer_km: f32) -> Self {
        let dash = frame.dash_or_default();
        let brake_temperature = frame.dash.map_or(0.0, |dash| dash.mean_tire_temp());

        Self {
            engine_rpm: frame.core.engine_rpm_current as i32,
            truck_model: frame.core.vehicle_ordinal,
            speed: (dash.speed * MS_TO_KMH) as i32,
            brake_temperature: brake_temperature as i32,
            user_throttle: (f32::from(dash.throttle_input) / INPUT_TO_PERCENT) as i32,
            user_brake: (f32::from(dash.brake_input) / INPUT_TO_PERCENT) as i32,
            user_steer: (f32::from(dash.steer_signed()) / STEER_TO_PERCENT) as i32,
            trailer_mass: TRAILER_MASS_KG,
            truck_odometer_km: odometer_km,
        }
    }

    /// Odometer as a zero-padded string, e.g. `000012.34`
    pub fn odometer_display(&self) -> String {
        format!("{:09.2}", self.truck_odometer_km)
    }

    /// Key-value pairs in publishing order
    pub fn entries(&self) -> [(&'static str, String); 9] {
        [
            ("engineRpm", self.engine_rpm.to_string()),
            ("truckModel", self.truck_model.to_string()),
            ("speed", self.speed.to_string()),
            ("brakeTemperature", self.brake_temperature.to_string()),
            ("userThrottle", self.user_throttle.to_string()),
            ("userBrake", self.user_brake.to_string()),
            ("userSteer", self.user_steer.to_string()),
            ("trailerMass", self.trailer_mass.to_string()),
            ("truckOdometer", self.odometer_display()),
        ]
    }
}
