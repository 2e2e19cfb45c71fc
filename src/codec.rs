//! Forza Data Out wire format.
//!
//! Two layouts exist and the datagram length is the only discriminator:
//!
//! 1. **Sled** ([`CORE_SIZE`] bytes) - race physics only
//! 2. **Sled + Dash** ([`EXTENDED_SIZE`] bytes) - physics plus dashboard and
//!    driver input fields starting at byte [`CORE_SIZE`]
//!
//! Every field sits at a fixed little-endian offset. There is no version byte
//! and no length-prefixed content, so a datagram of a recognized length always
//! decodes. Bytes that carry fields this crate does not model (world position,
//! angular velocity, suspension, ...) are skipped on decode and zeroed on encode.

use crate::DecodeError;
use crate::types::{CoreBlock, DashBlock, TelemetryFrame};

/// Length of a Sled-only datagram
pub const CORE_SIZE: usize = 232;

/// Bytes the Dash extension adds on top of the Sled region
pub const DASH_EXTRA_SIZE: usize = 80;

/// Length of a Sled + Dash datagram
pub const EXTENDED_SIZE: usize = CORE_SIZE + DASH_EXTRA_SIZE;

// Sled region
const OFF_IS_RACE_ON: usize = 0; // i32
const OFF_TIMESTAMP_MS: usize = 4; // u32
const OFF_ENGINE_MAX_RPM: usize = 8;
const OFF_ENGINE_IDLE_RPM: usize = 12;
const OFF_CURRENT_ENGINE_RPM: usize = 16;
const OFF_ACCELERATION_Z: usize = 28;
const OFF_VELOCITY_Z: usize = 40;
const OFF_CAR_ORDINAL: usize = 212; // i32
const OFF_CAR_CLASS: usize = 216; // i32
const OFF_CAR_PERFORMANCE_INDEX: usize = 220; // i32
const OFF_DRIVETRAIN_TYPE: usize = 224; // i32
const OFF_NUM_CYLINDERS: usize = 228; // i32

// Dash region (232..312). 232..244 holds world position, 309..312 the driving
// line hints and a pad byte.
const OFF_SPEED: usize = 244;
const OFF_POWER: usize = 248;
const OFF_TORQUE: usize = 252;
const OFF_TIRE_TEMP_FL: usize = 256;
const OFF_TIRE_TEMP_FR: usize = 260;
const OFF_TIRE_TEMP_RL: usize = 264;
const OFF_TIRE_TEMP_RR: usize = 268;
const OFF_BOOST: usize = 272;
const OFF_FUEL: usize = 276;
const OFF_DISTANCE_TRAVELED: usize = 280;
const OFF_BEST_LAP: usize = 284;
const OFF_LAST_LAP: usize = 288;
const OFF_CURRENT_LAP: usize = 292;
const OFF_CURRENT_RACE_TIME: usize = 296;
const OFF_LAP_NUMBER: usize = 300; // u16
const OFF_RACE_POSITION: usize = 302; // u8
const OFF_ACCEL: usize = 303; // u8
const OFF_BRAKE: usize = 304; // u8
const OFF_CLUTCH: usize = 305; // u8
const OFF_HANDBRAKE: usize = 306; // u8
const OFF_GEAR: usize = 307; // u8
const OFF_STEER: usize = 308; // s8 on the wire, kept raw

/// Datagram layout, selected purely by length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketLayout {
    /// Sled block only
    Core,
    /// Sled block followed by the Dash extension
    CoreDash,
}

impl PacketLayout {
    /// Select the layout for a datagram of `len` bytes.
    pub fn from_len(len: usize) -> Option<Self> {
        match len {
            CORE_SIZE => Some(PacketLayout::Core),
            EXTENDED_SIZE => Some(PacketLayout::CoreDash),
            _ => None,
        }
    }

    /// Total datagram length of this layout
    pub fn size(self) -> usize {
        match self {
            PacketLayout::Core => CORE_SIZE,
            PacketLayout::CoreDash => EXTENDED_SIZE,
        }
    }
}

/// Decode one datagram into a [`TelemetryFrame`].
///
/// Pure and stateless.
///
/// # Errors
///
/// Returns [`DecodeError::UnrecognizedLength`] when `data` is neither
/// [`CORE_SIZE`] nor [`EXTENDED_SIZE`] bytes long.
pub fn decode(data: &[u8]) -> Result<TelemetryFrame, DecodeError> {
    let layout =
        PacketLayout::from_len(data.len()).ok_or(DecodeError::UnrecognizedLength(data.len()))?;

    let core = decode_core(data);
    Ok(match layout {
        PacketLayout::Core => TelemetryFrame::core_only(core),
        PacketLayout::CoreDash => TelemetryFrame::with_dash(core, decode_dash(data)),
    })
}

/// Encode a frame at the documented offsets.
///
/// Produces [`EXTENDED_SIZE`] bytes when the frame carries a dash block and
/// [`CORE_SIZE`] bytes otherwise. `decode(&encode(f)) == Ok(f)` for any frame
/// whose floats are not NaN.
pub fn encode(frame: &TelemetryFrame) -> Vec<u8> {
    let layout = if frame.has_dash() { PacketLayout::CoreDash } else { PacketLayout::Core };
    let mut data = vec![0u8; layout.size()];

    let core = &frame.core;
    put_i32(&mut data, OFF_IS_RACE_ON, i32::from(core.is_race_active));
    put_u32(&mut data, OFF_TIMESTAMP_MS, core.timestamp_ms);
    put_f32(&mut data, OFF_ENGINE_MAX_RPM, core.engine_max_rpm);
    put_f32(&mut data, OFF_ENGINE_IDLE_RPM, core.engine_idle_rpm);
    put_f32(&mut data, OFF_CURRENT_ENGINE_RPM, core.engine_rpm_current);
    put_f32(&mut data, OFF_ACCELERATION_Z, core.acceleration_longitudinal);
    put_f32(&mut data, OFF_VELOCITY_Z, core.velocity_longitudinal);
    put_i32(&mut data, OFF_CAR_ORDINAL, core.vehicle_ordinal);
    put_i32(&mut data, OFF_CAR_CLASS, core.car_class);
    put_i32(&mut data, OFF_CAR_PERFORMANCE_INDEX, core.performance_index);
    put_i32(&mut data, OFF_DRIVETRAIN_TYPE, core.drivetrain);
    put_i32(&mut data, OFF_NUM_CYLINDERS, core.num_cylinders);

    if let Some(dash) = &frame.dash {
        put_f32(&mut data, OFF_SPEED, dash.speed);
        put_f32(&mut data, OFF_POWER, dash.power);
        put_f32(&mut data, OFF_TORQUE, dash.torque);
        put_f32(&mut data, OFF_TIRE_TEMP_FL, dash.tire_temp_front_left);
        put_f32(&mut data, OFF_TIRE_TEMP_FR, dash.tire_temp_front_right);
        put_f32(&mut data, OFF_TIRE_TEMP_RL, dash.tire_temp_rear_left);
        put_f32(&mut data, OFF_TIRE_TEMP_RR, dash.tire_temp_rear_right);
        put_f32(&mut data, OFF_BOOST, dash.boost);
        put_f32(&mut data, OFF_FUEL, dash.fuel);
        put_f32(&mut data, OFF_DISTANCE_TRAVELED, dash.distance_traveled);
        put_f32(&mut data, OFF_BEST_LAP, dash.best_lap);
        put_f32(&mut data, OFF_LAST_LAP, dash.last_lap);
        put_f32(&mut data, OFF_CURRENT_LAP, dash.current_lap);
        put_f32(&mut data, OFF_CURRENT_RACE_TIME, dash.current_race_time);
        put_bytes(&mut data, OFF_LAP_NUMBER, &dash.lap_number.to_le_bytes());
        put_bytes(&mut data, OFF_RACE_POSITION, &[dash.race_position]);
        put_bytes(&mut data, OFF_ACCEL, &[dash.throttle_input]);
        put_bytes(&mut data, OFF_BRAKE, &[dash.brake_input]);
        put_bytes(&mut data, OFF_CLUTCH, &[dash.clutch_input]);
        put_bytes(&mut data, OFF_HANDBRAKE, &[dash.handbrake_input]);
        put_bytes(&mut data, OFF_GEAR, &[dash.gear]);
        put_bytes(&mut data, OFF_STEER, &[dash.steer_input]);
    }

    data
}

fn decode_core(data: &[u8]) -> CoreBlock {
    CoreBlock {
        is_race_active: read_i32_le(data, OFF_IS_RACE_ON) != 0,
        timestamp_ms: read_u32_le(data, OFF_TIMESTAMP_MS),
        engine_max_rpm: read_f32_le(data, OFF_ENGINE_MAX_RPM),
        engine_idle_rpm: read_f32_le(data, OFF_ENGINE_IDLE_RPM),
        engine_rpm_current: read_f32_le(data, OFF_CURRENT_ENGINE_RPM),
        acceleration_longitudinal: read_f32_le(data, OFF_ACCELERATION_Z),
        velocity_longitudinal: read_f32_le(data, OFF_VELOCITY_Z),
        vehicle_ordinal: read_i32_le(data, OFF_CAR_ORDINAL),
        car_class: read_i32_le(data, OFF_CAR_CLASS),
        performance_index: read_i32_le(data, OFF_CAR_PERFORMANCE_INDEX),
        drivetrain: read_i32_le(data, OFF_DRIVETRAIN_TYPE),
        num_cylinders: read_i32_le(data, OFF_NUM_CYLINDERS),
    }
}

fn decode_dash(data: &[u8]) -> DashBlock {
    DashBlock {
        speed: read_f32_le(data, OFF_SPEED),
        power: read_f32_le(data, OFF_POWER),
        torque: read_f32_le(data, OFF_TORQUE),
        tire_temp_front_left: read_f32_le(data, OFF_TIRE_TEMP_FL),
        tire_temp_front_right: read_f32_le(data, OFF_TIRE_TEMP_FR),
        tire_temp_rear_left: read_f32_le(data, OFF_TIRE_TEMP_RL),
        tire_temp_rear_right: read_f32_le(data, OFF_TIRE_TEMP_RR),
        boost: read_f32_le(data, OFF_BOOST),
        fuel: read_f32_le(data, OFF_FUEL),
        distance_traveled: read_f32_le(data, OFF_DISTANCE_TRAVELED),
        best_lap: read_f32_le(data, OFF_BEST_LAP),
        last_lap: read_f32_le(data, OFF_LAST_LAP),
        current_lap: read_f32_le(data, OFF_CURRENT_LAP),
        current_race_time: read_f32_le(data, OFF_CURRENT_RACE_TIME),
        lap_number: read_u16_le(data, OFF_LAP_NUMBER),
        race_position: read_u8(data, OFF_RACE_POSITION),
        throttle_input: read_u8(data, OFF_ACCEL),
        brake_input: read_u8(data, OFF_BRAKE),
        clutch_input: read_u8(data, OFF_CLUTCH),
        handbrake_input: read_u8(data, OFF_HANDBRAKE),
        gear: read_u8(data, OFF_GEAR),
        steer_input: read_u8(data, OFF_STEER),
    }
}

// Offsets are constants inside the length the caller already validated, so
// the zero fallbacks below are never observed.

fn read_array<const N: usize>(data: &[u8], offset: usize) -> [u8; N] {
    data.get(offset..offset + N).and_then(|b| b.try_into().ok()).unwrap_or([0; N])
}

fn read_f32_le(data: &[u8], offset: usize) -> f32 {
    f32::from_le_bytes(read_array(data, offset))
}

fn read_i32_le(data: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes(read_array(data, offset))
}

fn read_u32_le(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(read_array(data, offset))
}

fn read_u16_le(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes(read_array(data, offset))
}

fn read_u8(data: &[u8], offset: usize) -> u8 {
    data.get(offset).copied().unwrap_or(0)
}

fn put_bytes(data: &mut [u8], offset: usize, bytes: &[u8]) {
    if let Some(slot) = data.get_mut(offset..offset + bytes.len()) {
        slot.copy_from_slice(bytes);
    }
}

fn put_f32(data: &mut [u8], offset: usize, value: f32) {
    put_bytes(data, offset, &value.to_le_bytes());
}

fn put_i32(data: &mut [u8], offset: usize, value: i32) {
    put_bytes(data, offset, &value.to_le_bytes());
}

fn put_u32(data: &mut [u8], offset: usize, value: u32) {
    put_bytes(data, offset, &value.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sled_packet(is_race_on: i32, timestamp_ms: u32, rpm: f32) -> Vec<u8> {
        let mut data = vec![0u8; CORE_SIZE];
        data[OFF_IS_RACE_ON..OFF_IS_RACE_ON + 4].copy_from_slice(&is_race_on.to_le_bytes());
        data[OFF_TIMESTAMP_MS..OFF_TIMESTAMP_MS + 4].copy_from_slice(&timestamp_ms.to_le_bytes());
        data[OFF_CURRENT_ENGINE_RPM..OFF_CURRENT_ENGINE_RPM + 4]
            .copy_from_slice(&rpm.to_le_bytes());
        data[OFF_ACCELERATION_Z..OFF_ACCELERATION_Z + 4].copy_from_slice(&(-3.5f32).to_le_bytes());
        data[OFF_VELOCITY_Z..OFF_VELOCITY_Z + 4].copy_from_slice(&42.25f32.to_le_bytes());
        data[OFF_CAR_ORDINAL..OFF_CAR_ORDINAL + 4].copy_from_slice(&2352i32.to_le_bytes());
        data
    }

    #[test]
    fn layout_sizes_match_data_out() {
        assert_eq!(CORE_SIZE, 232);
        assert_eq!(EXTENDED_SIZE, 312);
        assert_eq!(PacketLayout::from_len(232), Some(PacketLayout::Core));
        assert_eq!(PacketLayout::from_len(312), Some(PacketLayout::CoreDash));
        assert_eq!(PacketLayout::from_len(311), None);
        assert_eq!(PacketLayout::from_len(324), None);
        assert_eq!(PacketLayout::CoreDash.size(), 312);
    }

    #[test]
    fn decodes_sled_fields_at_offsets() {
        let frame = decode(&sled_packet(1, 123_456, 7250.5)).unwrap();

        assert!(frame.dash.is_none());
        assert!(frame.core.is_race_active);
        assert_eq!(frame.core.timestamp_ms, 123_456);
        assert_eq!(frame.core.engine_rpm_current, 7250.5);
        assert_eq!(frame.core.acceleration_longitudinal, -3.5);
        assert_eq!(frame.core.velocity_longitudinal, 42.25);
        assert_eq!(frame.core.vehicle_ordinal, 2352);
    }

    #[test]
    fn any_nonzero_race_flag_is_active() {
        assert!(decode(&sled_packet(7, 0, 0.0)).unwrap().core.is_race_active);
        assert!(decode(&sled_packet(-1, 0, 0.0)).unwrap().core.is_race_active);
        assert!(!decode(&sled_packet(0, 0, 0.0)).unwrap().core.is_race_active);
    }

    #[test]
    fn decodes_dash_fields_at_offsets() {
        let mut data = sled_packet(1, 99, 3000.0);
        data.resize(EXTENDED_SIZE, 0);
        data[OFF_SPEED..OFF_SPEED + 4].copy_from_slice(&27.5f32.to_le_bytes());
        data[OFF_TIRE_TEMP_RR..OFF_TIRE_TEMP_RR + 4].copy_from_slice(&180.0f32.to_le_bytes());
        data[OFF_DISTANCE_TRAVELED..OFF_DISTANCE_TRAVELED + 4]
            .copy_from_slice(&1520.75f32.to_le_bytes());
        data[OFF_LAP_NUMBER..OFF_LAP_NUMBER + 2].copy_from_slice(&3u16.to_le_bytes());
        data[OFF_ACCEL] = 255;
        data[OFF_BRAKE] = 128;
        data[OFF_GEAR] = 4;
        data[OFF_STEER] = 0xF6; // -10

        let frame = decode(&data).unwrap();
        let dash = frame.dash.expect("312-byte datagram carries dash");

        assert_eq!(frame.core.timestamp_ms, 99);
        assert_eq!(dash.speed, 27.5);
        assert_eq!(dash.tire_temp_rear_right, 180.0);
        assert_eq!(dash.distance_traveled, 1520.75);
        assert_eq!(dash.lap_number, 3);
        assert_eq!(dash.throttle_input, 255);
        assert_eq!(dash.brake_input, 128);
        assert_eq!(dash.gear, 4);
        assert_eq!(dash.steer_input, 0xF6);
        assert_eq!(dash.steer_signed(), -10);
    }

    #[test]
    fn unknown_lengths_are_rejected() {
        for len in [0, 1, 231, 233, 311, 313, 324, 331, 1500] {
            assert_eq!(decode(&vec![0u8; len]), Err(DecodeError::UnrecognizedLength(len)));
        }
    }

    #[test]
    fn encode_sizes_follow_dash_presence() {
        let core = CoreBlock::default();
        assert_eq!(encode(&TelemetryFrame::core_only(core)).len(), CORE_SIZE);
        assert_eq!(encode(&TelemetryFrame::with_dash(core, DashBlock::default())).len(), 312);
    }

    prop_compose! {
        fn arb_core()(
            is_race_active in any::<bool>(),
            timestamp_ms in any::<u32>(),
            rpms in prop::array::uniform3(0.0f32..20_000.0),
            acceleration_longitudinal in -100.0f32..100.0,
            velocity_longitudinal in -150.0f32..150.0,
            ints in prop::array::uniform5(any::<i32>()),
        ) -> CoreBlock {
            CoreBlock {
                is_race_active,
                timestamp_ms,
                engine_max_rpm: rpms[0],
                engine_idle_rpm: rpms[1],
                engine_rpm_current: rpms[2],
                acceleration_longitudinal,
                velocity_longitudinal,
                vehicle_ordinal: ints[0],
                car_class: ints[1],
                performance_index: ints[2],
                drivetrain: ints[3],
                num_cylinders: ints[4],
            }
        }
    }

    prop_compose! {
        fn arb_dash()(
            floats in prop::array::uniform14(-1.0e6f32..1.0e6),
            lap_number in any::<u16>(),
            bytes in prop::array::uniform7(any::<u8>()),
        ) -> DashBlock {
            DashBlock {
                speed: floats[0],
                power: floats[1],
                torque: floats[2],
                tire_temp_front_left: floats[3],
                tire_temp_front_right: floats[4],
                tire_temp_rear_left: floats[5],
                tire_temp_rear_right: floats[6],
                boost: floats[7],
                fuel: floats[8],
                distance_traveled: floats[9],
                best_lap: floats[10],
                last_lap: floats[11],
                current_lap: floats[12],
                current_race_time: floats[13],
                lap_number,
                race_position: bytes[0],
                throttle_input: bytes[1],
                brake_input: bytes[2],
                clutch_input: bytes[3],
                handbrake_input: bytes[4],
                gear: bytes[5],
                steer_input: bytes[6],
            }
        }
    }

    proptest! {
        #[test]
        fn prop_frames_survive_encoding(core in arb_core(), dash in prop::option::of(arb_dash())) {
            let frame = TelemetryFrame { core, dash };
            prop_assert_eq!(decode(&encode(&frame)), Ok(frame));
        }

        #[test]
        fn prop_sled_length_never_has_dash(data in prop::collection::vec(any::<u8>(), CORE_SIZE)) {
            let frame = decode(&data).unwrap();
            prop_assert!(frame.dash.is_none());
            prop_assert_eq!(frame.core.timestamp_ms, u32::from_le_bytes([data[4], data[5], data[6], data[7]]));
            prop_assert_eq!(
                frame.core.vehicle_ordinal,
                i32::from_le_bytes([data[212], data[213], data[214], data[215]])
            );
        }

        #[test]
        fn prop_extended_length_always_has_dash(data in prop::collection::vec(any::<u8>(), EXTENDED_SIZE)) {
            let frame = decode(&data).unwrap();
            let dash = frame.dash.unwrap();
            prop_assert_eq!(dash.throttle_input, data[303]);
            prop_assert_eq!(dash.steer_input, data[308]);
            prop_assert_eq!(dash.lap_number, u16::from_le_bytes([data[300], data[301]]));
        }

        #[test]
        fn prop_other_lengths_fail(len in 0usize..2048) {
            prop_assume!(len != CORE_SIZE && len != EXTENDED_SIZE);
            prop_assert_eq!(decode(&vec![0xAB; len]), Err(DecodeError::UnrecognizedLength(len)));
        }
    }
}
