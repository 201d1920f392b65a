//! Vehicle-side frame fixtures
//!
//! Builders for the messages an autopilot sends, used by unit tests, the
//! integration test's simulated vehicle and the codec benchmarks.

#![cfg(any(test, feature = "benchmark"))]

use bytes::{BufMut, Bytes, BytesMut};

use crate::parser::modes::compose_custom_mode;
use crate::protocol::build_frame;
use crate::protocol::messages::{AUTOPILOT_COMPONENT_ID, id, mode_flag};
use crate::protocol::put_fixed_str;

/// System id used by fixture frames.
pub const VEHICLE_SYSTEM_ID: u8 = 1;

fn vehicle_frame(msg_id: u32, seq: u8, payload: &[u8]) -> Bytes {
    build_frame(msg_id, seq, VEHICLE_SYSTEM_ID, AUTOPILOT_COMPONENT_ID, payload)
}

/// HEARTBEAT from a PX4 quadrotor.
pub fn heartbeat(seq: u8, armed: bool, main_mode: u8, sub_mode: u8, system_status: u8) -> Bytes {
    let mut p = BytesMut::with_capacity(9);
    p.put_u32_le(compose_custom_mode(main_mode, sub_mode));
    p.put_u8(2); // MAV_TYPE_QUADROTOR
    p.put_u8(12); // MAV_AUTOPILOT_PX4
    let mut base_mode = mode_flag::CUSTOM_MODE_ENABLED;
    if armed {
        base_mode |= mode_flag::SAFETY_ARMED;
    }
    p.put_u8(base_mode);
    p.put_u8(system_status);
    p.put_u8(3); // mavlink_version
    vehicle_frame(id::HEARTBEAT, seq, &p)
}

pub fn attitude(seq: u8, roll: f32, pitch: f32, yaw: f32) -> Bytes {
    let mut p = BytesMut::with_capacity(28);
    p.put_u32_le(0);
    for v in [roll, pitch, yaw, 0.01, -0.02, 0.03] {
        p.put_f32_le(v);
    }
    vehicle_frame(id::ATTITUDE, seq, &p)
}

/// GLOBAL_POSITION_INT in degrees/meters; heading in degrees.
pub fn global_position(seq: u8, lat: f64, lon: f64, alt: f32, relative_alt: f32, heading: f32) -> Bytes {
    let mut p = BytesMut::with_capacity(28);
    p.put_u32_le(0);
    p.put_i32_le((lat * 1e7).round() as i32);
    p.put_i32_le((lon * 1e7).round() as i32);
    p.put_i32_le((alt * 1000.0).round() as i32);
    p.put_i32_le((relative_alt * 1000.0).round() as i32);
    p.put_i16_le(150);
    p.put_i16_le(-250);
    p.put_i16_le(10);
    p.put_u16_le((heading * 100.0).round() as u16);
    vehicle_frame(id::GLOBAL_POSITION_INT, seq, &p)
}

pub fn vfr_hud(seq: u8, airspeed: f32, groundspeed: f32, heading: i16, throttle: u16) -> Bytes {
    let mut p = BytesMut::with_capacity(20);
    p.put_f32_le(airspeed);
    p.put_f32_le(groundspeed);
    p.put_f32_le(0.0);
    p.put_f32_le(0.5);
    p.put_i16_le(heading);
    p.put_u16_le(throttle);
    vehicle_frame(id::VFR_HUD, seq, &p)
}

/// SYS_STATUS with load in percent, voltage in volts and current in amperes.
pub fn sys_status(seq: u8, load: f32, voltage: f32, current: f32, remaining: i8) -> Bytes {
    let mut p = BytesMut::zeroed(31);
    p[12..14].copy_from_slice(&((load * 10.0).round() as u16).to_le_bytes());
    p[14..16].copy_from_slice(&((voltage * 1000.0).round() as u16).to_le_bytes());
    p[16..18].copy_from_slice(&((current * 100.0).round() as i16).to_le_bytes());
    p[30] = remaining as u8;
    vehicle_frame(id::SYS_STATUS, seq, &p)
}

pub fn param_value(seq: u8, name: &str, value: f32, index: u16, count: u16) -> Bytes {
    let mut p = BytesMut::with_capacity(25);
    p.put_f32_le(value);
    p.put_u16_le(count);
    p.put_u16_le(index);
    put_fixed_str(&mut p, name, 16);
    p.put_u8(9);
    vehicle_frame(id::PARAM_VALUE, seq, &p)
}

pub fn command_ack(seq: u8, command: u16, result: u8) -> Bytes {
    let mut p = BytesMut::with_capacity(3);
    p.put_u16_le(command);
    p.put_u8(result);
    vehicle_frame(id::COMMAND_ACK, seq, &p)
}

pub fn mission_request_int(seq: u8, item: u16) -> Bytes {
    let mut p = BytesMut::with_capacity(5);
    p.put_u16_le(item);
    p.put_u8(255);
    p.put_u8(190);
    p.put_u8(0);
    vehicle_frame(id::MISSION_REQUEST_INT, seq, &p)
}

pub fn mission_request(seq: u8, item: u16) -> Bytes {
    let mut p = BytesMut::with_capacity(5);
    p.put_u16_le(item);
    p.put_u8(255);
    p.put_u8(190);
    p.put_u8(0);
    vehicle_frame(id::MISSION_REQUEST, seq, &p)
}

pub fn mission_ack(seq: u8, result: u8) -> Bytes {
    vehicle_frame(id::MISSION_ACK, seq, &[255, 190, result, 0])
}

pub fn status_text(seq: u8, severity: u8, text: &str) -> Bytes {
    let mut p = BytesMut::with_capacity(51);
    p.put_u8(severity);
    put_fixed_str(&mut p, text, 50);
    vehicle_frame(id::STATUSTEXT, seq, &p)
}

/// One second worth of a typical PX4 stream, concatenated.
pub fn telemetry_burst() -> Bytes {
    let mut out = BytesMut::new();
    let mut seq = 0u8;
    for i in 0..50u16 {
        let t = i as f32 * 0.02;
        out.extend_from_slice(&attitude(seq, t.sin() * 0.1, t.cos() * 0.1, t));
        seq = seq.wrapping_add(1);
        out.extend_from_slice(&global_position(seq, 47.397742, 8.545594, 488.0 + t, t, 90.0));
        seq = seq.wrapping_add(1);
        if i % 5 == 0 {
            out.extend_from_slice(&vfr_hud(seq, 5.0, 4.8, 90, 55));
            seq = seq.wrapping_add(1);
        }
        if i % 25 == 0 {
            out.extend_from_slice(&heartbeat(seq, true, 4, 4, 4));
            seq = seq.wrapping_add(1);
            out.extend_from_slice(&sys_status(seq, 23.5, 16.2, 12.3, 80));
            seq = seq.wrapping_add(1);
        }
    }
    out.freeze()
}
