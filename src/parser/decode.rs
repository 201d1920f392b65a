//! Fixed-offset decoders for the messages the link consumes
//!
//! Each decoder reads one payload into a small typed struct. Structs that
//! carry telemetry know which field group of the snapshot they own and
//! overwrite exactly that group in `apply`.

use crate::protocol::PayloadReader;
use crate::protocol::messages::{mode_flag, payload_len};
use crate::types::{CommandKind, CommandOutcome, LogSeverity, PARAM_ID_LEN, ParamEntry, TelemetrySnapshot};

use super::modes::{flight_mode_label, system_status_label};

/// Raw heading value meaning "unknown" in GLOBAL_POSITION_INT.
const HEADING_UNKNOWN: u16 = u16::MAX;

/// Raw current value meaning "unknown" in SYS_STATUS.
const CURRENT_UNKNOWN: i16 = -1;

const STATUSTEXT_LEN: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Heartbeat {
    pub custom_mode: u32,
    pub vehicle_type: u8,
    pub autopilot: u8,
    pub base_mode: u8,
    pub system_status: u8,
}

impl Heartbeat {
    pub fn decode(payload: &[u8]) -> Self {
        let r = PayloadReader::new(payload, payload_len::HEARTBEAT);
        Self {
            custom_mode: r.u32(0),
            vehicle_type: r.u8(4),
            autopilot: r.u8(5),
            base_mode: r.u8(6),
            system_status: r.u8(7),
        }
    }

    pub fn armed(&self) -> bool {
        self.base_mode & mode_flag::SAFETY_ARMED != 0
    }

    pub fn apply(&self, snapshot: &mut TelemetrySnapshot) {
        let status = &mut snapshot.status;
        status.armed = self.armed();
        status.flight_mode = flight_mode_label(self.custom_mode).to_string();
        status.system_status = system_status_label(self.system_status).to_string();
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SysStatus {
    /// Per mille
    pub load: u16,
    /// Millivolts
    pub voltage_battery: u16,
    /// Centiamperes, -1 unknown
    pub current_battery: i16,
    pub battery_remaining: i8,
}

impl SysStatus {
    pub fn decode(payload: &[u8]) -> Self {
        let r = PayloadReader::new(payload, payload_len::SYS_STATUS);
        Self {
            load: r.u16(12),
            voltage_battery: r.u16(14),
            current_battery: r.i16(16),
            battery_remaining: r.i8(30),
        }
    }

    pub fn apply(&self, snapshot: &mut TelemetrySnapshot) {
        let status = &mut snapshot.status;
        status.cpu_load = self.load as f32 / 10.0;
        status.battery.voltage = self.voltage_battery as f32 / 1000.0;
        status.battery.current = if self.current_battery == CURRENT_UNKNOWN {
            -1.0
        } else {
            self.current_battery as f32 / 100.0
        };
        status.battery.remaining = self.battery_remaining;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttitudeMsg {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
    pub roll_speed: f32,
    pub pitch_speed: f32,
    pub yaw_speed: f32,
}

impl AttitudeMsg {
    pub fn decode(payload: &[u8]) -> Self {
        let r = PayloadReader::new(payload, payload_len::ATTITUDE);
        Self {
            roll: r.f32(4),
            pitch: r.f32(8),
            yaw: r.f32(12),
            roll_speed: r.f32(16),
            pitch_speed: r.f32(20),
            yaw_speed: r.f32(24),
        }
    }

    pub fn apply(&self, snapshot: &mut TelemetrySnapshot) {
        let a = &mut snapshot.attitude;
        a.roll = self.roll;
        a.pitch = self.pitch;
        a.yaw = self.yaw;
        a.roll_speed = self.roll_speed;
        a.pitch_speed = self.pitch_speed;
        a.yaw_speed = self.yaw_speed;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalPositionInt {
    /// Degrees × 1e7
    pub lat: i32,
    /// Degrees × 1e7
    pub lon: i32,
    /// Millimeters MSL
    pub alt: i32,
    /// Millimeters above home
    pub relative_alt: i32,
    /// cm/s
    pub vx: i16,
    pub vy: i16,
    pub vz: i16,
    /// Centidegrees, `u16::MAX` unknown
    pub hdg: u16,
}

impl GlobalPositionInt {
    pub fn decode(payload: &[u8]) -> Self {
        let r = PayloadReader::new(payload, payload_len::GLOBAL_POSITION_INT);
        Self {
            lat: r.i32(4),
            lon: r.i32(8),
            alt: r.i32(12),
            relative_alt: r.i32(16),
            vx: r.i16(20),
            vy: r.i16(22),
            vz: r.i16(24),
            hdg: r.u16(26),
        }
    }

    pub fn latitude(&self) -> f64 {
        self.lat as f64 / 1e7
    }

    pub fn longitude(&self) -> f64 {
        self.lon as f64 / 1e7
    }

    pub fn altitude(&self) -> f32 {
        self.alt as f32 / 1000.0
    }

    /// Whether the fix is a real position rather than a "no fix" placeholder.
    pub fn has_fix(&self) -> bool {
        let (lat, lon) = (self.latitude(), self.longitude());
        !((lat == 0.0 && lon == 0.0) || (lat == -1.0 && lon == -1.0))
    }

    pub fn apply(&self, snapshot: &mut TelemetrySnapshot) {
        let p = &mut snapshot.position;
        p.latitude = self.latitude();
        p.longitude = self.longitude();
        p.altitude = self.altitude();
        p.relative_altitude = self.relative_alt as f32 / 1000.0;

        let v = &mut snapshot.velocity;
        v.north = self.vx as f32 / 100.0;
        v.east = self.vy as f32 / 100.0;
        v.down = self.vz as f32 / 100.0;

        if self.hdg != HEADING_UNKNOWN {
            snapshot.heading = self.hdg as f32 / 100.0;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VfrHud {
    pub airspeed: f32,
    pub groundspeed: f32,
    pub alt: f32,
    pub climb: f32,
    pub heading: i16,
    pub throttle: u16,
}

impl VfrHud {
    pub fn decode(payload: &[u8]) -> Self {
        let r = PayloadReader::new(payload, payload_len::VFR_HUD);
        Self {
            airspeed: r.f32(0),
            groundspeed: r.f32(4),
            alt: r.f32(8),
            climb: r.f32(12),
            heading: r.i16(16),
            throttle: r.u16(18),
        }
    }

    pub fn apply(&self, snapshot: &mut TelemetrySnapshot) {
        let v = &mut snapshot.velocity;
        v.air_speed = self.airspeed;
        v.ground_speed = self.groundspeed;
        v.climb_rate = self.climb;
        snapshot.heading = self.heading as f32;
        snapshot.throttle = self.throttle as f32;
    }
}

/// PARAM_VALUE plus the total count it announces.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamValue {
    pub entry: ParamEntry,
    pub count: u16,
}

impl ParamValue {
    pub fn decode(payload: &[u8]) -> Self {
        let r = PayloadReader::new(payload, payload_len::PARAM_VALUE);
        Self {
            entry: ParamEntry {
                id: r.fixed_str(8, PARAM_ID_LEN),
                value: r.f32(0),
                param_type: r.u8(24),
                index: r.u16(6),
            },
            count: r.u16(4),
        }
    }
}

pub fn command_ack(payload: &[u8]) -> (CommandKind, CommandOutcome) {
    let r = PayloadReader::new(payload, payload_len::COMMAND_ACK);
    (CommandKind::from_code(r.u16(0)), CommandOutcome::from_code(r.u8(2)))
}

/// Sequence number of MISSION_REQUEST or MISSION_REQUEST_INT.
pub fn mission_request_seq(payload: &[u8]) -> u16 {
    // Both variants share the same leading layout
    PayloadReader::new(payload, payload_len::MISSION_REQUEST_INT).u16(0)
}

pub fn mission_ack_result(payload: &[u8]) -> u8 {
    PayloadReader::new(payload, payload_len::MISSION_ACK).u8(2)
}

pub fn status_text(payload: &[u8]) -> (LogSeverity, String) {
    let r = PayloadReader::new(payload, payload_len::STATUSTEXT);
    (LogSeverity::from_code(r.u8(0)), r.fixed_str(1, STATUSTEXT_LEN))
}
