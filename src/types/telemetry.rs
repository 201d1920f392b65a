//! Aggregated vehicle telemetry
//!
//! The snapshot is assembled from many independent messages. Each message
//! type owns one field group and overwrites only that group; nothing is ever
//! reset after construction.

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Sentinel for "unknown" battery readings.
pub const BATTERY_UNKNOWN: i8 = -1;

/// Vehicle attitude in radians and radians/second.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Attitude {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
    pub roll_speed: f32,
    pub pitch_speed: f32,
    pub yaw_speed: f32,
}

/// Global position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Degrees
    pub latitude: f64,
    /// Degrees
    pub longitude: f64,
    /// Meters above mean sea level
    pub altitude: f32,
    /// Meters above home
    pub relative_altitude: f32,
}

/// Velocity components in m/s (NED frame).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub north: f32,
    pub east: f32,
    pub down: f32,
    pub ground_speed: f32,
    pub air_speed: f32,
    pub climb_rate: f32,
}

/// Battery state as reported by SYS_STATUS.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Battery {
    /// Volts
    pub voltage: f32,
    /// Amperes, -1.0 when unknown
    pub current: f32,
    /// Percent, -1 when unknown
    pub remaining: i8,
}

impl Default for Battery {
    fn default() -> Self {
        Self { voltage: 0.0, current: -1.0, remaining: BATTERY_UNKNOWN }
    }
}

/// Arming, mode and health.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleStatus {
    pub armed: bool,
    pub flight_mode: String,
    pub system_status: String,
    pub battery: Battery,
    /// Percent
    pub cpu_load: f32,
}

impl Default for VehicleStatus {
    fn default() -> Self {
        Self {
            armed: false,
            flight_mode: "UNKNOWN".to_string(),
            system_status: "UNKNOWN".to_string(),
            battery: Battery::default(),
            cpu_load: 0.0,
        }
    }
}

/// One coherent view of everything decoded so far.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub attitude: Attitude,
    pub position: Position,
    pub velocity: Velocity,
    pub status: VehicleStatus,
    /// Degrees, 0..360
    pub heading: f32,
    /// Percent, 0..100
    pub throttle: f32,
    /// Wall-clock time of the last applied update
    pub timestamp: Option<SystemTime>,
}

impl TelemetrySnapshot {
    /// Record that a field group was just updated.
    pub fn touch(&mut self) {
        self.timestamp = Some(SystemTime::now());
    }
}
