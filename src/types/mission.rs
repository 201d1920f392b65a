//! Mission waypoints and their wire-ready form

use serde::{Deserialize, Serialize};

/// What a mission item asks the vehicle to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionAction {
    Waypoint,
    Takeoff,
    Land,
    /// Loiter indefinitely around the position
    Loiter,
    /// Loiter for `hold_time` seconds
    LoiterTime,
    ReturnToLaunch,
    ChangeSpeed,
    VtolTransition,
    /// Any action name this crate does not know
    #[serde(other)]
    Unknown,
}

/// A mission step as edited by the operator.
///
/// Only the fields meaningful for the action are read during conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionWaypoint {
    pub action: MissionAction,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Meters above home
    #[serde(default)]
    pub altitude: Option<f32>,
    /// Seconds
    #[serde(default)]
    pub hold_time: Option<f32>,
    /// Meters
    #[serde(default)]
    pub acceptance_radius: Option<f32>,
    /// Meters, negative for counter-clockwise
    #[serde(default)]
    pub loiter_radius: Option<f32>,
    /// m/s
    #[serde(default)]
    pub speed: Option<f32>,
    /// MAV_VTOL_STATE target (3 = multicopter, 4 = fixed wing)
    #[serde(default)]
    pub transition_state: Option<u8>,
}

impl MissionWaypoint {
    /// A plain waypoint at a position.
    pub fn waypoint(latitude: f64, longitude: f64, altitude: f32) -> Self {
        Self::at(MissionAction::Waypoint, latitude, longitude, altitude)
    }

    /// An action anchored at a position.
    pub fn at(action: MissionAction, latitude: f64, longitude: f64, altitude: f32) -> Self {
        Self {
            action,
            latitude: Some(latitude),
            longitude: Some(longitude),
            altitude: Some(altitude),
            ..Self::action(action)
        }
    }

    /// An action without a position.
    pub fn action(action: MissionAction) -> Self {
        Self {
            action,
            latitude: None,
            longitude: None,
            altitude: None,
            hold_time: None,
            acceptance_radius: None,
            loiter_radius: None,
            speed: None,
            transition_state: None,
        }
    }
}

/// Wire-ready parameters of one MISSION_ITEM_INT.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemParams {
    pub command: u16,
    pub frame: u8,
    pub autocontinue: bool,
    pub params: [f32; 4],
    /// Latitude in degrees × 1e7
    pub x: i32,
    /// Longitude in degrees × 1e7
    pub y: i32,
    /// Altitude in meters
    pub z: f32,
}
