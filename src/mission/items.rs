//! Waypoint conversion and mission protocol messages

use bytes::{BufMut, BytesMut};
use tracing::warn;

use crate::command::Target;
use crate::protocol::Message;
use crate::protocol::messages::{id, mav_cmd, mav_frame, mav_mission_type, payload_len};
use crate::types::{ItemParams, MissionAction, MissionWaypoint};

/// Acceptance radius used when an unknown action falls back to a waypoint.
pub const DEFAULT_ACCEPTANCE_RADIUS: f32 = 2.0;

/// MAV_VTOL_STATE_FW
const VTOL_STATE_FW: u8 = 4;

/// DO_CHANGE_SPEED speed type: ground speed
const SPEED_TYPE_GROUND: f32 = 1.0;

impl ItemParams {
    /// Map an operator waypoint to its wire parameters.
    ///
    /// Unknown actions become a plain waypoint with a 2 m acceptance radius
    /// instead of failing the whole mission.
    pub fn from_waypoint(waypoint: &MissionWaypoint) -> Self {
        let hold = waypoint.hold_time.unwrap_or(0.0);
        let loiter_radius = waypoint.loiter_radius.unwrap_or(0.0);
        // NaN yaw keeps the current heading
        let yaw = f32::NAN;

        let (command, params, positioned) = match waypoint.action {
            MissionAction::Waypoint => (
                mav_cmd::NAV_WAYPOINT,
                [hold, waypoint.acceptance_radius.unwrap_or(0.0), 0.0, yaw],
                true,
            ),
            MissionAction::Takeoff => (mav_cmd::NAV_TAKEOFF, [0.0, 0.0, 0.0, yaw], true),
            MissionAction::Land => (mav_cmd::NAV_LAND, [0.0, 0.0, 0.0, yaw], true),
            MissionAction::Loiter => {
                (mav_cmd::NAV_LOITER_UNLIM, [0.0, 0.0, loiter_radius, yaw], true)
            }
            MissionAction::LoiterTime => {
                (mav_cmd::NAV_LOITER_TIME, [hold, 0.0, loiter_radius, 0.0], true)
            }
            MissionAction::ReturnToLaunch => {
                (mav_cmd::NAV_RETURN_TO_LAUNCH, [0.0; 4], false)
            }
            MissionAction::ChangeSpeed => (
                mav_cmd::DO_CHANGE_SPEED,
                [SPEED_TYPE_GROUND, waypoint.speed.unwrap_or(-1.0), -1.0, 0.0],
                false,
            ),
            MissionAction::VtolTransition => (
                mav_cmd::DO_VTOL_TRANSITION,
                [waypoint.transition_state.unwrap_or(VTOL_STATE_FW) as f32, 0.0, 0.0, 0.0],
                false,
            ),
            MissionAction::Unknown => {
                warn!("Unknown mission action, sending as waypoint");
                (
                    mav_cmd::NAV_WAYPOINT,
                    [hold, waypoint.acceptance_radius.unwrap_or(DEFAULT_ACCEPTANCE_RADIUS), 0.0, yaw],
                    true,
                )
            }
        };

        let (frame, x, y, z) = if positioned {
            (
                mav_frame::GLOBAL_RELATIVE_ALT,
                degrees_e7(waypoint.latitude),
                degrees_e7(waypoint.longitude),
                waypoint.altitude.unwrap_or(0.0),
            )
        } else {
            (mav_frame::MISSION, 0, 0, 0.0)
        };

        Self { command, frame, autocontinue: true, params, x, y, z }
    }
}

fn degrees_e7(degrees: Option<f64>) -> i32 {
    degrees.map(|d| (d * 1e7).round() as i32).unwrap_or(0)
}

/// MISSION_CLEAR_ALL
pub fn mission_clear_all(target: Target) -> Message {
    let mut p = BytesMut::with_capacity(payload_len::MISSION_CLEAR_ALL);
    p.put_u8(target.system_id);
    p.put_u8(target.component_id);
    p.put_u8(mav_mission_type::MISSION);
    Message::new(id::MISSION_CLEAR_ALL, p.freeze())
}

/// MISSION_COUNT
pub fn mission_count(count: u16, target: Target) -> Message {
    let mut p = BytesMut::with_capacity(payload_len::MISSION_COUNT);
    p.put_u16_le(count);
    p.put_u8(target.system_id);
    p.put_u8(target.component_id);
    p.put_u8(mav_mission_type::MISSION);
    Message::new(id::MISSION_COUNT, p.freeze())
}

/// MISSION_ITEM_INT for item `seq`; item 0 is flagged as current.
pub fn mission_item_int(item: &ItemParams, seq: u16, target: Target) -> Message {
    let mut p = BytesMut::with_capacity(payload_len::MISSION_ITEM_INT);
    for param in item.params {
        p.put_f32_le(param);
    }
    p.put_i32_le(item.x);
    p.put_i32_le(item.y);
    p.put_f32_le(item.z);
    p.put_u16_le(seq);
    p.put_u16_le(item.command);
    p.put_u8(target.system_id);
    p.put_u8(target.component_id);
    p.put_u8(item.frame);
    p.put_u8(u8::from(seq == 0));
    p.put_u8(u8::from(item.autocontinue));
    p.put_u8(mav_mission_type::MISSION);
    Message::new(id::MISSION_ITEM_INT, p.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::PayloadReader;

    #[test]
    fn waypoint_mapping() {
        let mut wp = MissionWaypoint::waypoint(47.397742, 8.545594, 25.0);
        wp.acceptance_radius = Some(3.0);
        wp.hold_time = Some(5.0);
        let item = ItemParams::from_waypoint(&wp);

        assert_eq!(item.command, mav_cmd::NAV_WAYPOINT);
        assert_eq!(item.frame, mav_frame::GLOBAL_RELATIVE_ALT);
        assert!(item.autocontinue);
        assert_eq!(&item.params[..3], &[5.0, 3.0, 0.0]);
        assert!(item.params[3].is_nan());
        assert_eq!(item.x, 473_977_420);
        assert_eq!(item.y, 85_455_940);
        assert_eq!(item.z, 25.0);
    }

    #[test]
    fn loiter_radius_in_param3() {
        let mut wp = MissionWaypoint::at(MissionAction::LoiterTime, 47.0, 8.0, 30.0);
        wp.hold_time = Some(20.0);
        wp.loiter_radius = Some(-15.0);
        let item = ItemParams::from_waypoint(&wp);
        assert_eq!(item.command, mav_cmd::NAV_LOITER_TIME);
        assert_eq!(item.params, [20.0, 0.0, -15.0, 0.0]);
    }

    #[test]
    fn positionless_actions_use_mission_frame() {
        let rtl = ItemParams::from_waypoint(&MissionWaypoint::action(MissionAction::ReturnToLaunch));
        assert_eq!(rtl.command, mav_cmd::NAV_RETURN_TO_LAUNCH);
        assert_eq!(rtl.frame, mav_frame::MISSION);

        let mut transition = MissionWaypoint::action(MissionAction::VtolTransition);
        // Coordinates on a transition are ignored
        transition.latitude = Some(47.0);
        let item = ItemParams::from_waypoint(&transition);
        assert_eq!(item.command, mav_cmd::DO_VTOL_TRANSITION);
        assert_eq!(item.frame, mav_frame::MISSION);
        assert_eq!((item.x, item.y, item.z), (0, 0, 0.0));
        assert_eq!(item.params[0], 4.0);

        let mut speed = MissionWaypoint::action(MissionAction::ChangeSpeed);
        speed.speed = Some(8.5);
        let item = ItemParams::from_waypoint(&speed);
        assert_eq!(item.command, mav_cmd::DO_CHANGE_SPEED);
        assert_eq!(item.params, [1.0, 8.5, -1.0, 0.0]);
    }

    #[test]
    fn unknown_action_falls_back_to_waypoint() {
        let wp = MissionWaypoint::at(MissionAction::Unknown, 47.0, 8.0, 10.0);
        let item = ItemParams::from_waypoint(&wp);
        assert_eq!(item.command, mav_cmd::NAV_WAYPOINT);
        assert_eq!(item.frame, mav_frame::GLOBAL_RELATIVE_ALT);
        assert_eq!(item.params[1], DEFAULT_ACCEPTANCE_RADIUS);
    }

    #[test]
    fn mission_item_int_layout() {
        let item = ItemParams::from_waypoint(&MissionWaypoint::waypoint(-33.5, 151.25, 40.0));
        let target = Target::new(1, 1);

        let first = mission_item_int(&item, 0, target);
        assert_eq!(first.id, id::MISSION_ITEM_INT);
        assert_eq!(first.payload.len(), payload_len::MISSION_ITEM_INT);
        let r = PayloadReader::new(&first.payload, payload_len::MISSION_ITEM_INT);
        assert_eq!(r.i32(16), -335_000_000);
        assert_eq!(r.i32(20), 1_512_500_000);
        assert_eq!(r.f32(24), 40.0);
        assert_eq!(r.u16(28), 0);
        assert_eq!(r.u16(30), mav_cmd::NAV_WAYPOINT);
        assert_eq!((r.u8(32), r.u8(33)), (1, 1));
        assert_eq!(r.u8(34), mav_frame::GLOBAL_RELATIVE_ALT);
        assert_eq!(r.u8(35), 1, "item 0 is current");
        assert_eq!(r.u8(36), 1);

        let second = mission_item_int(&item, 1, target);
        let r = PayloadReader::new(&second.payload, payload_len::MISSION_ITEM_INT);
        assert_eq!(r.u16(28), 1);
        assert_eq!(r.u8(35), 0);
    }

    #[test]
    fn count_and_clear_layouts() {
        let target = Target::new(1, 1);
        let count = mission_count(7, target);
        assert_eq!(count.id, id::MISSION_COUNT);
        assert_eq!(&count.payload[..], &[7, 0, 1, 1, 0]);

        let clear = mission_clear_all(target);
        assert_eq!(clear.id, id::MISSION_CLEAR_ALL);
        assert_eq!(&clear.payload[..], &[1, 1, 0]);
    }
}
