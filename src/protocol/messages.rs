//! MAVLink identifiers and enum values used by the ground link
//!
//! Only the subset of the common dialect that the link consumes or produces is
//! listed here. Values match the MAVLink `common.xml` definitions.

// Message identifiers
pub mod id {
    pub const HEARTBEAT: u32 = 0;
    pub const SYS_STATUS: u32 = 1;
    pub const PARAM_REQUEST_LIST: u32 = 21;
    pub const PARAM_VALUE: u32 = 22;
    pub const PARAM_SET: u32 = 23;
    pub const ATTITUDE: u32 = 30;
    pub const GLOBAL_POSITION_INT: u32 = 33;
    pub const MISSION_REQUEST: u32 = 40; // legacy float form
    pub const MISSION_COUNT: u32 = 44;
    pub const MISSION_CLEAR_ALL: u32 = 45;
    pub const MISSION_ACK: u32 = 47;
    pub const MISSION_REQUEST_INT: u32 = 51;
    pub const MISSION_ITEM_INT: u32 = 73;
    pub const VFR_HUD: u32 = 74;
    pub const COMMAND_LONG: u32 = 76;
    pub const COMMAND_ACK: u32 = 77;
    pub const STATUSTEXT: u32 = 253;
}

// Full (untruncated) payload lengths, including MAVLink 2 extension fields
pub mod payload_len {
    pub const HEARTBEAT: usize = 9;
    pub const SYS_STATUS: usize = 31;
    pub const PARAM_REQUEST_LIST: usize = 2;
    pub const PARAM_VALUE: usize = 25;
    pub const PARAM_SET: usize = 23;
    pub const ATTITUDE: usize = 28;
    pub const GLOBAL_POSITION_INT: usize = 28;
    pub const MISSION_REQUEST: usize = 5;
    pub const MISSION_COUNT: usize = 5;
    pub const MISSION_CLEAR_ALL: usize = 3;
    pub const MISSION_ACK: usize = 4;
    pub const MISSION_REQUEST_INT: usize = 5;
    pub const MISSION_ITEM_INT: usize = 38;
    pub const VFR_HUD: usize = 20;
    pub const COMMAND_LONG: usize = 33;
    pub const COMMAND_ACK: usize = 3;
    pub const STATUSTEXT: usize = 51;
}

// MAV_CMD values
pub mod mav_cmd {
    pub const NAV_WAYPOINT: u16 = 16;
    pub const NAV_LOITER_UNLIM: u16 = 17;
    pub const NAV_LOITER_TIME: u16 = 19;
    pub const NAV_RETURN_TO_LAUNCH: u16 = 20;
    pub const NAV_LAND: u16 = 21;
    pub const NAV_TAKEOFF: u16 = 22;
    pub const DO_SET_MODE: u16 = 176;
    pub const DO_CHANGE_SPEED: u16 = 178;
    pub const DO_PAUSE_CONTINUE: u16 = 193;
    pub const COMPONENT_ARM_DISARM: u16 = 400;
    pub const DO_VTOL_TRANSITION: u16 = 3000;
}

// MAV_FRAME values
pub mod mav_frame {
    pub const MISSION: u8 = 2; // no position, "frame-less" items
    pub const GLOBAL_RELATIVE_ALT: u8 = 3;
}

// MAV_RESULT values carried by COMMAND_ACK
pub mod mav_result {
    pub const ACCEPTED: u8 = 0;
    pub const TEMPORARILY_REJECTED: u8 = 1;
    pub const DENIED: u8 = 2;
    pub const UNSUPPORTED: u8 = 3;
    pub const FAILED: u8 = 4;
    pub const IN_PROGRESS: u8 = 5;
    pub const CANCELLED: u8 = 6;
}

// MAV_MISSION_RESULT values carried by MISSION_ACK
pub mod mav_mission_result {
    pub const ACCEPTED: u8 = 0;
    pub const ERROR: u8 = 1;
}

pub mod mav_mission_type {
    pub const MISSION: u8 = 0;
}

// MAV_MODE_FLAG bits of HEARTBEAT.base_mode
pub mod mode_flag {
    pub const CUSTOM_MODE_ENABLED: u8 = 0x01;
    pub const SAFETY_ARMED: u8 = 0x80;
}

/// Well-known system id used by ground control stations.
pub const GCS_SYSTEM_ID: u8 = 255;

/// MAV_COMP_ID_MISSIONPLANNER
pub const GCS_COMPONENT_ID: u8 = 190;

/// MAV_COMP_ID_AUTOPILOT1
pub const AUTOPILOT_COMPONENT_ID: u8 = 1;
