//! Lookup tables for HEARTBEAT interpretation
//!
//! Flight modes follow the PX4 custom mode encoding: the main mode lives in
//! byte 2 of `custom_mode` and the sub mode in byte 3.

// PX4 main modes
pub mod px4_main {
    pub const MANUAL: u8 = 1;
    pub const ALTCTL: u8 = 2;
    pub const POSCTL: u8 = 3;
    pub const AUTO: u8 = 4;
    pub const ACRO: u8 = 5;
    pub const OFFBOARD: u8 = 6;
    pub const STABILIZED: u8 = 7;
    pub const RATTITUDE: u8 = 8;
}

// PX4 AUTO sub modes
pub mod px4_auto {
    pub const READY: u8 = 1;
    pub const TAKEOFF: u8 = 2;
    pub const LOITER: u8 = 3;
    pub const MISSION: u8 = 4;
    pub const RTL: u8 = 5;
    pub const LAND: u8 = 6;
    pub const FOLLOW_TARGET: u8 = 8;
    pub const PRECLAND: u8 = 9;
    pub const VTOL_TAKEOFF: u8 = 10;
}

/// Label used when a value is outside every table.
pub const UNKNOWN_LABEL: &str = "UNKNOWN";

/// MAV_STATE labels, indexed by value.
const SYSTEM_STATUS_LABELS: [&str; 8] = [
    "UNINIT",
    "BOOT",
    "CALIBRATING",
    "STANDBY",
    "ACTIVE",
    "CRITICAL",
    "EMERGENCY",
    "POWEROFF",
];

/// Split a PX4 custom mode into (main, sub).
pub fn split_custom_mode(custom_mode: u32) -> (u8, u8) {
    (((custom_mode >> 16) & 0xFF) as u8, ((custom_mode >> 24) & 0xFF) as u8)
}

/// Compose a PX4 custom mode from (main, sub).
pub fn compose_custom_mode(main: u8, sub: u8) -> u32 {
    ((main as u32) << 16) | ((sub as u32) << 24)
}

/// Human readable flight mode for a PX4 custom mode.
pub fn flight_mode_label(custom_mode: u32) -> &'static str {
    let (main, sub) = split_custom_mode(custom_mode);
    match main {
        px4_main::MANUAL => "Manual",
        px4_main::ALTCTL => "Altitude",
        px4_main::POSCTL => "Position",
        px4_main::AUTO => match sub {
            px4_auto::READY => "Ready",
            px4_auto::TAKEOFF => "Takeoff",
            px4_auto::LOITER => "Hold",
            px4_auto::MISSION => "Mission",
            px4_auto::RTL => "Return",
            px4_auto::LAND => "Land",
            px4_auto::FOLLOW_TARGET => "Follow Me",
            px4_auto::PRECLAND => "Precision Land",
            px4_auto::VTOL_TAKEOFF => "VTOL Takeoff",
            _ => "Auto",
        },
        px4_main::ACRO => "Acro",
        px4_main::OFFBOARD => "Offboard",
        px4_main::STABILIZED => "Stabilized",
        px4_main::RATTITUDE => "Rattitude",
        _ => UNKNOWN_LABEL,
    }
}

/// Label for a MAV_STATE value.
pub fn system_status_label(state: u8) -> &'static str {
    SYSTEM_STATUS_LABELS.get(state as usize).copied().unwrap_or(UNKNOWN_LABEL)
}
