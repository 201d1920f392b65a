//! Logical command identities and acknowledgement outcomes

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::protocol::messages::{mav_cmd, mav_result};

/// Logical command recovered from a MAV_CMD code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandKind {
    ArmDisarm,
    Takeoff,
    Land,
    ReturnToLaunch,
    Hold,
    SetMode,
    Unknown(u16),
}

impl CommandKind {
    pub fn from_code(code: u16) -> Self {
        match code {
            mav_cmd::COMPONENT_ARM_DISARM => CommandKind::ArmDisarm,
            mav_cmd::NAV_TAKEOFF => CommandKind::Takeoff,
            mav_cmd::NAV_LAND => CommandKind::Land,
            mav_cmd::NAV_RETURN_TO_LAUNCH => CommandKind::ReturnToLaunch,
            mav_cmd::DO_PAUSE_CONTINUE => CommandKind::Hold,
            mav_cmd::DO_SET_MODE => CommandKind::SetMode,
            other => CommandKind::Unknown(other),
        }
    }

    pub fn code(self) -> u16 {
        match self {
            CommandKind::ArmDisarm => mav_cmd::COMPONENT_ARM_DISARM,
            CommandKind::Takeoff => mav_cmd::NAV_TAKEOFF,
            CommandKind::Land => mav_cmd::NAV_LAND,
            CommandKind::ReturnToLaunch => mav_cmd::NAV_RETURN_TO_LAUNCH,
            CommandKind::Hold => mav_cmd::DO_PAUSE_CONTINUE,
            CommandKind::SetMode => mav_cmd::DO_SET_MODE,
            CommandKind::Unknown(code) => code,
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandKind::ArmDisarm => f.write_str("ARM"),
            CommandKind::Takeoff => f.write_str("TAKEOFF"),
            CommandKind::Land => f.write_str("LAND"),
            CommandKind::ReturnToLaunch => f.write_str("RTL"),
            CommandKind::Hold => f.write_str("HOLD"),
            CommandKind::SetMode => f.write_str("SET_MODE"),
            CommandKind::Unknown(code) => write!(f, "UNKNOWN({})", code),
        }
    }
}

/// Result carried by COMMAND_ACK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandOutcome {
    Accepted,
    TemporarilyRejected,
    Denied,
    Unsupported,
    Failed,
    InProgress,
    Cancelled,
    Unknown(u8),
}

impl CommandOutcome {
    pub fn from_code(code: u8) -> Self {
        match code {
            mav_result::ACCEPTED => CommandOutcome::Accepted,
            mav_result::TEMPORARILY_REJECTED => CommandOutcome::TemporarilyRejected,
            mav_result::DENIED => CommandOutcome::Denied,
            mav_result::UNSUPPORTED => CommandOutcome::Unsupported,
            mav_result::FAILED => CommandOutcome::Failed,
            mav_result::IN_PROGRESS => CommandOutcome::InProgress,
            mav_result::CANCELLED => CommandOutcome::Cancelled,
            other => CommandOutcome::Unknown(other),
        }
    }

    pub fn is_accepted(self) -> bool {
        self == CommandOutcome::Accepted
    }
}

impl fmt::Display for CommandOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandOutcome::Accepted => f.write_str("Accepted"),
            CommandOutcome::TemporarilyRejected => f.write_str("Temporarily rejected"),
            CommandOutcome::Denied => f.write_str("Denied"),
            CommandOutcome::Unsupported => f.write_str("Unsupported"),
            CommandOutcome::Failed => f.write_str("Failed"),
            CommandOutcome::InProgress => f.write_str("In progress"),
            CommandOutcome::Cancelled => f.write_str("Cancelled"),
            CommandOutcome::Unknown(code) => write!(f, "Unknown result ({})", code),
        }
    }
}
