//! Command and parameter request encoding
//!
//! Every builder is a pure function of its inputs and returns an unframed
//! [`Message`]; the link frames it with its own identity and sequence counter.
//!
//! ```rust
//! use skylink::command::{Command, Target, encode_command};
//!
//! let takeoff: Command = "takeoff".parse().unwrap();
//! let message = encode_command(&takeoff, Target::default()).unwrap().unwrap();
//! assert_eq!(message.payload.len(), 33);
//! ```

use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::protocol::messages::{AUTOPILOT_COMPONENT_ID, id, mav_cmd, payload_len};
use crate::protocol::{Message, put_fixed_str};
use crate::types::{CommandKind, PARAM_ID_LEN, ParamEntry};
use crate::{LinkError, Result};

/// Altitude used when a takeoff is requested without one.
pub const DEFAULT_TAKEOFF_ALTITUDE: f32 = 10.0;

/// Addressee of an outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    pub system_id: u8,
    pub component_id: u8,
}

impl Target {
    pub const fn new(system_id: u8, component_id: u8) -> Self {
        Self { system_id, component_id }
    }
}

impl Default for Target {
    /// The first autopilot of vehicle 1.
    fn default() -> Self {
        Self::new(1, AUTOPILOT_COMPONENT_ID)
    }
}

/// Logical commands the operator can issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "command")]
pub enum Command {
    Arm,
    Disarm,
    /// Climb to `altitude` meters above home
    Takeoff { altitude: f32 },
    Land,
    ReturnToLaunch,
    /// Pause the current mission or maneuver
    Hold,
    /// Not supported by the encoder yet
    SetMode { mode: String },
}

impl Command {
    /// Parse a command name with an optional argument.
    ///
    /// `takeoff` takes an altitude in meters, `set_mode` a mode name.
    pub fn parse(name: &str, arg: Option<&str>) -> Result<Self> {
        let command = match name.trim().to_ascii_lowercase().as_str() {
            "arm" => Command::Arm,
            "disarm" => Command::Disarm,
            "takeoff" => {
                let altitude = match arg {
                    Some(text) => text.trim().parse::<f32>().map_err(|e| {
                        LinkError::config("takeoff altitude", format!("'{}': {}", text, e))
                    })?,
                    None => DEFAULT_TAKEOFF_ALTITUDE,
                };
                Command::Takeoff { altitude }
            }
            "land" => Command::Land,
            "rtl" | "return_to_launch" => Command::ReturnToLaunch,
            "hold" | "pause" => Command::Hold,
            "set_mode" | "mode" => Command::SetMode { mode: arg.unwrap_or_default().to_string() },
            _ => return Err(LinkError::unknown_command(name)),
        };
        Ok(command)
    }

    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Arm | Command::Disarm => CommandKind::ArmDisarm,
            Command::Takeoff { .. } => CommandKind::Takeoff,
            Command::Land => CommandKind::Land,
            Command::ReturnToLaunch => CommandKind::ReturnToLaunch,
            Command::Hold => CommandKind::Hold,
            Command::SetMode { .. } => CommandKind::SetMode,
        }
    }
}

impl FromStr for Command {
    type Err = LinkError;

    fn from_str(s: &str) -> Result<Self> {
        Command::parse(s, None)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Arm => f.write_str("arm"),
            Command::Disarm => f.write_str("disarm"),
            Command::Takeoff { altitude } => write!(f, "takeoff to {altitude} m"),
            Command::Land => f.write_str("land"),
            Command::ReturnToLaunch => f.write_str("return to launch"),
            Command::Hold => f.write_str("hold"),
            Command::SetMode { mode } => write!(f, "set mode {mode}"),
        }
    }
}

/// Generic COMMAND_LONG contents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommandLong {
    pub command: u16,
    pub params: [f32; 7],
    pub target: Target,
    pub confirmation: u8,
}

impl CommandLong {
    pub fn new(command: u16, target: Target) -> Self {
        Self { command, params: [0.0; 7], target, confirmation: 0 }
    }

    /// Set parameter `n` (1-based, as in the MAVLink docs).
    pub fn param(mut self, n: usize, value: f32) -> Self {
        if let Some(slot) = n.checked_sub(1).and_then(|i| self.params.get_mut(i)) {
            *slot = value;
        }
        self
    }

    pub fn to_message(&self) -> Message {
        let mut p = BytesMut::with_capacity(payload_len::COMMAND_LONG);
        for param in self.params {
            p.put_f32_le(param);
        }
        p.put_u16_le(self.command);
        p.put_u8(self.target.system_id);
        p.put_u8(self.target.component_id);
        p.put_u8(self.confirmation);
        Message::new(id::COMMAND_LONG, p.freeze())
    }
}

/// Build the COMMAND_LONG for a logical command.
///
/// Returns `Ok(None)` for commands that are accepted but not encoded yet.
pub fn encode_command(command: &Command, target: Target) -> Result<Option<Message>> {
    let long = match command {
        Command::Arm => CommandLong::new(mav_cmd::COMPONENT_ARM_DISARM, target).param(1, 1.0),
        Command::Disarm => CommandLong::new(mav_cmd::COMPONENT_ARM_DISARM, target).param(1, 0.0),
        Command::Takeoff { altitude } => {
            CommandLong::new(mav_cmd::NAV_TAKEOFF, target).param(7, *altitude)
        }
        Command::Land => CommandLong::new(mav_cmd::NAV_LAND, target),
        Command::ReturnToLaunch => CommandLong::new(mav_cmd::NAV_RETURN_TO_LAUNCH, target),
        // param1 = 0 pauses
        Command::Hold => CommandLong::new(mav_cmd::DO_PAUSE_CONTINUE, target).param(1, 0.0),
        Command::SetMode { mode } => {
            warn!(mode = %mode, "Mode change is not implemented, nothing sent");
            return Ok(None);
        }
    };
    debug!(command = %command, code = long.command, "Encoded command");
    Ok(Some(long.to_message()))
}

/// PARAM_REQUEST_LIST
pub fn param_request_list(target: Target) -> Message {
    Message::new(id::PARAM_REQUEST_LIST, vec![target.system_id, target.component_id])
}

/// PARAM_SET; the name is truncated or NUL-padded to 16 bytes.
pub fn param_set(entry: &ParamEntry, target: Target) -> Message {
    let mut p = BytesMut::with_capacity(payload_len::PARAM_SET);
    p.put_f32_le(entry.value);
    p.put_u8(target.system_id);
    p.put_u8(target.component_id);
    put_fixed_str(&mut p, &entry.id, PARAM_ID_LEN);
    p.put_u8(entry.param_type);
    Message::new(id::PARAM_SET, p.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::PayloadReader;

    fn read_long(message: &Message) -> (u16, [f32; 7], u8, u8) {
        let r = PayloadReader::new(&message.payload, payload_len::COMMAND_LONG);
        let mut params = [0.0; 7];
        for (i, p) in params.iter_mut().enumerate() {
            *p = r.f32(i * 4);
        }
        (r.u16(28), params, r.u8(30), r.u8(31))
    }

    #[test]
    fn arm_and_disarm() {
        let arm = encode_command(&Command::Arm, Target::default()).unwrap().unwrap();
        assert_eq!(arm.id, id::COMMAND_LONG);
        assert_eq!(arm.payload.len(), 33);
        let (code, params, sys, comp) = read_long(&arm);
        assert_eq!(code, 400);
        assert_eq!(params[0], 1.0);
        assert_eq!((sys, comp), (1, 1));

        let disarm = encode_command(&Command::Disarm, Target::default()).unwrap().unwrap();
        let (code, params, _, _) = read_long(&disarm);
        assert_eq!(code, 400);
        assert_eq!(params[0], 0.0);
    }

    #[test]
    fn takeoff_altitude_in_param7() {
        let message = encode_command(&Command::Takeoff { altitude: 25.0 }, Target::new(2, 1))
            .unwrap()
            .unwrap();
        let (code, params, sys, _) = read_long(&message);
        assert_eq!(code, mav_cmd::NAV_TAKEOFF);
        assert_eq!(params[6], 25.0);
        assert_eq!(sys, 2);
    }

    #[test]
    fn codes_for_flight_commands() {
        for (command, code) in [
            (Command::Land, 21),
            (Command::ReturnToLaunch, 20),
            (Command::Hold, 193),
        ] {
            let message = encode_command(&command, Target::default()).unwrap().unwrap();
            assert_eq!(read_long(&message).0, code, "{command}");
            assert_eq!(command.kind().code(), code);
        }
    }

    #[test]
    fn set_mode_is_a_warning_not_an_error() {
        let command = Command::parse("set_mode", Some("POSCTL")).unwrap();
        assert_eq!(encode_command(&command, Target::default()).unwrap(), None);
    }

    #[test]
    fn parsing_names() {
        assert_eq!("ARM".parse::<Command>().unwrap(), Command::Arm);
        assert_eq!("rtl".parse::<Command>().unwrap(), Command::ReturnToLaunch);
        assert_eq!(
            "takeoff".parse::<Command>().unwrap(),
            Command::Takeoff { altitude: DEFAULT_TAKEOFF_ALTITUDE }
        );
        assert_eq!(
            Command::parse("takeoff", Some("42.5")).unwrap(),
            Command::Takeoff { altitude: 42.5 }
        );
        assert!(matches!(
            Command::parse("takeoff", Some("high")),
            Err(LinkError::Config { .. })
        ));
    }

    #[test]
    fn unknown_command_is_an_error() {
        let err = "barrel_roll".parse::<Command>().unwrap_err();
        assert!(matches!(err, LinkError::UnknownCommand { ref name } if name == "barrel_roll"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn param_request_list_layout() {
        let message = param_request_list(Target::new(1, 1));
        assert_eq!(message.id, id::PARAM_REQUEST_LIST);
        assert_eq!(&message.payload[..], &[1, 1]);
    }

    #[test]
    fn param_set_layout() {
        let entry = ParamEntry::real32("MPC_XY_CRUISE", 7.5);
        let message = param_set(&entry, Target::new(1, 1));
        assert_eq!(message.id, id::PARAM_SET);
        assert_eq!(message.payload.len(), payload_len::PARAM_SET);

        let r = PayloadReader::new(&message.payload, payload_len::PARAM_SET);
        assert_eq!(r.f32(0), 7.5);
        assert_eq!((r.u8(4), r.u8(5)), (1, 1));
        assert_eq!(r.fixed_str(6, 16), "MPC_XY_CRUISE");
        assert_eq!(r.u8(22), 9);
    }

    #[test]
    fn param_set_truncates_long_names() {
        let entry = ParamEntry::real32("SENS_BOARD_X_OFFSET_EXTRA", 0.0);
        let message = param_set(&entry, Target::default());
        assert_eq!(message.payload.len(), payload_len::PARAM_SET);
        assert_eq!(&message.payload[6..22], b"SENS_BOARD_X_OFF");
    }
}
