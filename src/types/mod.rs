//! Core data model of the ground link.
//!
//! - [`TelemetrySnapshot`] aggregates attitude, position, velocity and status,
//!   updated one field group at a time by the stream parser
//! - [`ParamEntry`] is one onboard parameter value
//! - [`MissionWaypoint`] is operator input, [`ItemParams`] its wire-ready form
//! - [`LinkEvent`] and [`MissionEvent`] are what subscribers receive
//! - [`CommandKind`] and [`CommandOutcome`] decode command acknowledgements

mod command;
mod event;
mod mission;
mod param;
mod telemetry;
mod update_rate;

pub use command::{CommandKind, CommandOutcome};
pub use event::{
    ConnectionStatus, HomePosition, LinkEvent, LinkState, LogSeverity, MissionEvent, ParsedEvent,
};
pub use mission::{ItemParams, MissionAction, MissionWaypoint};
pub use param::{PARAM_ID_LEN, PARAM_TYPE_REAL32, ParamEntry};
pub use telemetry::{
    Attitude, BATTERY_UNKNOWN, Battery, Position, TelemetrySnapshot, Velocity, VehicleStatus,
};
pub use update_rate::UpdateRate;
