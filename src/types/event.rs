//! Events published to link subscribers
//!
//! Events are split by category. Telemetry snapshots travel on a watch
//! channel (latest wins), everything a presentation layer reacts to travels
//! as [`LinkEvent`], and the paired request/response traffic of the mission
//! protocol travels as [`MissionEvent`] for the uploader alone.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use super::{CommandKind, CommandOutcome, ParamEntry, TelemetrySnapshot};
use crate::connection::ConnectionMode;

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LinkState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

/// Derived view of the connection, recomputed on demand.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub state: LinkState,
    pub mode: Option<ConnectionMode>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub last_heartbeat: Option<SystemTime>,
}

/// First valid global position fix of a parser's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HomePosition {
    pub latitude: f64,
    pub longitude: f64,
    /// Meters above mean sea level
    pub altitude: f32,
}

/// MAV_SEVERITY of a STATUSTEXT message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogSeverity {
    Emergency,
    Alert,
    Critical,
    Error,
    Warning,
    Notice,
    Info,
    Debug,
}

impl LogSeverity {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => LogSeverity::Emergency,
            1 => LogSeverity::Alert,
            2 => LogSeverity::Critical,
            3 => LogSeverity::Error,
            4 => LogSeverity::Warning,
            5 => LogSeverity::Notice,
            6 => LogSeverity::Info,
            _ => LogSeverity::Debug,
        }
    }
}

impl fmt::Display for LogSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LogSeverity::Emergency => "EMERGENCY",
            LogSeverity::Alert => "ALERT",
            LogSeverity::Critical => "CRITICAL",
            LogSeverity::Error => "ERROR",
            LogSeverity::Warning => "WARNING",
            LogSeverity::Notice => "NOTICE",
            LogSeverity::Info => "INFO",
            LogSeverity::Debug => "DEBUG",
        };
        f.write_str(label)
    }
}

/// Events for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    StatusChanged(ConnectionStatus),
    /// A heartbeat arrived from the vehicle
    Heartbeat { system_id: u8, component_id: u8 },
    /// No heartbeat for longer than the configured threshold
    HeartbeatTimeout { elapsed: Duration },
    HomePosition(HomePosition),
    ParamValue(ParamEntry),
    ParamProgress { received: usize, total: u16 },
    CommandAck { command: CommandKind, outcome: CommandOutcome },
    LogMessage { severity: LogSeverity, text: String },
    /// Non-fatal transport failure (send error, receive error)
    TransportError { context: String, message: String },
}

/// Mission protocol traffic forwarded to the uploader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissionEvent {
    /// MISSION_REQUEST (`int_form == false`) or MISSION_REQUEST_INT
    ItemRequested { seq: u16, int_form: bool },
    /// MISSION_ACK result code
    Ack { result: u8 },
}

/// Everything a single `feed` of the stream parser can yield.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedEvent {
    Telemetry(Arc<TelemetrySnapshot>),
    Link(LinkEvent),
    Mission(MissionEvent),
}
