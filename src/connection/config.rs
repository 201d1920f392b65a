//! Connection settings and link timing
//!
//! Settings arrive from a persistence layer as YAML. Any field may be left
//! out; missing fields take the defaults of the selected mode, so
//! `mode: real_vehicle` alone is a complete configuration.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::protocol::messages::{GCS_COMPONENT_ID, GCS_SYSTEM_ID};
use crate::{LinkError, Result};

/// Outbound destination when no remote host is configured.
const DEFAULT_REMOTE_HOST: &str = "127.0.0.1";

/// Where the vehicle lives relative to this ground station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionMode {
    /// A simulator or router on the same machine
    #[default]
    SimulatedBus,
    /// A radio or companion link to a real aircraft
    RealVehicle,
}

/// Endpoint and identity for one connection attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PartialConnectionConfig")]
pub struct ConnectionConfig {
    pub mode: ConnectionMode,
    /// Local address to bind
    pub host: String,
    /// Local port to bind, 0 for an ephemeral port
    pub local_port: u16,
    /// Destination host for outbound frames. When unset, a real-vehicle link
    /// replies to whoever first sends it a valid frame, and otherwise to
    /// the loopback address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_host: Option<String>,
    pub remote_port: u16,
    /// Our MAVLink system id
    pub system_id: u8,
    /// Our MAVLink component id
    pub component_id: u8,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::for_mode(ConnectionMode::default())
    }
}

impl ConnectionConfig {
    /// Defaults for a mode.
    pub fn for_mode(mode: ConnectionMode) -> Self {
        let (host, remote_port) = match mode {
            ConnectionMode::SimulatedBus => ("127.0.0.1", 14580),
            ConnectionMode::RealVehicle => ("0.0.0.0", 14555),
        };
        Self {
            mode,
            host: host.to_string(),
            local_port: 14550,
            remote_host: None,
            remote_port,
            system_id: GCS_SYSTEM_ID,
            component_id: GCS_COMPONENT_ID,
        }
    }

    /// Parse settings from YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load settings from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|source| LinkError::ConfigFile { path: path.to_path_buf(), source })?;
        debug!(path = %path.display(), "Loaded connection settings");
        Self::from_yaml_str(&text)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.system_id == 0 {
            return Err(LinkError::config("system_id", "0 is reserved for broadcast"));
        }
        self.local_addr()?;
        self.remote_addr()?;
        Ok(())
    }

    /// Address to bind.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|e| LinkError::config("host", format!("'{}': {}", self.host, e)))?;
        Ok(SocketAddr::new(ip, self.local_port))
    }

    /// Configured destination for outbound frames.
    pub fn remote_addr(&self) -> Result<SocketAddr> {
        let host = self.remote_host.as_deref().unwrap_or(DEFAULT_REMOTE_HOST);
        let ip: IpAddr = host
            .parse()
            .map_err(|e| LinkError::config("remote_host", format!("'{}': {}", host, e)))?;
        Ok(SocketAddr::new(ip, self.remote_port))
    }

    /// Whether the send target is learned from inbound traffic.
    ///
    /// Only real-vehicle links without an explicit `remote_host` learn.
    pub fn learns_peer(&self) -> bool {
        self.mode == ConnectionMode::RealVehicle && self.remote_host.is_none()
    }
}

/// Wire form of [`ConnectionConfig`] where every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PartialConnectionConfig {
    #[serde(default)]
    mode: ConnectionMode,
    host: Option<String>,
    local_port: Option<u16>,
    remote_host: Option<String>,
    remote_port: Option<u16>,
    system_id: Option<u8>,
    component_id: Option<u8>,
}

impl From<PartialConnectionConfig> for ConnectionConfig {
    fn from(partial: PartialConnectionConfig) -> Self {
        let defaults = ConnectionConfig::for_mode(partial.mode);
        Self {
            mode: partial.mode,
            host: partial.host.unwrap_or(defaults.host),
            local_port: partial.local_port.unwrap_or(defaults.local_port),
            remote_host: partial.remote_host.or(defaults.remote_host),
            remote_port: partial.remote_port.unwrap_or(defaults.remote_port),
            system_id: partial.system_id.unwrap_or(defaults.system_id),
            component_id: partial.component_id.unwrap_or(defaults.component_id),
        }
    }
}

/// Timers of the link and of mission uploads, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkTiming {
    pub heartbeat_check_interval_ms: u64,
    pub heartbeat_timeout_ms: u64,
    /// Pause between teardown and rebind during reconnect
    pub reconnect_settle_ms: u64,
    /// Overall deadline of one mission upload attempt
    pub upload_timeout_ms: u64,
    /// Delay between MISSION_CLEAR_ALL and MISSION_COUNT
    pub count_settle_ms: u64,
}

impl Default for LinkTiming {
    fn default() -> Self {
        Self {
            heartbeat_check_interval_ms: 1000,
            heartbeat_timeout_ms: 3000,
            reconnect_settle_ms: 500,
            upload_timeout_ms: 30_000,
            count_settle_ms: 300,
        }
    }
}

impl LinkTiming {
    pub fn heartbeat_check_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_check_interval_ms)
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_millis(self.heartbeat_timeout_ms)
    }

    pub fn reconnect_settle(&self) -> Duration {
        Duration::from_millis(self.reconnect_settle_ms)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_millis(self.upload_timeout_ms)
    }

    pub fn count_settle(&self) -> Duration {
        Duration::from_millis(self.count_settle_ms)
    }
}
