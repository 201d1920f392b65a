//! Ground-side MAVLink 2 protocol engine.
//!
//! Skylink talks to a single autonomous vehicle over UDP: it decodes the
//! vehicle's telemetry stream, encodes operator commands, and negotiates
//! mission uploads.
//!
//! # Features
//!
//! - **Wire codec**: MAVLink 2 framing with CRC-16/MCRF4XX and CRC-Extra seeds
//! - **Stream parser**: resynchronizing frame extraction over arbitrary chunking
//! - **Connection manager**: UDP link lifecycle with a heartbeat watchdog
//! - **Mission upload**: the clear / count / request / item / ack handshake
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use skylink::{Command, ConnectionConfig, ConnectionMode, Skylink, UpdateRate};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> skylink::Result<()> {
//!     let link = Skylink::new();
//!     link.connect(ConnectionConfig::for_mode(ConnectionMode::SimulatedBus)).await?;
//!     link.send_command(&Command::Arm).await?;
//!
//!     let mut telemetry = Box::pin(link.telemetry(UpdateRate::Max(10)));
//!     while let Some(snapshot) = telemetry.next().await {
//!         println!("alt {:.1} m, mode {}", snapshot.position.relative_altitude, snapshot.status.flight_mode);
//!     }
//!     Ok(())
//! }
//! ```

// Core types and error handling
mod error;
pub mod logging;
pub mod protocol;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Link runtime
pub mod connection;
pub mod driver;
pub mod parser;
pub mod provider;
pub mod providers;
pub mod stream;

// Outbound protocol
pub mod command;
pub mod mission;

// Core exports
pub use error::*;
pub use types::*;

// Main API exports
pub use command::{Command, Target};
pub use connection::{ConnectionConfig, ConnectionManager, ConnectionMode, LinkTiming};
pub use mission::{MissionUploader, UploadError, UploadResult};
pub use parser::{ChecksumPolicy, ParserOptions, StreamParser};

use futures::Stream;
use std::sync::Arc;

/// Unified entry point for a ground link.
///
/// Owns the one [`ConnectionManager`] of the process and hands out shared
/// references to it. Outbound calls address `target`, which defaults to the
/// first autopilot of vehicle 1.
///
/// ```rust,no_run
/// use skylink::{ConnectionConfig, ConnectionMode, MissionWaypoint, Skylink};
///
/// # #[tokio::main]
/// # async fn main() -> skylink::Result<()> {
/// let link = Skylink::new();
/// link.connect(ConnectionConfig::for_mode(ConnectionMode::RealVehicle)).await?;
///
/// let mission = vec![
///     MissionWaypoint::waypoint(47.3977, 8.5456, 20.0),
///     MissionWaypoint::waypoint(47.3980, 8.5460, 20.0),
/// ];
/// let result = link.upload_mission(&mission).await;
/// println!("uploaded: {}", result.success);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Skylink {
    manager: Arc<ConnectionManager>,
    target: Target,
}

impl Default for Skylink {
    fn default() -> Self {
        Self::new()
    }
}

impl Skylink {
    pub fn new() -> Self {
        Self::with_timing(LinkTiming::default())
    }

    pub fn with_timing(timing: LinkTiming) -> Self {
        Self::with_options(timing, ParserOptions::default())
    }

    pub fn with_options(timing: LinkTiming, parser_options: ParserOptions) -> Self {
        Self {
            manager: Arc::new(ConnectionManager::new(timing, parser_options)),
            target: Target::default(),
        }
    }

    /// Address outbound commands and missions to another vehicle.
    pub fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    pub fn target(&self) -> Target {
        self.target
    }

    /// The shared connection manager.
    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    pub async fn connect(&self, config: ConnectionConfig) -> Result<()> {
        self.manager.connect(config).await
    }

    pub async fn reconnect(&self, host: impl Into<String>, port: u16) -> Result<()> {
        self.manager.reconnect(host, port).await
    }

    pub async fn disconnect(&self) {
        self.manager.disconnect().await
    }

    /// Encode and transmit a command.
    ///
    /// Returns `Ok(false)` when the command is accepted but has no wire
    /// encoding, so nothing was sent.
    pub async fn send_command(&self, command: &Command) -> Result<bool> {
        match command::encode_command(command, self.target)? {
            Some(message) => {
                self.manager.send_message(&message).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Ask the vehicle to stream its whole parameter table.
    pub async fn request_all_parameters(&self) -> Result<()> {
        self.manager.send_message(&command::param_request_list(self.target)).await
    }

    pub async fn set_parameter(&self, entry: &ParamEntry) -> Result<()> {
        self.manager.send_message(&command::param_set(entry, self.target)).await
    }

    /// Uploader bound to this link, for callers that want its cancel token.
    pub fn mission_uploader(&self) -> MissionUploader {
        let link: Arc<dyn mission::MissionLink> = self.manager.clone();
        MissionUploader::new(link, *self.manager.timing())
    }

    /// Upload a mission to the target vehicle and wait for the outcome.
    pub async fn upload_mission(&self, waypoints: &[MissionWaypoint]) -> UploadResult {
        self.mission_uploader()
            .upload(waypoints, self.target.system_id, self.target.component_id)
            .await
    }

    pub fn telemetry(&self, rate: UpdateRate) -> impl Stream<Item = Arc<TelemetrySnapshot>> + 'static {
        self.manager.telemetry(rate)
    }

    pub fn events(&self) -> impl Stream<Item = LinkEvent> + 'static {
        self.manager.events()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.manager.status()
    }
}
