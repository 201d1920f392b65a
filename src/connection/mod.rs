//! UDP link to the vehicle.
//!
//! [`ConnectionManager`] owns the socket, the link lifecycle and the heartbeat
//! watchdog. It is constructed once and shared by reference; at most one
//! endpoint is connected at a time.
//!
//! ```text
//! Disconnected --connect--> Connecting --bound--> Connected --disconnect--> Disconnected
//!                               |                     |
//!                          bind failed           reconnect
//!                               v                     v
//!                          Disconnected         Reconnecting --settle--> Connecting
//! ```
//!
//! Inbound datagrams are fed to one [`StreamParser`] per connection by the
//! [`Driver`]; decoded events are published on the manager's [`EventBus`],
//! which outlives individual connections so subscriptions survive reconnects.
//! A reader that gives up takes the link from Connected back to Disconnected.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::net::SocketAddr;
use std::sync::{Arc, Weak};
use std::sync::atomic::AtomicBool;
use tokio::net::UdpSocket;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::{BroadcastStream, WatchStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::driver::{Driver, DriverExit, EventBus};
use crate::mission::{MissionLink, UploadSlot};
use crate::parser::{ParserOptions, StreamParser};
use crate::protocol::{FrameSequencer, Message};
use crate::providers::UdpSource;
use crate::stream::ThrottleExt;
use crate::types::{
    ConnectionStatus, LinkEvent, LinkState, MissionEvent, TelemetrySnapshot, UpdateRate,
};
use crate::{LinkError, Result};

mod config;
mod watchdog;


pub use config::{ConnectionConfig, ConnectionMode, LinkTiming};
pub use watchdog::{HeartbeatClock, HeartbeatRecord, Watchdog};

/// Everything that exists only while connected.
struct Session {
    config: ConnectionConfig,
    socket: Arc<UdpSocket>,
    local_addr: SocketAddr,
    remote_addr: SocketAddr,
    /// Sender address learned from inbound traffic
    peer: Option<Arc<watch::Sender<Option<SocketAddr>>>>,
    sequencer: FrameSequencer,
    cancel: CancellationToken,
}

impl Session {
    fn destination(&self) -> SocketAddr {
        self.peer.as_ref().and_then(|peer| *peer.borrow()).unwrap_or(self.remote_addr)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Link state reachable from the tasks that supervise a session.
struct Shared {
    bus: EventBus,
    state: watch::Sender<LinkState>,
    heartbeat: HeartbeatClock,
    session: watch::Sender<Option<Arc<Session>>>,
}

impl Shared {
    fn current_session(&self) -> Option<Arc<Session>> {
        self.session.borrow().clone()
    }

    fn state(&self) -> LinkState {
        *self.state.borrow()
    }

    fn status(&self) -> ConnectionStatus {
        let state = self.state();
        let session = self.current_session();
        ConnectionStatus {
            connected: state == LinkState::Connected && session.is_some(),
            state,
            mode: session.as_ref().map(|s| s.config.mode),
            host: session.as_ref().map(|s| s.config.host.clone()),
            port: session.as_ref().map(|s| s.local_addr.port()),
            last_heartbeat: self.heartbeat.last().map(|record| record.wall),
        }
    }

    fn set_state(&self, state: LinkState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!(?previous, ?state, "Link state changed");
            self.bus.publish_link(LinkEvent::StatusChanged(self.status()));
        }
    }

    /// Close `lost` after its reader stopped on its own.
    ///
    /// No-op when that session was already replaced or torn down.
    fn link_lost(&self, lost: &Weak<Session>, exit: DriverExit) {
        let mut removed = None;
        self.session.send_if_modified(|current| {
            let is_lost = current
                .as_ref()
                .is_some_and(|session| std::ptr::eq(Arc::as_ptr(session), lost.as_ptr()));
            if is_lost {
                removed = current.take();
            }
            is_lost
        });
        let Some(session) = removed else {
            return;
        };

        error!(local = %session.local_addr, ?exit, "Link reader stopped, closing link");
        session.cancel.cancel();
        drop(session);
        self.heartbeat.clear();
        self.set_state(LinkState::Disconnected);
    }
}

pub struct ConnectionManager {
    timing: LinkTiming,
    parser_options: ParserOptions,
    shared: Arc<Shared>,
    /// Serializes lifecycle changes and holds the link's background tasks
    tasks: Mutex<Vec<JoinHandle<()>>>,
    upload_in_flight: Arc<AtomicBool>,
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new(LinkTiming::default(), ParserOptions::default())
    }
}

impl ConnectionManager {
    pub fn new(timing: LinkTiming, parser_options: ParserOptions) -> Self {
        Self {
            timing,
            parser_options,
            shared: Arc::new(Shared {
                bus: EventBus::new(),
                state: watch::Sender::new(LinkState::Disconnected),
                heartbeat: HeartbeatClock::default(),
                session: watch::Sender::new(None),
            }),
            tasks: Mutex::new(Vec::new()),
            upload_in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Bind the configured endpoint and start the reader and watchdog.
    ///
    /// If the reader later stops on its own (the socket keeps failing), the
    /// link moves to [`LinkState::Disconnected`] and can be connected again.
    pub async fn connect(&self, config: ConnectionConfig) -> Result<()> {
        let mut tasks = self.tasks.lock().await;
        if let Some(session) = self.current_session() {
            return Err(LinkError::AlreadyConnected { addr: session.local_addr.to_string() });
        }
        // Leftovers of a link that was lost rather than disconnected
        join_all(&mut tasks).await;

        config.validate()?;
        let local = config.local_addr()?;
        let remote_addr = config.remote_addr()?;

        info!(mode = ?config.mode, local = %local, remote = %remote_addr, "Connecting");
        self.set_state(LinkState::Connecting);

        let socket = match UdpSource::bind(local).await {
            Ok(socket) => socket,
            Err(e) => {
                warn!(local = %local, error = %e, "Connect failed");
                self.shared.bus.publish_link(LinkEvent::TransportError {
                    context: "bind".to_string(),
                    message: e.to_string(),
                });
                self.set_state(LinkState::Disconnected);
                return Err(e);
            }
        };
        let local_addr = socket.local_addr().unwrap_or(local);

        let cancel = CancellationToken::new();
        let peer = config.learns_peer().then(|| Arc::new(watch::Sender::new(None)));
        self.shared.heartbeat.clear();

        let reader = Driver::spawn(
            UdpSource::new(Arc::clone(&socket)),
            StreamParser::new(self.parser_options),
            self.shared.bus.clone(),
            self.shared.heartbeat.clone(),
            peer.clone(),
            cancel.child_token(),
        );
        let watchdog = Watchdog::spawn(
            self.shared.heartbeat.clone(),
            self.shared.bus.clone(),
            self.timing.heartbeat_check_interval(),
            self.timing.heartbeat_timeout(),
            cancel.child_token(),
        );

        let sequencer = FrameSequencer::new(config.system_id, config.component_id);
        let session = Arc::new(Session {
            config,
            socket,
            local_addr,
            remote_addr,
            peer,
            sequencer,
            cancel,
        });
        let lost = Arc::downgrade(&session);
        self.shared.session.send_replace(Some(session));
        self.set_state(LinkState::Connected);

        // Spawned last so a reader that dies immediately still finds its session
        let shared = Arc::clone(&self.shared);
        let supervisor = tokio::spawn(async move {
            let exit = match reader.await {
                Ok(exit) => exit,
                Err(e) => {
                    warn!("Link reader task ended abnormally: {}", e);
                    DriverExit::Failed
                }
            };
            if exit.is_link_lost() {
                shared.link_lost(&lost, exit);
            }
        });
        tasks.push(supervisor);
        tasks.push(watchdog);

        info!(local = %local_addr, "Link connected");
        Ok(())
    }

    /// Reconnect on a new local address, keeping every other setting.
    ///
    /// Falls back to default settings when nothing was connected before.
    pub async fn reconnect(&self, host: impl Into<String>, port: u16) -> Result<()> {
        let mut config = self.config().unwrap_or_default();
        config.host = host.into();
        config.local_port = port;

        {
            let mut tasks = self.tasks.lock().await;
            if self.current_session().is_some() {
                self.set_state(LinkState::Reconnecting);
                self.shutdown(&mut tasks).await;
            }
        }

        debug!(settle_ms = self.timing.reconnect_settle_ms, "Waiting for socket teardown");
        tokio::time::sleep(self.timing.reconnect_settle()).await;
        self.connect(config).await
    }

    /// Close the link. Safe to call when already disconnected.
    pub async fn disconnect(&self) {
        let mut tasks = self.tasks.lock().await;
        if self.shutdown(&mut tasks).await {
            self.set_state(LinkState::Disconnected);
            info!("Link disconnected");
        }
    }

    /// Tear down the session and wait for its tasks. Returns whether one existed.
    async fn shutdown(&self, tasks: &mut Vec<JoinHandle<()>>) -> bool {
        let Some(session) = self.shared.session.send_replace(None) else {
            join_all(tasks).await;
            return false;
        };
        session.cancel.cancel();
        drop(session);
        join_all(tasks).await;
        self.shared.heartbeat.clear();
        true
    }

    /// Transmit an already framed message.
    ///
    /// Goes to `target` when given, else to the learned peer or the configured
    /// remote endpoint. Failures are also published as transport errors.
    pub async fn send(&self, frame: Bytes, target: Option<SocketAddr>) -> Result<()> {
        let Some(session) = self.current_session() else {
            warn!("Link not connected, dropping {} byte frame", frame.len());
            return Err(LinkError::NotConnected);
        };
        self.transmit(&session, &frame, target).await
    }

    /// Frame a message with this link's identity and sequence, then send it.
    pub async fn send_message(&self, message: &Message) -> Result<()> {
        let Some(session) = self.current_session() else {
            warn!(msg_id = message.id, "Link not connected, dropping message");
            return Err(LinkError::NotConnected);
        };
        let frame = session.sequencer.frame(message);
        self.transmit(&session, &frame, None).await
    }

    async fn transmit(&self, session: &Session, frame: &[u8], target: Option<SocketAddr>) -> Result<()> {
        let dest = target.unwrap_or_else(|| session.destination());
        match session.socket.send_to(frame, dest).await {
            Ok(sent) => {
                trace!(bytes = sent, dest = %dest, "Frame sent");
                Ok(())
            }
            Err(e) => {
                warn!(dest = %dest, error = %e, "Send failed");
                self.shared.bus.publish_link(LinkEvent::TransportError {
                    context: format!("send to {}", dest),
                    message: e.to_string(),
                });
                Err(LinkError::send_failed(dest, e))
            }
        }
    }

    /// Record "now" as the last heartbeat seen.
    pub fn update_heartbeat(&self) {
        self.shared.heartbeat.record();
    }

    pub fn state(&self) -> LinkState {
        self.shared.state()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == LinkState::Connected
    }

    /// Settings of the current connection.
    pub fn config(&self) -> Option<ConnectionConfig> {
        self.current_session().map(|s| s.config.clone())
    }

    /// Bound local address, useful when the configured port was 0.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.current_session().map(|s| s.local_addr)
    }

    /// Peer learned from inbound traffic, if any.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.current_session().and_then(|s| s.peer.as_ref().and_then(|p| *p.borrow()))
    }

    pub fn status(&self) -> ConnectionStatus {
        self.shared.status()
    }

    pub fn timing(&self) -> &LinkTiming {
        &self.timing
    }

    pub fn subscribe_state(&self) -> watch::Receiver<LinkState> {
        self.shared.state.subscribe()
    }

    pub fn subscribe_telemetry(&self) -> watch::Receiver<Option<Arc<TelemetrySnapshot>>> {
        self.shared.bus.subscribe_telemetry()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<LinkEvent> {
        self.shared.bus.subscribe_link()
    }

    pub fn subscribe_mission(&self) -> broadcast::Receiver<MissionEvent> {
        self.shared.bus.subscribe_mission()
    }

    /// Latest telemetry published by the parser.
    pub fn latest_telemetry(&self) -> Option<Arc<TelemetrySnapshot>> {
        self.shared.bus.latest_telemetry()
    }

    /// Telemetry snapshots as a stream, optionally rate limited.
    ///
    /// Yields the current snapshot first when one exists, then every later
    /// one (or the latest per interval when throttled).
    pub fn telemetry(&self, rate: UpdateRate) -> impl Stream<Item = Arc<TelemetrySnapshot>> + 'static {
        let snapshots =
            WatchStream::new(self.shared.bus.subscribe_telemetry()).filter_map(|opt| async move { opt });

        let interval_ms = self.parser_options.emit_interval_ms.max(1);
        let source_hz = 1000.0 / interval_ms as f64;
        match rate.throttle_interval(source_hz) {
            None => snapshots.boxed(),
            Some(interval) => snapshots.throttle(interval).boxed(),
        }
    }

    /// Link events as a stream. Lagged receivers skip what they missed.
    pub fn events(&self) -> impl Stream<Item = LinkEvent> + 'static {
        BroadcastStream::new(self.shared.bus.subscribe_link()).filter_map(|result| async move {
            match result {
                Ok(event) => Some(event),
                Err(e) => {
                    debug!("Event subscriber lagged: {}", e);
                    None
                }
            }
        })
    }

    fn current_session(&self) -> Option<Arc<Session>> {
        self.shared.current_session()
    }

    fn set_state(&self, state: LinkState) {
        self.shared.set_state(state)
    }
}

async fn join_all(tasks: &mut Vec<JoinHandle<()>>) {
    for task in tasks.drain(..) {
        if let Err(e) = task.await {
            warn!("Link task ended abnormally: {}", e);
        }
    }
}

#[async_trait::async_trait]
impl MissionLink for ConnectionManager {
    fn is_connected(&self) -> bool {
        ConnectionManager::is_connected(self)
    }

    fn subscribe_mission(&self) -> broadcast::Receiver<MissionEvent> {
        ConnectionManager::subscribe_mission(self)
    }

    async fn send_message(&self, message: &Message) -> Result<()> {
        ConnectionManager::send_message(self, message).await
    }

    fn claim_upload(&self) -> Option<UploadSlot> {
        UploadSlot::try_claim(&self.upload_in_flight)
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Some(session) = self.shared.session.send_replace(None) {
            debug!("Dropping connection manager");
            session.cancel.cancel();
        }
    }
}
