//! Driver spawns and manages the inbound processing task

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::connection::HeartbeatClock;
use crate::parser::StreamParser;
use crate::provider::DatagramSource;
use crate::types::{LinkEvent, MissionEvent, ParsedEvent, TelemetrySnapshot};

/// Capacity of the broadcast channels; slow subscribers lag rather than block.
const EVENT_CAPACITY: usize = 256;

/// Consecutive receive errors tolerated before the driver gives up.
const MAX_ERRORS: u32 = 10;

/// Typed fan-out channels, one per event category.
///
/// Cloning shares the same channels. The bus outlives individual connections
/// so subscriptions survive reconnects.
#[derive(Debug, Clone)]
pub struct EventBus {
    telemetry: Arc<watch::Sender<Option<Arc<TelemetrySnapshot>>>>,
    link: broadcast::Sender<LinkEvent>,
    mission: broadcast::Sender<MissionEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (link, _) = broadcast::channel(EVENT_CAPACITY);
        let (mission, _) = broadcast::channel(EVENT_CAPACITY);
        Self { telemetry: Arc::new(watch::Sender::new(None)), link, mission }
    }

    pub fn publish_telemetry(&self, snapshot: Arc<TelemetrySnapshot>) {
        self.telemetry.send_replace(Some(snapshot));
    }

    /// Publish a link event. Having no subscribers is not an error.
    pub fn publish_link(&self, event: LinkEvent) {
        let _ = self.link.send(event);
    }

    pub fn publish_mission(&self, event: MissionEvent) {
        let _ = self.mission.send(event);
    }

    pub fn subscribe_telemetry(&self) -> watch::Receiver<Option<Arc<TelemetrySnapshot>>> {
        self.telemetry.subscribe()
    }

    pub fn subscribe_link(&self) -> broadcast::Receiver<LinkEvent> {
        self.link.subscribe()
    }

    pub fn subscribe_mission(&self) -> broadcast::Receiver<MissionEvent> {
        self.mission.subscribe()
    }

    /// Latest published snapshot, if any.
    pub fn latest_telemetry(&self) -> Option<Arc<TelemetrySnapshot>> {
        self.telemetry.borrow().clone()
    }
}

/// Why a reader task ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverExit {
    /// Cancelled by its owner
    Cancelled,
    /// The source reported end of input
    SourceClosed,
    /// Gave up after too many consecutive receive errors
    Failed,
}

impl DriverExit {
    /// Whether inbound processing stopped without being asked to.
    pub fn is_link_lost(self) -> bool {
        self != DriverExit::Cancelled
    }
}

/// Driver spawns and manages the inbound processing task
///
/// Spawns a reader task that owns the source and the link's one parser. Every
/// datagram is fed to the parser in arrival order and the resulting events are
/// fanned out on the bus. Heartbeats are recorded on the way through.
pub struct Driver;

impl Driver {
    /// Spawn the reader task for a source
    ///
    /// `peer` receives the first sender address whose datagram decoded into at
    /// least one frame, letting the link learn where the vehicle talks from.
    /// The returned handle resolves to the reason the reader stopped.
    pub fn spawn<S>(
        source: S,
        parser: StreamParser,
        bus: EventBus,
        heartbeat: HeartbeatClock,
        peer: Option<Arc<watch::Sender<Option<SocketAddr>>>>,
        cancel: CancellationToken,
    ) -> JoinHandle<DriverExit>
    where
        S: DatagramSource,
    {
        tokio::spawn(Self::reader_task(source, parser, bus, heartbeat, peer, cancel))
    }

    async fn reader_task<S>(
        mut source: S,
        mut parser: StreamParser,
        bus: EventBus,
        heartbeat: HeartbeatClock,
        peer: Option<Arc<watch::Sender<Option<SocketAddr>>>>,
        cancel: CancellationToken,
    ) -> DriverExit
    where
        S: DatagramSource,
    {
        info!(local = ?source.local_addr(), "Link reader task started");
        let mut datagram_count = 0u64;
        let mut error_count = 0u32;

        let exit = loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Link reader cancelled");
                    break DriverExit::Cancelled;
                }
                result = source.next_datagram() => result,
            };

            match result {
                Ok(Some(datagram)) => {
                    datagram_count += 1;
                    error_count = 0;
                    trace!(len = datagram.bytes.len(), from = %datagram.from, "Feeding parser");

                    let events = parser.feed(&datagram.bytes);
                    // Garbage never redirects outbound traffic
                    if let Some(peer) = peer.as_ref().filter(|_| !events.is_empty()) {
                        let learned = peer.send_if_modified(|current| {
                            if current.is_none() {
                                *current = Some(datagram.from);
                                true
                            } else {
                                false
                            }
                        });
                        if learned {
                            info!(peer = %datagram.from, "Learned vehicle address");
                        }
                    }

                    for event in events {
                        Self::dispatch(event, &bus, &heartbeat);
                    }
                }
                Ok(None) => {
                    info!("Datagram source closed after {} datagrams", datagram_count);
                    break DriverExit::SourceClosed;
                }
                Err(e) => {
                    error_count += 1;
                    error!("Receive error ({}/{}): {}", error_count, MAX_ERRORS, e);
                    bus.publish_link(LinkEvent::TransportError {
                        context: "receive".to_string(),
                        message: e.to_string(),
                    });

                    if error_count >= MAX_ERRORS {
                        error!("Too many receive errors, stopping reader");
                        bus.publish_link(LinkEvent::TransportError {
                            context: "receive".to_string(),
                            message: format!("reader stopped after {} consecutive errors", error_count),
                        });
                        break DriverExit::Failed;
                    }

                    // Exponential backoff: 100ms, 200ms, 400ms, ... capped at 1.6s
                    let backoff = Duration::from_millis(50 * (1 << error_count.min(5)));
                    tokio::select! {
                        _ = cancel.cancelled() => break DriverExit::Cancelled,
                        _ = tokio::time::sleep(backoff) => {}
                    }
                }
            }
        };

        let stats = parser.stats();
        info!(
            datagrams = datagram_count,
            frames = stats.frames,
            crc_errors = stats.crc_errors,
            discarded = stats.discarded_bytes,
            ?exit,
            "Link reader task ended"
        );
        if stats.crc_errors > 0 {
            warn!("{} frames were dropped for bad checksums", stats.crc_errors);
        }
        exit
    }

    fn dispatch(event: ParsedEvent, bus: &EventBus, heartbeat: &HeartbeatClock) {
        match event {
            ParsedEvent::Telemetry(snapshot) => bus.publish_telemetry(snapshot),
            ParsedEvent::Link(event) => {
                if matches!(event, LinkEvent::Heartbeat { .. }) {
                    heartbeat.record();
                }
                bus.publish_link(event);
            }
            ParsedEvent::Mission(event) => bus.publish_mission(event),
        }
    }
}
