//! Heartbeat bookkeeping and the liveness watchdog

use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::driver::EventBus;
use crate::types::LinkEvent;

/// When the last heartbeat was seen, on both clocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatRecord {
    /// Monotonic, for elapsed-time checks
    pub at: Instant,
    /// Wall clock, for status reporting
    pub wall: SystemTime,
}

/// Shared "last heartbeat seen" cell.
#[derive(Debug, Clone)]
pub struct HeartbeatClock {
    tx: Arc<watch::Sender<Option<HeartbeatRecord>>>,
}

impl Default for HeartbeatClock {
    fn default() -> Self {
        Self { tx: Arc::new(watch::Sender::new(None)) }
    }
}

impl HeartbeatClock {
    /// Record "now" as the last heartbeat.
    pub fn record(&self) {
        self.tx.send_replace(Some(HeartbeatRecord { at: Instant::now(), wall: SystemTime::now() }));
    }

    pub fn clear(&self) {
        self.tx.send_replace(None);
    }

    pub fn last(&self) -> Option<HeartbeatRecord> {
        *self.tx.borrow()
    }
}

/// Periodic liveness check.
///
/// Fires one [`LinkEvent::HeartbeatTimeout`] per outage. The outage ends when a
/// newer heartbeat is recorded, which re-arms the check. Timeouts never tear
/// the link down.
///
/// This is an edge, not a level: a vehicle that stays silent for many check
/// intervals still produces a single event. Callers that need to know whether
/// the link is currently stale should compare
/// [`ConnectionStatus::last_heartbeat`](crate::ConnectionStatus) against their
/// own threshold instead of counting timeout events.
pub struct Watchdog;

impl Watchdog {
    pub fn spawn(
        clock: HeartbeatClock,
        bus: EventBus,
        check_interval: Duration,
        timeout: Duration,
        cancel: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(check_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // Heartbeat instant the last timeout was raised for
            let mut reported: Option<Instant> = None;

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("Heartbeat watchdog stopped");
                        break;
                    }
                    _ = ticker.tick() => {}
                }

                let Some(last) = clock.last() else {
                    continue;
                };
                let elapsed = last.at.elapsed();
                if elapsed > timeout && reported != Some(last.at) {
                    warn!(elapsed_ms = elapsed.as_millis() as u64, "Heartbeat timeout");
                    reported = Some(last.at);
                    bus.publish_link(LinkEvent::HeartbeatTimeout { elapsed });
                }
            }
        })
    }
}
