//! One mission upload attempt
//!
//! [`UploadAttempt`] is the synchronous protocol state machine; it turns inbound
//! requests and acknowledgements into outbound messages and a single result.
//! [`MissionUploader`] drives one attempt over a [`MissionLink`] with the
//! settle delay, the overall deadline and cancellation.

use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::items::{mission_clear_all, mission_count, mission_item_int};
use super::{MAX_MISSION_ITEMS, MissionLink, UploadError, UploadResult};
use crate::command::Target;
use crate::connection::LinkTiming;
use crate::protocol::Message;
use crate::protocol::messages::mav_mission_result;
use crate::types::{ItemParams, MissionEvent, MissionWaypoint};

/// Where an attempt stands in the upload handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPhase {
    Idle,
    /// MISSION_CLEAR_ALL sent, count not yet announced
    ClearingAnnounced,
    /// MISSION_COUNT sent, no item requested yet
    CountingAnnounced,
    /// Serving item requests
    ItemExchange,
    Done,
}

/// Protocol state of a single upload attempt.
#[derive(Debug)]
pub struct UploadAttempt {
    items: Vec<ItemParams>,
    /// `items.len()` as announced on the wire
    count: u16,
    target: Target,
    phase: UploadPhase,
}

impl UploadAttempt {
    /// Fails with [`UploadError::TooManyItems`] when the item count does not
    /// fit in MISSION_COUNT.
    pub fn new(items: Vec<ItemParams>, target: Target) -> Result<Self, UploadError> {
        let count = u16::try_from(items.len()).map_err(|_| UploadError::TooManyItems(items.len()))?;
        Ok(Self { items, count, target, phase: UploadPhase::Idle })
    }

    pub fn phase(&self) -> UploadPhase {
        self.phase
    }

    pub fn is_done(&self) -> bool {
        self.phase == UploadPhase::Done
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Begin the attempt: clear whatever mission the vehicle holds.
    pub fn start(&mut self) -> Option<Message> {
        if self.phase != UploadPhase::Idle {
            return None;
        }
        self.phase = UploadPhase::ClearingAnnounced;
        Some(mission_clear_all(self.target))
    }

    /// Announce the item count, unless the attempt already finished.
    pub fn announce_count(&mut self) -> Option<Message> {
        if self.phase != UploadPhase::ClearingAnnounced {
            return None;
        }
        self.phase = UploadPhase::CountingAnnounced;
        Some(mission_count(self.count, self.target))
    }

    /// Serve an item request. Repeats and out-of-order requests are answered
    /// the same way; out-of-range indices are ignored.
    ///
    /// A request that arrives before the count went out is answered but leaves
    /// the attempt waiting to announce the count.
    pub fn on_request(&mut self, seq: u16) -> Option<Message> {
        match self.phase {
            UploadPhase::Idle | UploadPhase::Done => return None,
            UploadPhase::ClearingAnnounced => debug!(seq, "Item requested before the count was announced"),
            UploadPhase::CountingAnnounced | UploadPhase::ItemExchange => {}
        }
        let Some(item) = self.items.get(usize::from(seq)) else {
            warn!(seq, count = self.count, "Vehicle requested an item out of range");
            return None;
        };
        if self.phase == UploadPhase::CountingAnnounced {
            self.phase = UploadPhase::ItemExchange;
        }
        Some(mission_item_int(item, seq, self.target))
    }

    /// Handle MISSION_ACK.
    pub fn on_ack(&mut self, result: u8) -> Option<UploadResult> {
        match self.phase {
            UploadPhase::Done => None,
            // Acknowledgement of MISSION_CLEAR_ALL, not of the upload
            UploadPhase::ClearingAnnounced if result == mav_mission_result::ACCEPTED => {
                debug!("Existing mission cleared");
                None
            }
            _ if result == mav_mission_result::ACCEPTED => {
                let count = self.items.len();
                self.finish(UploadResult::succeeded(count))
            }
            _ => self.finish(UploadResult::failed(UploadError::Rejected(result))),
        }
    }

    pub fn on_timeout(&mut self) -> Option<UploadResult> {
        self.finish(UploadResult::failed(UploadError::Timeout))
    }

    pub fn on_cancel(&mut self) -> Option<UploadResult> {
        self.finish(UploadResult::failed(UploadError::Cancelled))
    }

    pub fn on_link_closed(&mut self) -> Option<UploadResult> {
        self.finish(UploadResult::failed(UploadError::LinkClosed))
    }

    /// Single-shot completion: only the first caller gets a result.
    fn finish(&mut self, result: UploadResult) -> Option<UploadResult> {
        if self.is_done() {
            return None;
        }
        self.phase = UploadPhase::Done;
        Some(result)
    }
}

/// Drives exactly one upload attempt and is consumed by it.
pub struct MissionUploader {
    link: Arc<dyn MissionLink>,
    timing: LinkTiming,
    cancel: CancellationToken,
}

impl MissionUploader {
    pub fn new(link: Arc<dyn MissionLink>, timing: LinkTiming) -> Self {
        Self { link, timing, cancel: CancellationToken::new() }
    }

    /// Token that aborts the attempt with [`UploadError::Cancelled`].
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Upload a mission and wait for the outcome.
    pub async fn upload(
        self,
        waypoints: &[MissionWaypoint],
        target_system: u8,
        target_component: u8,
    ) -> UploadResult {
        if waypoints.is_empty() {
            return UploadResult::failed(UploadError::EmptyMission);
        }
        if waypoints.len() > MAX_MISSION_ITEMS {
            return UploadResult::failed(UploadError::TooManyItems(waypoints.len()));
        }
        if !self.link.is_connected() {
            return UploadResult::failed(UploadError::NotConnected);
        }
        let Some(_slot) = self.link.claim_upload() else {
            warn!("Mission upload already in progress");
            return UploadResult::failed(UploadError::Busy);
        };

        let items: Vec<ItemParams> = waypoints.iter().map(ItemParams::from_waypoint).collect();
        let target = Target::new(target_system, target_component);
        let mut attempt = match UploadAttempt::new(items, target) {
            Ok(attempt) => attempt,
            Err(error) => return UploadResult::failed(error),
        };
        info!(count = attempt.len(), target_system, "Starting mission upload");

        // Subscribe before the first frame goes out so no reply is missed
        let mut events = self.link.subscribe_mission();

        let deadline = tokio::time::sleep(self.timing.upload_timeout());
        tokio::pin!(deadline);
        let settle = tokio::time::sleep(self.timing.count_settle());
        tokio::pin!(settle);
        let mut settled = false;

        if let Some(clear) = attempt.start() {
            self.transmit(clear).await;
        }

        let result = loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    if let Some(result) = attempt.on_cancel() {
                        break result;
                    }
                }
                _ = &mut deadline => {
                    if let Some(result) = attempt.on_timeout() {
                        break result;
                    }
                }
                _ = &mut settle, if !settled => {
                    settled = true;
                    if let Some(count) = attempt.announce_count() {
                        self.transmit(count).await;
                    }
                }
                event = events.recv() => match event {
                    Ok(MissionEvent::ItemRequested { seq, int_form }) => {
                        debug!(seq, int_form, "Mission item requested");
                        if let Some(item) = attempt.on_request(seq) {
                            self.transmit(item).await;
                        }
                    }
                    Ok(MissionEvent::Ack { result }) => {
                        if let Some(result) = attempt.on_ack(result) {
                            break result;
                        }
                    }
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "Mission events lagged, vehicle will re-request");
                    }
                    Err(RecvError::Closed) => {
                        if let Some(result) = attempt.on_link_closed() {
                            break result;
                        }
                    }
                },
            }
        };

        match &result.error {
            None => info!(count = result.count, "Mission upload accepted"),
            Some(error) => warn!(%error, "Mission upload failed"),
        }
        result
    }

    /// Send errors are reported by the link and left to the deadline.
    async fn transmit(&self, message: Message) {
        if let Err(e) = self.link.send_message(&message).await {
            warn!(msg_id = message.id, error = %e, "Failed to send mission message");
        }
    }
}
