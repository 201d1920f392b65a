//! Mission upload protocol.
//!
//! A mission upload is a multi-round negotiation driven by the vehicle:
//!
//! ```text
//! GCS                                  Vehicle
//!  |-- MISSION_CLEAR_ALL ---------------->|
//!  |          (settle delay)              |
//!  |-- MISSION_COUNT(n) ----------------->|
//!  |<-------------- MISSION_REQUEST_INT(i)|   any order, repeats allowed
//!  |-- MISSION_ITEM_INT(i) -------------->|
//!  |               ...                    |
//!  |<------------------------ MISSION_ACK |
//! ```
//!
//! Each [`MissionUploader`] services exactly one attempt and resolves to an
//! [`UploadResult`]; failures never escape as errors. Only one attempt may be
//! in flight per link, enforced through [`UploadSlot`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::sync::broadcast;

use crate::Result;
use crate::protocol::Message;
use crate::types::MissionEvent;

mod items;
mod uploader;


pub use items::{DEFAULT_ACCEPTANCE_RADIUS, mission_clear_all, mission_count, mission_item_int};
pub use uploader::{MissionUploader, UploadAttempt, UploadPhase};

/// Largest mission a single MISSION_COUNT can announce.
pub const MAX_MISSION_ITEMS: usize = u16::MAX as usize;

/// Why an upload attempt failed.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadError {
    #[error("Mission has no waypoints")]
    EmptyMission,
    #[error("Mission has {0} items, MISSION_COUNT carries at most 65535")]
    TooManyItems(usize),
    #[error("Link is not connected")]
    NotConnected,
    #[error("Another mission upload is in progress")]
    Busy,
    #[error("Vehicle did not acknowledge the mission in time")]
    Timeout,
    #[error("Vehicle rejected the mission (MAV_MISSION_RESULT {0})")]
    Rejected(u8),
    #[error("Upload cancelled")]
    Cancelled,
    #[error("Link closed during upload")]
    LinkClosed,
}

/// Outcome of one upload attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadResult {
    pub success: bool,
    /// Items accepted by the vehicle, 0 on failure
    pub count: usize,
    pub error: Option<UploadError>,
}

impl UploadResult {
    pub fn succeeded(count: usize) -> Self {
        Self { success: true, count, error: None }
    }

    pub fn failed(error: UploadError) -> Self {
        Self { success: false, count: 0, error: Some(error) }
    }
}

/// Exclusive right to run an upload on a link, released on drop.
#[derive(Debug)]
pub struct UploadSlot {
    in_flight: Arc<AtomicBool>,
}

impl UploadSlot {
    /// Claim the slot guarded by `in_flight`, or `None` when already taken.
    pub fn try_claim(in_flight: &Arc<AtomicBool>) -> Option<Self> {
        in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { in_flight: Arc::clone(in_flight) })
    }
}

impl Drop for UploadSlot {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::Release);
    }
}

/// What the uploader needs from a link.
#[async_trait::async_trait]
pub trait MissionLink: Send + Sync {
    fn is_connected(&self) -> bool;

    /// Mission protocol events decoded from inbound traffic.
    fn subscribe_mission(&self) -> broadcast::Receiver<MissionEvent>;

    /// Frame and transmit one message to the vehicle.
    async fn send_message(&self, message: &Message) -> Result<()>;

    /// Reserve the link for one upload attempt.
    fn claim_upload(&self) -> Option<UploadSlot>;
}
