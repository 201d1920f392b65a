//! Streaming MAVLink 2 parser.
//!
//! [`StreamParser`] turns an unbounded, arbitrarily chunked byte stream into
//! [`ParsedEvent`]s. Bytes accumulate in a buffer; leading garbage before a
//! magic byte is discarded, incomplete frames are held until more bytes
//! arrive, and complete frames are decoded strictly in arrival order.
//!
//! Telemetry messages are folded into one owned [`TelemetrySnapshot`]; a copy
//! is emitted at most once per `emit_interval`, later updates inside the
//! window are coalesced rather than queued.

use bytes::{Buf, BytesMut};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::protocol::messages::id;
use crate::protocol::{HEADER_LEN, MAGIC_V2, MIN_FRAME_LEN, RawFrame, crc, frame_len};
use crate::types::{
    HomePosition, LinkEvent, MissionEvent, ParsedEvent, TelemetrySnapshot,
};

mod decode;
pub mod modes;

#[cfg(test)]
mod tests;

use decode::{AttitudeMsg, GlobalPositionInt, Heartbeat, ParamValue, SysStatus, VfrHud};

/// Default minimum spacing between telemetry emissions (~30 Hz).
pub const DEFAULT_EMIT_INTERVAL: Duration = Duration::from_millis(33);

/// What to do with frames whose checksum does not match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecksumPolicy {
    /// Drop mismatching frames and resynchronize one byte later. Frames with
    /// an id that has no CRC seed cannot be verified and are rescanned too.
    #[default]
    Verify,
    /// Decode regardless of the checksum and take every declared length at
    /// face value.
    Trust,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserOptions {
    pub checksum_policy: ChecksumPolicy,
    pub emit_interval_ms: u64,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            checksum_policy: ChecksumPolicy::Verify,
            emit_interval_ms: DEFAULT_EMIT_INTERVAL.as_millis() as u64,
        }
    }
}

impl ParserOptions {
    pub fn emit_interval(&self) -> Duration {
        Duration::from_millis(self.emit_interval_ms)
    }

    pub fn with_emit_interval(mut self, interval: Duration) -> Self {
        self.emit_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_checksum_policy(mut self, policy: ChecksumPolicy) -> Self {
        self.checksum_policy = policy;
        self
    }
}

/// Counters describing what the parser has seen so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParserStats {
    /// Frames extracted and decoded
    pub frames: u64,
    /// Frames dropped for a checksum mismatch
    pub crc_errors: u64,
    /// Garbage bytes skipped while searching for a magic byte
    pub discarded_bytes: u64,
    /// Frames with a message id this parser does not decode
    pub unknown: u64,
}

/// Parameter download progress for the current announced total.
#[derive(Debug, Default)]
struct ParamProgress {
    total: u16,
    seen: HashSet<u16>,
}

impl ParamProgress {
    fn record(&mut self, index: u16, total: u16) -> usize {
        if total != self.total {
            self.total = total;
            self.seen.clear();
        }
        self.seen.insert(index);
        self.seen.len()
    }
}

#[derive(Debug)]
pub struct StreamParser {
    options: ParserOptions,
    buffer: BytesMut,
    snapshot: TelemetrySnapshot,
    home_established: bool,
    last_emit: Option<Instant>,
    params: ParamProgress,
    stats: ParserStats,
}

impl Default for StreamParser {
    fn default() -> Self {
        Self::new(ParserOptions::default())
    }
}

impl StreamParser {
    pub fn new(options: ParserOptions) -> Self {
        Self {
            options,
            buffer: BytesMut::with_capacity(4096),
            snapshot: TelemetrySnapshot::default(),
            home_established: false,
            last_emit: None,
            params: ParamProgress::default(),
            stats: ParserStats::default(),
        }
    }

    /// Append a chunk and decode every complete frame now buffered.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<ParsedEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();

        loop {
            match self.buffer.iter().position(|&b| b == MAGIC_V2) {
                Some(0) => {}
                Some(pos) => {
                    self.stats.discarded_bytes += pos as u64;
                    self.buffer.advance(pos);
                }
                None => {
                    self.stats.discarded_bytes += self.buffer.len() as u64;
                    self.buffer.clear();
                    break;
                }
            }

            if self.buffer.len() < MIN_FRAME_LEN {
                break;
            }
            let Some(len) = frame_len(&self.buffer[..HEADER_LEN]) else {
                break;
            };
            if self.buffer.len() < len {
                break;
            }

            let frame = self.buffer.split_to(len).freeze();
            if let Some(raw) = RawFrame::new(&frame) {
                if !self.handle_frame(raw, &mut events) {
                    // Unverified: the magic may have been a stray payload
                    // byte, rescan everything after it.
                    let mut rest = BytesMut::with_capacity(len - 1 + self.buffer.len());
                    rest.extend_from_slice(&frame[1..]);
                    rest.extend_from_slice(&self.buffer);
                    self.buffer = rest;
                }
            }
        }

        events
    }

    /// Latest aggregated telemetry, regardless of emission throttling.
    pub fn snapshot(&self) -> Arc<TelemetrySnapshot> {
        Arc::new(self.snapshot.clone())
    }

    pub fn stats(&self) -> ParserStats {
        self.stats
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Bytes currently held while waiting for the rest of a frame.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Decode one frame. Returns `false` when it could not be verified and
    /// its bytes should be rescanned.
    fn handle_frame(&mut self, raw: RawFrame<'_>, events: &mut Vec<ParsedEvent>) -> bool {
        let msg_id = raw.msg_id();
        let Some(seed) = crc::crc_extra(msg_id) else {
            self.stats.unknown += 1;
            return match self.options.checksum_policy {
                ChecksumPolicy::Trust => {
                    trace!(msg_id, "Skipping unknown message");
                    true
                }
                ChecksumPolicy::Verify => {
                    trace!(msg_id, "Unknown message id, rescanning");
                    false
                }
            };
        };

        if self.options.checksum_policy == ChecksumPolicy::Verify && !raw.checksum_ok(seed) {
            debug!(msg_id, seq = raw.seq(), "Checksum mismatch, dropping frame");
            self.stats.crc_errors += 1;
            return false;
        }

        self.stats.frames += 1;
        let payload = raw.payload();
        let telemetry_changed = match msg_id {
            id::HEARTBEAT => {
                Heartbeat::decode(payload).apply(&mut self.snapshot);
                events.push(ParsedEvent::Link(LinkEvent::Heartbeat {
                    system_id: raw.system_id(),
                    component_id: raw.component_id(),
                }));
                true
            }
            id::SYS_STATUS => {
                SysStatus::decode(payload).apply(&mut self.snapshot);
                true
            }
            id::ATTITUDE => {
                AttitudeMsg::decode(payload).apply(&mut self.snapshot);
                true
            }
            id::GLOBAL_POSITION_INT => {
                let position = GlobalPositionInt::decode(payload);
                position.apply(&mut self.snapshot);
                if !self.home_established && position.has_fix() {
                    self.home_established = true;
                    let home = HomePosition {
                        latitude: position.latitude(),
                        longitude: position.longitude(),
                        altitude: position.altitude(),
                    };
                    debug!(lat = home.latitude, lon = home.longitude, "Home position established");
                    events.push(ParsedEvent::Link(LinkEvent::HomePosition(home)));
                }
                true
            }
            id::VFR_HUD => {
                VfrHud::decode(payload).apply(&mut self.snapshot);
                true
            }
            id::PARAM_VALUE => {
                let ParamValue { entry, count } = ParamValue::decode(payload);
                let index = entry.index;
                events.push(ParsedEvent::Link(LinkEvent::ParamValue(entry)));
                if count > 0 {
                    let received = self.params.record(index, count);
                    events.push(ParsedEvent::Link(LinkEvent::ParamProgress {
                        received,
                        total: count,
                    }));
                }
                false
            }
            id::COMMAND_ACK => {
                let (command, outcome) = decode::command_ack(payload);
                events.push(ParsedEvent::Link(LinkEvent::CommandAck { command, outcome }));
                false
            }
            id::MISSION_REQUEST | id::MISSION_REQUEST_INT => {
                let seq = decode::mission_request_seq(payload);
                let int_form = msg_id == id::MISSION_REQUEST_INT;
                events.push(ParsedEvent::Mission(MissionEvent::ItemRequested { seq, int_form }));
                false
            }
            id::MISSION_ACK => {
                let result = decode::mission_ack_result(payload);
                events.push(ParsedEvent::Mission(MissionEvent::Ack { result }));
                false
            }
            id::STATUSTEXT => {
                let (severity, text) = decode::status_text(payload);
                events.push(ParsedEvent::Link(LinkEvent::LogMessage { severity, text }));
                false
            }
            // Messages we only ever send
            _ => {
                self.stats.unknown += 1;
                false
            }
        };

        if telemetry_changed {
            self.snapshot.touch();
            self.maybe_emit(events);
        }
        true
    }

    fn maybe_emit(&mut self, events: &mut Vec<ParsedEvent>) {
        let now = Instant::now();
        let due = match self.last_emit {
            None => true,
            Some(last) => now.duration_since(last) >= self.options.emit_interval(),
        };
        if due {
            self.last_emit = Some(now);
            events.push(ParsedEvent::Telemetry(self.snapshot()));
        }
    }
}
