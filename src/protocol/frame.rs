//! MAVLink 2 frame layout, encoding and header parsing
//!
//! ```text
//! offset  size  field
//! 0       1     magic = 0xFD
//! 1       1     payload length
//! 2       1     incompatibility flags (bit0 = signed)
//! 3       1     compatibility flags
//! 4       1     sequence number
//! 5       1     system id
//! 6       1     component id
//! 7-9     3     message id (little-endian)
//! 10..    N     payload
//! ...     2     checksum (little-endian)
//! [...    13]   signature, when incompatibility bit0 is set
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use std::sync::atomic::{AtomicU8, Ordering};
use tracing::warn;

use super::crc;

/// MAVLink 2 start-of-frame marker.
pub const MAGIC_V2: u8 = 0xFD;
/// Header length including the magic byte.
pub const HEADER_LEN: usize = 10;
/// Trailing checksum length.
pub const CHECKSUM_LEN: usize = 2;
/// Optional signature block length.
pub const SIGNATURE_LEN: usize = 13;
/// Smallest possible frame (empty payload, unsigned).
pub const MIN_FRAME_LEN: usize = HEADER_LEN + CHECKSUM_LEN;
/// Largest possible frame.
pub const MAX_FRAME_LEN: usize = HEADER_LEN + 255 + CHECKSUM_LEN + SIGNATURE_LEN;
/// Incompatibility flag: frame carries a signature.
pub const INCOMPAT_FLAG_SIGNED: u8 = 0x01;

/// Encode a complete MAVLink 2 frame.
///
/// Payloads longer than 255 bytes are a caller bug; the length byte is taken
/// from the low byte of the payload length.
pub fn build_frame(
    msg_id: u32,
    seq: u8,
    system_id: u8,
    component_id: u8,
    payload: &[u8],
) -> Bytes {
    let mut buf = BytesMut::with_capacity(HEADER_LEN + payload.len() + CHECKSUM_LEN);
    buf.put_u8(MAGIC_V2);
    buf.put_u8(payload.len() as u8);
    buf.put_u8(0); // incompat flags: unsigned
    buf.put_u8(0); // compat flags
    buf.put_u8(seq);
    buf.put_u8(system_id);
    buf.put_u8(component_id);
    buf.put_slice(&msg_id.to_le_bytes()[..3]);
    buf.put_slice(payload);

    let seed = crc::crc_extra(msg_id).unwrap_or_else(|| {
        warn!(msg_id, "No CRC-Extra seed for message id, using 0");
        0
    });
    let checksum = crc::frame_checksum(&buf[1..], seed);
    buf.put_u16_le(checksum);

    buf.freeze()
}

/// Total frame length implied by a buffered header, if the header is complete.
pub fn frame_len(header: &[u8]) -> Option<usize> {
    if header.len() < HEADER_LEN || header[0] != MAGIC_V2 {
        return None;
    }
    let signature = if header[2] & INCOMPAT_FLAG_SIGNED != 0 { SIGNATURE_LEN } else { 0 };
    Some(MIN_FRAME_LEN + header[1] as usize + signature)
}

/// Borrowed view over one complete frame.
#[derive(Debug, Clone, Copy)]
pub struct RawFrame<'a> {
    bytes: &'a [u8],
}

impl<'a> RawFrame<'a> {
    /// Wrap a complete frame. Returns `None` when the slice is not exactly one frame.
    pub fn new(bytes: &'a [u8]) -> Option<Self> {
        match frame_len(bytes) {
            Some(len) if len == bytes.len() => Some(Self { bytes }),
            _ => None,
        }
    }

    pub fn payload_len(&self) -> usize {
        self.bytes[1] as usize
    }

    pub fn incompat_flags(&self) -> u8 {
        self.bytes[2]
    }

    pub fn is_signed(&self) -> bool {
        self.incompat_flags() & INCOMPAT_FLAG_SIGNED != 0
    }

    pub fn seq(&self) -> u8 {
        self.bytes[4]
    }

    pub fn system_id(&self) -> u8 {
        self.bytes[5]
    }

    pub fn component_id(&self) -> u8 {
        self.bytes[6]
    }

    pub fn msg_id(&self) -> u32 {
        u32::from_le_bytes([self.bytes[7], self.bytes[8], self.bytes[9], 0])
    }

    pub fn payload(&self) -> &'a [u8] {
        &self.bytes[HEADER_LEN..HEADER_LEN + self.payload_len()]
    }

    /// Checksum as transmitted.
    pub fn checksum(&self) -> u16 {
        let at = HEADER_LEN + self.payload_len();
        u16::from_le_bytes([self.bytes[at], self.bytes[at + 1]])
    }

    /// Whether the transmitted checksum matches the given seed.
    pub fn checksum_ok(&self, seed: u8) -> bool {
        let end = HEADER_LEN + self.payload_len();
        crc::frame_checksum(&self.bytes[1..end], seed) == self.checksum()
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }
}

/// An unframed outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: u32,
    pub payload: Bytes,
}

impl Message {
    pub fn new(id: u32, payload: impl Into<Bytes>) -> Self {
        Self { id, payload: payload.into() }
    }

    /// Frame this message with explicit header values.
    pub fn to_frame(&self, seq: u8, system_id: u8, component_id: u8) -> Bytes {
        build_frame(self.id, seq, system_id, component_id, &self.payload)
    }
}

/// Source identity plus the rolling sequence counter for outbound frames.
#[derive(Debug)]
pub struct FrameSequencer {
    system_id: u8,
    component_id: u8,
    next_seq: AtomicU8,
}

impl FrameSequencer {
    pub fn new(system_id: u8, component_id: u8) -> Self {
        Self { system_id, component_id, next_seq: AtomicU8::new(0) }
    }

    /// Frame a message with the next sequence number (wraps mod 256).
    pub fn frame(&self, message: &Message) -> Bytes {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        message.to_frame(seq, self.system_id, self.component_id)
    }

    pub fn system_id(&self) -> u8 {
        self.system_id
    }

    pub fn component_id(&self) -> u8 {
        self.component_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::messages::id;
    use proptest::prelude::*;

    #[test]
    fn header_layout() {
        let frame = build_frame(id::COMMAND_LONG, 7, 255, 190, &[0xAA; 33]);
        assert_eq!(frame.len(), HEADER_LEN + 33 + CHECKSUM_LEN);
        assert_eq!(frame[0], MAGIC_V2);
        assert_eq!(frame[1], 33);
        assert_eq!(frame[2], 0);
        assert_eq!(frame[3], 0);
        assert_eq!(frame[4], 7);
        assert_eq!(frame[5], 255);
        assert_eq!(frame[6], 190);
        assert_eq!(&frame[7..10], &[76, 0, 0]);
    }

    #[test]
    fn three_byte_message_id() {
        let frame = build_frame(0x0A_0B_0C, 0, 1, 1, &[]);
        assert_eq!(&frame[7..10], &[0x0C, 0x0B, 0x0A]);
        let raw = RawFrame::new(&frame).unwrap();
        assert_eq!(raw.msg_id(), 0x0A_0B_0C);
    }

    #[test]
    fn signed_frames_are_longer() {
        let mut header = [0u8; HEADER_LEN];
        header[0] = MAGIC_V2;
        header[1] = 9;
        assert_eq!(frame_len(&header), Some(21));
        header[2] = INCOMPAT_FLAG_SIGNED;
        assert_eq!(frame_len(&header), Some(34));
    }

    #[test]
    fn sequencer_wraps() {
        let seq = FrameSequencer::new(255, 190);
        let msg = Message::new(id::HEARTBEAT, vec![0u8; 9]);
        let mut last = 0;
        for _ in 0..257 {
            last = seq.frame(&msg)[4];
        }
        assert_eq!(last, 0);
    }

    proptest! {
        #[test]
        fn built_frames_parse_back(
            msg_id in prop::sample::select(crc::CRC_EXTRA.iter().map(|(id, _)| *id).collect::<Vec<_>>()),
            seq in any::<u8>(),
            sys in any::<u8>(),
            comp in any::<u8>(),
            payload in prop::collection::vec(any::<u8>(), 0..=255)
        ) {
            let frame = build_frame(msg_id, seq, sys, comp, &payload);
            let raw = RawFrame::new(&frame).expect("complete frame");
            prop_assert_eq!(raw.msg_id(), msg_id);
            prop_assert_eq!(raw.seq(), seq);
            prop_assert_eq!(raw.system_id(), sys);
            prop_assert_eq!(raw.component_id(), comp);
            prop_assert_eq!(raw.payload(), &payload[..]);
            let seed = crc::crc_extra(msg_id).unwrap();
            prop_assert!(raw.checksum_ok(seed));
        }

        #[test]
        fn corrupted_payload_fails_checksum(
            payload in prop::collection::vec(any::<u8>(), 1..=64),
            flip in any::<prop::sample::Index>(),
            bit in 0u8..8
        ) {
            let mut frame = build_frame(id::ATTITUDE, 0, 1, 1, &payload).to_vec();
            let at = HEADER_LEN + flip.index(payload.len());
            frame[at] ^= 1 << bit;
            let raw = RawFrame::new(&frame).unwrap();
            prop_assert!(!raw.checksum_ok(39));
        }
    }
}
