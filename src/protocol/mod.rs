//! Wire codec for MAVLink 2 frames.
//!
//! Pure, stateless functions: frame encoding, header views and the
//! CRC-16/MCRF4XX checksum with per-message CRC-Extra seeds. Everything here
//! is deterministic; malformed inputs are caller bugs rather than runtime
//! failures.
//!
//! ```rust
//! use skylink::protocol::{build_frame, RawFrame, crc, messages::id};
//!
//! let frame = build_frame(id::HEARTBEAT, 0, 255, 190, &[0, 0, 0, 0, 6, 8, 0, 4, 3]);
//! let raw = RawFrame::new(&frame).unwrap();
//! assert_eq!(raw.msg_id(), id::HEARTBEAT);
//! assert!(raw.checksum_ok(crc::crc_extra(id::HEARTBEAT).unwrap()));
//! ```

pub mod crc;
mod frame;
pub mod messages;
pub mod payload;

pub use frame::{
    CHECKSUM_LEN, FrameSequencer, HEADER_LEN, INCOMPAT_FLAG_SIGNED, MAGIC_V2, MAX_FRAME_LEN,
    MIN_FRAME_LEN, Message, RawFrame, SIGNATURE_LEN, build_frame, frame_len,
};
pub use payload::{PayloadReader, put_fixed_str};
