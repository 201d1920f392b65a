//! Fixed-offset payload access
//!
//! MAVLink 2 senders strip trailing zero bytes from payloads. Readers must
//! treat the missing tail as zeros, so [`PayloadReader`] zero-extends the
//! received bytes to the full definition length before any field is read.

use bytes::BufMut;
use std::borrow::Cow;

/// Little-endian reader over a (possibly truncated) payload.
#[derive(Debug, Clone)]
pub struct PayloadReader<'a> {
    data: Cow<'a, [u8]>,
}

impl<'a> PayloadReader<'a> {
    /// Wrap a payload, zero-extending it to `full_len` when truncated.
    pub fn new(payload: &'a [u8], full_len: usize) -> Self {
        if payload.len() >= full_len {
            Self { data: Cow::Borrowed(payload) }
        } else {
            let mut owned = payload.to_vec();
            owned.resize(full_len, 0);
            Self { data: Cow::Owned(owned) }
        }
    }

    fn array<const N: usize>(&self, offset: usize) -> [u8; N] {
        let mut out = [0u8; N];
        if let Some(bytes) = self.data.get(offset..offset + N) {
            out.copy_from_slice(bytes);
        }
        out
    }

    pub fn u8(&self, offset: usize) -> u8 {
        self.data.get(offset).copied().unwrap_or(0)
    }

    pub fn i8(&self, offset: usize) -> i8 {
        self.u8(offset) as i8
    }

    pub fn u16(&self, offset: usize) -> u16 {
        u16::from_le_bytes(self.array(offset))
    }

    pub fn i16(&self, offset: usize) -> i16 {
        i16::from_le_bytes(self.array(offset))
    }

    pub fn u32(&self, offset: usize) -> u32 {
        u32::from_le_bytes(self.array(offset))
    }

    pub fn i32(&self, offset: usize) -> i32 {
        i32::from_le_bytes(self.array(offset))
    }

    pub fn f32(&self, offset: usize) -> f32 {
        f32::from_le_bytes(self.array(offset))
    }

    /// Read a fixed-width, NUL-padded ASCII field.
    pub fn fixed_str(&self, offset: usize, width: usize) -> String {
        let end = (offset + width).min(self.data.len());
        let bytes = self.data.get(offset..end).unwrap_or(&[]);
        let nul = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        String::from_utf8_lossy(&bytes[..nul]).into_owned()
    }
}

/// Write `text` as a fixed-width, NUL-padded field, truncating when longer.
pub fn put_fixed_str<B: BufMut>(buf: &mut B, text: &str, width: usize) {
    let bytes = text.as_bytes();
    let take = bytes.len().min(width);
    buf.put_slice(&bytes[..take]);
    buf.put_bytes(0, width - take);
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn truncated_payload_reads_zeros() {
        let reader = PayloadReader::new(&[0x01, 0x02], 8);
        assert_eq!(reader.u16(0), 0x0201);
        assert_eq!(reader.u32(4), 0);
    }

    #[test]
    fn signed_fields() {
        let reader = PayloadReader::new(&[0xFF, 0xFF, 0xFE], 3);
        assert_eq!(reader.i16(0), -1);
        assert_eq!(reader.i8(2), -2);
    }

    #[test]
    fn fixed_str_stops_at_nul() {
        let mut buf = BytesMut::new();
        put_fixed_str(&mut buf, "SYSID_THISMAV", 16);
        assert_eq!(buf.len(), 16);
        let reader = PayloadReader::new(&buf, 16);
        assert_eq!(reader.fixed_str(0, 16), "SYSID_THISMAV");
    }

    #[test]
    fn fixed_str_truncates_long_names() {
        let mut buf = BytesMut::new();
        put_fixed_str(&mut buf, "A_VERY_LONG_PARAMETER_NAME", 16);
        assert_eq!(&buf[..], b"A_VERY_LONG_PARA");
        let reader = PayloadReader::new(&buf, 16);
        assert_eq!(reader.fixed_str(0, 16), "A_VERY_LONG_PARA");
    }
}
