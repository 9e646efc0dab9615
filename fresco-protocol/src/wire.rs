//! Framed wire codec.
//!
//! Every message shares a fixed four byte header followed by a type
//! specific payload, all integers big-endian:
//!
//! ```text
//! ┌─────────────┬───────────┬─────────────┬──────────────┐
//! │ payload len │ type code │ origin user │ payload      │
//! │ u16         │ u8        │ u8          │ 0..=65535 B  │
//! └─────────────┴───────────┴─────────────┴──────────────┘
//! ```
//!
//! The length field counts the payload only, so the total frame length is
//! known from the first two bytes alone. That is what lets a receiver
//! buffer exactly one message before attempting a full decode.

use thiserror::Error;

use crate::types::{LayerId, MessageType, UserId};

/// Length of the fixed message header.
pub const HEADER_LEN: usize = 4;

/// Largest payload the length field can announce.
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize;

/// Largest possible frame, header included.
pub const MAX_MESSAGE_LEN: usize = HEADER_LEN + MAX_PAYLOAD_LEN;

/// Encode/decode failures.
///
/// Malformed input is an expected case at a network boundary, never a
/// panic. A decode error means "drop this frame"; whether to also drop
/// the connection is the caller's call.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("buffer too short for a message header")]
    TruncatedHeader,
    #[error("announced message length {announced} exceeds limit {limit}")]
    TooLong { announced: usize, limit: usize },
    #[error("unknown message type code {0}")]
    UnknownType(u8),
    #[error("payload length {0} out of range for the message type")]
    BadLength(usize),
    #[error("payload ends before the field does")]
    Truncated,
    #[error("invalid {0}")]
    InvalidField(&'static str),
    #[error("string field is not valid UTF-8")]
    BadString(#[from] std::str::Utf8Error),
    #[error("malformed server envelope: {0}")]
    BadEnvelope(#[from] serde_json::Error),
    #[error("payload of {0} bytes does not fit a frame")]
    PayloadTooLarge(usize),
}

/// Read the total frame length from a two byte prefix.
///
/// Returns `None` while fewer than two bytes are buffered.
pub fn sniff_length(buf: &[u8]) -> Option<usize> {
    if buf.len() < 2 {
        return None;
    }
    Some(HEADER_LEN + u16::from_be_bytes([buf[0], buf[1]]) as usize)
}

/// Bounds-checked big-endian reader over a payload slice.
///
/// Decoders call [`validate`](Self::validate) first to pin the payload
/// length to the range their layout allows, then read fields in wire
/// order.
pub struct PayloadReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> PayloadReader<'a> {
    pub fn new(buf: &'a [u8]) -> PayloadReader<'a> {
        PayloadReader { buf, pos: 0 }
    }

    /// Check the whole payload length against `min..=max`.
    pub fn validate(&self, min: usize, max: usize) -> Result<(), ProtocolError> {
        if self.buf.len() < min || self.buf.len() > max {
            return Err(ProtocolError::BadLength(self.buf.len()));
        }
        Ok(())
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ProtocolError> {
        if self.remaining() < n {
            return Err(ProtocolError::Truncated);
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, ProtocolError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, ProtocolError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32, ProtocolError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_i32(&mut self) -> Result<i32, ProtocolError> {
        let b = self.take(4)?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_layer_id(&mut self) -> Result<LayerId, ProtocolError> {
        Ok(LayerId::from_raw(self.read_u16()?))
    }

    /// Consume everything left.
    pub fn read_remaining(&mut self) -> &'a [u8] {
        let slice = &self.buf[self.pos..];
        self.pos = self.buf.len();
        slice
    }

    /// Consume everything left as UTF-8 text.
    pub fn read_remaining_str(&mut self) -> Result<&'a str, ProtocolError> {
        Ok(std::str::from_utf8(self.read_remaining())?)
    }
}

/// Header-prefixed big-endian writer.
///
/// Created with the final payload length so the buffer is allocated once;
/// [`finish`](Self::finish) returns the complete frame.
pub struct PayloadWriter {
    buf: Vec<u8>,
    expected: usize,
}

impl PayloadWriter {
    /// Start a frame. `payload_len` must not exceed [`MAX_PAYLOAD_LEN`].
    pub fn new(msg_type: MessageType, origin: UserId, payload_len: usize) -> PayloadWriter {
        debug_assert!(payload_len <= MAX_PAYLOAD_LEN);
        let mut buf = Vec::with_capacity(HEADER_LEN + payload_len);
        buf.extend_from_slice(&(payload_len as u16).to_be_bytes());
        buf.push(msg_type.code());
        buf.push(origin);
        PayloadWriter {
            buf,
            expected: HEADER_LEN + payload_len,
        }
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_layer_id(&mut self, id: LayerId) {
        self.write_u16(id.raw());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_str(&mut self, s: &str) {
        self.write_bytes(s.as_bytes());
    }

    /// Finish the frame. The written payload must match the length the
    /// writer was created with.
    pub fn finish(self) -> Vec<u8> {
        debug_assert_eq!(self.buf.len(), self.expected);
        self.buf
    }
}

// ===================================================================
// Tests
// ===================================================================
