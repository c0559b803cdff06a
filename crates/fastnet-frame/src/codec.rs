use std::ops::Range;

use serde::Serialize;

use crate::checksum;

/// Frame header: to (1) + from (1) + body size (1) + command (1) + header checksum (1).
pub const HEADER_SIZE: usize = 5;

/// Trailing body checksum.
pub const CHECKSUM_SIZE: usize = 1;

/// Largest body a header can declare.
pub const MAX_BODY_SIZE: usize = u8::MAX as usize;

/// Largest frame on the wire.
pub const MAX_FRAME_SIZE: usize = HEADER_SIZE + MAX_BODY_SIZE + CHECKSUM_SIZE;

/// Default bound on raw bytes carried by a decode error.
pub const DEFAULT_MAX_DIAGNOSTIC_BYTES: usize = 64;

const TO_OFFSET: usize = 0;
const FROM_OFFSET: usize = 1;
const BODY_SIZE_OFFSET: usize = 2;
const COMMAND_OFFSET: usize = 3;

/// A frame header whose checksum has been verified.
///
/// Wire format:
/// ```text
/// ┌────┬──────┬───────────┬─────────┬────────────┬───────────────┬──────────┐
/// │ To │ From │ Body size │ Command │ Header sum │ Body          │ Body sum │
/// │ 1B │ 1B   │ 1B        │ 1B      │ 1B         │ (size bytes)  │ 1B       │
/// └────┴──────┴───────────┴─────────┴────────────┴───────────────┴──────────┘
/// ```
///
/// Fastnet has no start-of-frame byte. Five consecutive bytes that sum to
/// zero modulo 256 are the only hint that a frame begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Header {
    pub to: u8,
    pub from: u8,
    pub body_size: u8,
    pub command: u8,
}

impl Header {
    /// Parse the header at the start of `src`.
    ///
    /// Returns `None` if fewer than [`HEADER_SIZE`] bytes are available or the
    /// header checksum does not hold.
    pub fn parse(src: &[u8]) -> Option<Self> {
        let bytes = src.get(..HEADER_SIZE)?;
        if !checksum::validate(bytes) {
            return None;
        }

        Some(Self {
            to: bytes[TO_OFFSET],
            from: bytes[FROM_OFFSET],
            body_size: bytes[BODY_SIZE_OFFSET],
            command: bytes[COMMAND_OFFSET],
        })
    }

    /// Declared body length in bytes.
    pub fn body_len(&self) -> usize {
        usize::from(self.body_size)
    }

    /// Total frame length on the wire (header + body + body checksum).
    pub fn frame_len(&self) -> usize {
        HEADER_SIZE + self.body_len() + CHECKSUM_SIZE
    }

    /// Position of the body inside the frame.
    pub fn body_range(&self) -> Range<usize> {
        HEADER_SIZE..HEADER_SIZE + self.body_len()
    }

    /// Position of the body and its checksum inside the frame.
    pub fn checked_body_range(&self) -> Range<usize> {
        HEADER_SIZE..self.frame_len()
    }
}

/// Configuration for the stream decoder.
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Maximum raw bytes copied into a decode error. Default: 64.
    pub max_diagnostic_bytes: usize,
    /// Initial capacity of the byte stream buffer.
    pub initial_capacity: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_diagnostic_bytes: DEFAULT_MAX_DIAGNOSTIC_BYTES,
            initial_capacity: 4 * MAX_FRAME_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_header() {
        let header = Header::parse(&[0xFF, 0x05, 0x04, 0x01, 0xF7, 0x41]).unwrap();
        assert_eq!(header.to, 0xFF);
        assert_eq!(header.from, 0x05);
        assert_eq!(header.body_len(), 4);
        assert_eq!(header.command, 0x01);
        assert_eq!(header.frame_len(), 10);
        assert_eq!(header.body_range(), 5..9);
        assert_eq!(header.checked_body_range(), 5..10);
    }

    #[test]
    fn parse_rejects_bad_checksum() {
        assert!(Header::parse(&[0xFF, 0x05, 0x04, 0x01, 0xF6]).is_none());
    }

    #[test]
    fn parse_needs_full_header() {
        assert!(Header::parse(&[0xFF, 0x05, 0x04, 0x01]).is_none());
        assert!(Header::parse(&[]).is_none());
    }

    #[test]
    fn empty_body_frame_len() {
        let header = Header::parse(&[0x01, 0x05, 0x00, 0x0C, 0xEE]).unwrap();
        assert_eq!(header.frame_len(), HEADER_SIZE + CHECKSUM_SIZE);
        assert!(header.body_range().is_empty());
    }

    #[test]
    fn max_frame_size() {
        assert_eq!(MAX_FRAME_SIZE, 261);
    }
}
