use bytes::Bytes;

/// Errors from extracting a single value out of a sentence body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    /// The body is shorter than the field it should contain.
    #[error("field at offset {offset} (width {width}) exceeds body length {len}")]
    OutOfBounds {
        offset: usize,
        width: usize,
        len: usize,
    },

    /// A field width the integer decoder cannot represent.
    #[error("unsupported field width {width}")]
    InvalidWidth { width: usize },

    /// The format byte selects a data format this decoder does not know.
    #[error("unsupported data format 0x{code:02X}")]
    UnsupportedFormat { code: u8 },

    /// A text field holds non-ASCII bytes.
    #[error("text field is not ASCII")]
    InvalidText,
}

/// Why a candidate frame was rejected.
///
/// `bytes` holds the rejected bytes, truncated to the decoder's diagnostic bound.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Valid header, but the command byte is not in the format table.
    #[error("unknown sentence type 0x{command:02X}")]
    UnknownSentenceType { command: u8, bytes: Bytes },

    /// The body checksum does not match the body.
    #[error(
        "checksum mismatch for sentence 0x{command:02X} (expected 0x{expected:02X}, found 0x{actual:02X})"
    )]
    ChecksumMismatch {
        command: u8,
        expected: u8,
        actual: u8,
        bytes: Bytes,
    },

    /// The header declares a body length the sentence format does not allow.
    #[error("sentence 0x{command:02X} declares {declared} body bytes, format requires {expected}")]
    LengthMismatch {
        command: u8,
        declared: usize,
        expected: usize,
        bytes: Bytes,
    },

    /// The frame passed its checksums but a field could not be decoded.
    #[error("failed to decode sentence 0x{command:02X}: {source}")]
    FieldDecode {
        command: u8,
        source: FieldError,
        bytes: Bytes,
    },
}

impl DecodeError {
    /// Command byte of the rejected frame.
    pub fn command(&self) -> u8 {
        match self {
            DecodeError::UnknownSentenceType { command, .. }
            | DecodeError::ChecksumMismatch { command, .. }
            | DecodeError::LengthMismatch { command, .. }
            | DecodeError::FieldDecode { command, .. } => *command,
        }
    }

    /// Raw bytes involved, bounded in size.
    pub fn bytes(&self) -> &Bytes {
        match self {
            DecodeError::UnknownSentenceType { bytes, .. }
            | DecodeError::ChecksumMismatch { bytes, .. }
            | DecodeError::LengthMismatch { bytes, .. }
            | DecodeError::FieldDecode { bytes, .. } => bytes,
        }
    }

    /// Short stable name for counting and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            DecodeError::UnknownSentenceType { .. } => "unknown_sentence_type",
            DecodeError::ChecksumMismatch { .. } => "checksum_mismatch",
            DecodeError::LengthMismatch { .. } => "length_mismatch",
            DecodeError::FieldDecode { .. } => "field_decode",
        }
    }
}

/// Errors from driving a decoder off a byte source.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    /// The byte source reached end of input.
    #[error("stream ended ({pending} undecoded bytes pending)")]
    StreamEnded { pending: usize },

    /// An I/O error occurred while reading.
    #[error("read I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ReadError>;
