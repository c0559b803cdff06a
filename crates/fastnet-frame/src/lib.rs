//! Fastnet frame synchronization and sentence decoding.
//!
//! Fastnet frames carry no start marker. A frame is recognized by its header:
//! - 1 byte destination address
//! - 1 byte source address
//! - 1 byte body size
//! - 1 byte command
//! - 1 byte header checksum (the five bytes sum to zero)
//!
//! followed by the body and a body checksum. [`StreamDecoder`] turns an
//! arbitrarily chunked byte stream into [`DecodedRecord`]s, resynchronizing
//! one byte at a time past anything that fails validation.

pub mod checksum;
pub mod codec;
pub mod decoder;
pub mod error;
pub mod field;
#[cfg(feature = "async")]
pub mod framed;
pub mod reader;
pub mod record;

pub use codec::{
    DecoderConfig, Header, CHECKSUM_SIZE, DEFAULT_MAX_DIAGNOSTIC_BYTES, HEADER_SIZE,
    MAX_BODY_SIZE, MAX_FRAME_SIZE,
};
pub use decoder::{DecoderStats, StreamDecoder, SyncState};
pub use error::{DecodeError, FieldError, ReadError, Result};
#[cfg(feature = "async")]
pub use framed::FastnetCodec;
pub use reader::{FrameReader, ReaderConfig};
pub use record::{DecodedField, DecodedRecord, Outcome, Value};
