//! Fastnet marine instrument bus decoding.
//!
//! Turns the raw byte stream of a B&G Fastnet bus into validated, decoded
//! sentences. The bus has no frame delimiter, so decoding is a matter of
//! finding headers whose checksum holds and resynchronizing past everything
//! else.
//!
//! # Crate Structure
//!
//! - [`table`]: sentence, channel and address definitions loaded from data
//! - [`frame`]: frame synchronization, validation and field decoding

/// Re-export table types.
pub mod table {
    pub use fastnet_table::*;
}

/// Re-export frame types.
pub mod frame {
    pub use fastnet_frame::*;
}

pub use fastnet_frame::{DecodeError, DecodedRecord, Outcome, StreamDecoder};
pub use fastnet_table::FormatTable;
