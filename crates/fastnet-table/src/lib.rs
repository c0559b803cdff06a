//! Declarative Fastnet sentence, channel and address tables.
//!
//! The decoder never hard-codes per-sentence parsing. Everything it needs to
//! know about a command byte, a broadcast channel or a bus address comes from
//! a [`FormatTable`], loaded once from the bundled `data/fastnet.json` (or a
//! caller-supplied file) and shared read-only between decoder instances.
//!
//! Identifiers in the data file are written as `"0xNN"` strings so the table
//! reads like the bus captures it describes.

pub mod config;
pub mod error;
pub mod format;
pub mod table;

#[cfg(feature = "schema")]
pub mod validator;

pub use config::TableConfig;
pub use error::{Result, TableError};
pub use format::{
    DataFormat, FieldSpec, FormatByte, Layout, Scale, SentenceFormat, MAX_FIELD_WIDTH,
};
pub use table::{AddressSpec, ChannelSpec, FormatTable, BUNDLED_TABLE, MAX_PAYLOAD_LEN};

#[cfg(feature = "schema")]
pub use validator::{validate_table, TABLE_SCHEMA};
