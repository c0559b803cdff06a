/// Errors that can occur while building a format table.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    /// The table file could not be read.
    #[error("failed to load format table: {0}")]
    LoadFailed(String),

    /// The table is not valid JSON or does not match the expected shape.
    #[error("format table is not valid: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The table declares a version this crate does not understand.
    #[error("unsupported format table version {0}")]
    UnsupportedVersion(u32),

    /// The same identifier appears twice in one section.
    #[error("duplicate {kind} id 0x{id:02X}")]
    Duplicate { kind: &'static str, id: u8 },

    /// A field width outside the supported range.
    #[error("command 0x{command:02X} field {field:?}: width {width} outside 1..={max}")]
    InvalidWidth {
        command: u8,
        field: String,
        width: usize,
        max: usize,
    },

    /// A field reads past the end of its payload.
    #[error(
        "command 0x{command:02X} field {field:?}: bytes {offset}..{end} exceed payload length {payload_len}"
    )]
    FieldOutOfBounds {
        command: u8,
        field: String,
        offset: usize,
        end: usize,
        payload_len: usize,
    },

    /// A fixed payload longer than a body can be.
    #[error("command 0x{command:02X}: payload length {payload_len} exceeds {max}")]
    PayloadTooLarge {
        command: u8,
        payload_len: usize,
        max: usize,
    },

    /// A scale with a zero divisor.
    #[error("command 0x{command:02X} field {field:?}: scale divisor must be non-zero")]
    ZeroDivisor { command: u8, field: String },

    /// A seven-segment glyph that is not exactly one character.
    #[error("glyph for pattern 0x{pattern:02X} must be a single character, got {glyph:?}")]
    InvalidGlyph { pattern: u8, glyph: String },

    /// The table failed JSON Schema validation.
    #[error("format table violates schema: {0}")]
    SchemaViolation(String),
}

pub type Result<T> = std::result::Result<T, TableError>;
