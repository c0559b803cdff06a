use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Largest field width the generic field decoder accepts, in bytes.
pub const MAX_FIELD_WIDTH: usize = 6;

/// Rational scale applied to a raw integer: `raw * multiplier / divisor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scale {
    #[serde(default = "one_i32")]
    pub multiplier: i32,
    #[serde(default = "one_u32")]
    pub divisor: u32,
}

fn one_i32() -> i32 {
    1
}

fn one_u32() -> u32 {
    1
}

impl Scale {
    /// The identity scale.
    pub const UNIT: Scale = Scale {
        multiplier: 1,
        divisor: 1,
    };

    /// Scale that divides by `divisor`.
    pub const fn divide_by(divisor: u32) -> Self {
        Self {
            multiplier: 1,
            divisor,
        }
    }

    /// Apply the scale to a raw integer.
    ///
    /// The product is formed in `i128` and rounded to `f64` once before the
    /// single division, so no intermediate result is truncated.
    pub fn apply(self, raw: i64) -> f64 {
        let product = i128::from(raw) * i128::from(self.multiplier);
        product as f64 / f64::from(self.divisor)
    }
}

impl Default for Scale {
    fn default() -> Self {
        Self::UNIT
    }
}

/// Layout of one fixed-position field inside a sentence payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: Arc<str>,
    /// Byte offset within the payload (body).
    pub offset: usize,
    /// Width in bytes, big-endian.
    pub width: usize,
    #[serde(default)]
    pub signed: bool,
    #[serde(default)]
    pub scale: Scale,
    #[serde(default = "empty_unit")]
    pub unit: Arc<str>,
}

fn empty_unit() -> Arc<str> {
    Arc::from("")
}

impl FieldSpec {
    /// One past the last payload byte this field reads.
    pub fn end(&self) -> usize {
        self.offset + self.width
    }
}

/// How a sentence body is laid out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Layout {
    /// Fixed payload length with fields at known offsets.
    Fixed {
        payload_len: usize,
        fields: Vec<FieldSpec>,
    },
    /// Sequence of `channel | format byte | data` entries.
    Channels,
    /// One channel id and format byte followed by ASCII text.
    Text,
}

impl Layout {
    /// The payload length this layout requires, when it is fixed.
    pub fn fixed_len(&self) -> Option<usize> {
        match self {
            Layout::Fixed { payload_len, .. } => Some(*payload_len),
            Layout::Channels | Layout::Text => None,
        }
    }
}

/// Immutable descriptor for one sentence type (command byte).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentenceFormat {
    pub command: u8,
    pub name: Arc<str>,
    pub layout: Layout,
}

/// Data encodings selected by the low nibble of a channel format byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DataFormat {
    /// 0x01: signed 16-bit.
    Signed16,
    /// 0x02: 6-bit segment code, 10-bit unsigned value.
    Segment6Unsigned10,
    /// 0x03: 7-bit segment code, 9-bit value; bit 6 of the segment marks a negative value.
    SignedSegment7Unsigned9,
    /// 0x04: 8-bit segment code, 24-bit unsigned value.
    Segment8Unsigned24,
    /// 0x05: unused byte, hours, minutes, seconds.
    Timer,
    /// 0x06: four seven-segment display glyphs.
    SevenSegment,
    /// 0x07: 15-bit unsigned spread over bytes 2 and 3.
    Unsigned15,
    /// 0x08: 7-bit segment code, 9-bit unsigned value.
    Segment7Unsigned9,
    /// 0x0A: two signed 16-bit values.
    SignedPair16,
}

impl DataFormat {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(Self::Signed16),
            0x02 => Some(Self::Segment6Unsigned10),
            0x03 => Some(Self::SignedSegment7Unsigned9),
            0x04 => Some(Self::Segment8Unsigned24),
            0x05 => Some(Self::Timer),
            0x06 => Some(Self::SevenSegment),
            0x07 => Some(Self::Unsigned15),
            0x08 => Some(Self::Segment7Unsigned9),
            0x0A => Some(Self::SignedPair16),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::Signed16 => 0x01,
            Self::Segment6Unsigned10 => 0x02,
            Self::SignedSegment7Unsigned9 => 0x03,
            Self::Segment8Unsigned24 => 0x04,
            Self::Timer => 0x05,
            Self::SevenSegment => 0x06,
            Self::Unsigned15 => 0x07,
            Self::Segment7Unsigned9 => 0x08,
            Self::SignedPair16 => 0x0A,
        }
    }

    /// Number of data bytes following the format byte.
    pub fn width(self) -> usize {
        match self {
            Self::Signed16
            | Self::Segment6Unsigned10
            | Self::SignedSegment7Unsigned9
            | Self::Segment7Unsigned9 => 2,
            Self::Segment8Unsigned24
            | Self::Timer
            | Self::SevenSegment
            | Self::Unsigned15
            | Self::SignedPair16 => 4,
        }
    }

    /// Every supported encoding, in code order.
    pub fn all() -> [DataFormat; 9] {
        [
            Self::Signed16,
            Self::Segment6Unsigned10,
            Self::SignedSegment7Unsigned9,
            Self::Segment8Unsigned24,
            Self::Timer,
            Self::SevenSegment,
            Self::Unsigned15,
            Self::Segment7Unsigned9,
            Self::SignedPair16,
        ]
    }
}

/// Channel format byte: divisor (bits 7-6), display digits (bits 5-4), data format (bits 3-0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct FormatByte(pub u8);

impl FormatByte {
    pub fn divisor(self) -> u32 {
        match (self.0 >> 6) & 0b11 {
            0b00 => 1,
            0b01 => 10,
            0b10 => 100,
            _ => 1000,
        }
    }

    pub fn digits(self) -> u8 {
        ((self.0 >> 4) & 0b11) + 1
    }

    pub fn code(self) -> u8 {
        self.0 & 0x0F
    }

    pub fn data_format(self) -> Option<DataFormat> {
        DataFormat::from_code(self.code())
    }

    pub fn scale(self) -> Scale {
        Scale::divide_by(self.divisor())
    }
}
