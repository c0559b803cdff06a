//! Extraction of engineering values from sentence bodies.
//!
//! All multi-byte integers on the bus are big-endian. Numeric results are
//! scaled with [`Scale::apply`](fastnet_table::Scale::apply), so a raw value
//! is never truncated before it reaches `f64`.

use std::time::Duration;

use fastnet_table::{DataFormat, FieldSpec, FormatByte, FormatTable, MAX_FIELD_WIDTH};

use crate::error::FieldError;
use crate::record::Value;

/// Read `width` bytes at `offset` as a big-endian unsigned integer.
pub fn read_unsigned(payload: &[u8], offset: usize, width: usize) -> Result<u64, FieldError> {
    if width == 0 || width > 8 {
        return Err(FieldError::InvalidWidth { width });
    }

    let bytes = offset
        .checked_add(width)
        .and_then(|end| payload.get(offset..end))
        .ok_or(FieldError::OutOfBounds {
            offset,
            width,
            len: payload.len(),
        })?;

    Ok(bytes
        .iter()
        .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte)))
}

/// Read `width` bytes at `offset` as a big-endian two's complement integer.
pub fn read_signed(payload: &[u8], offset: usize, width: usize) -> Result<i64, FieldError> {
    let raw = read_unsigned(payload, offset, width)?;
    let shift = 64 - 8 * width as u32;
    Ok(((raw << shift) as i64) >> shift)
}

/// Decode one fixed-position field into its engineering value.
pub fn decode(payload: &[u8], spec: &FieldSpec) -> Result<f64, FieldError> {
    if spec.width > MAX_FIELD_WIDTH {
        return Err(FieldError::InvalidWidth { width: spec.width });
    }

    let raw = if spec.signed {
        read_signed(payload, spec.offset, spec.width)?
    } else {
        // At most MAX_FIELD_WIDTH bytes, so this always fits.
        read_unsigned(payload, spec.offset, spec.width)? as i64
    };

    Ok(spec.scale.apply(raw))
}

/// Decode the data bytes of one broadcast channel entry.
///
/// `data` must hold at least the width of the format's data encoding; only
/// that many bytes are read.
pub fn decode_channel(
    data: &[u8],
    format: FormatByte,
    table: &FormatTable,
) -> Result<Value, FieldError> {
    let data_format = format
        .data_format()
        .ok_or(FieldError::UnsupportedFormat {
            code: format.code(),
        })?;
    let width = data_format.width();
    if data.len() < width {
        return Err(FieldError::OutOfBounds {
            offset: 0,
            width,
            len: data.len(),
        });
    }

    let scale = format.scale();
    let value = match data_format {
        DataFormat::Signed16 => Value::Number(scale.apply(read_signed(data, 0, 2)?)),
        DataFormat::Segment6Unsigned10 => {
            let word = read_unsigned(data, 0, 2)?;
            Value::Segmented {
                segment: ((word >> 10) & 0x3F) as u8,
                value: scale.apply((word & 0x3FF) as i64),
            }
        }
        DataFormat::SignedSegment7Unsigned9 => {
            let word = read_unsigned(data, 0, 2)?;
            let segment = ((word >> 9) & 0x7F) as u8;
            let magnitude = (word & 0x1FF) as i64;
            // Bit 6 signs the value itself, not just the raw reading.
            let raw = if segment & 0x40 != 0 {
                -magnitude
            } else {
                magnitude
            };
            Value::Segmented {
                segment,
                value: scale.apply(raw),
            }
        }
        DataFormat::Segment8Unsigned24 => {
            let word = read_unsigned(data, 0, 4)?;
            Value::Segmented {
                segment: (word >> 24) as u8,
                value: scale.apply((word & 0x00FF_FFFF) as i64),
            }
        }
        DataFormat::Timer => {
            let hours = u64::from(data[1]);
            let minutes = u64::from(data[2]);
            let seconds = u64::from(data[3]);
            Value::Elapsed(Duration::from_secs(hours * 3600 + minutes * 60 + seconds))
        }
        DataFormat::SevenSegment => Value::Text(seven_segment_text(&data[..width], table)),
        DataFormat::Unsigned15 => {
            let high = u64::from((data[2] >> 1) & 0x7F);
            let low = u64::from(data[3]);
            Value::Number(scale.apply(((high << 8) | low) as i64))
        }
        DataFormat::Segment7Unsigned9 => {
            let word = read_unsigned(data, 0, 2)?;
            Value::Segmented {
                segment: ((word >> 9) & 0x7F) as u8,
                value: scale.apply((word & 0x1FF) as i64),
            }
        }
        DataFormat::SignedPair16 => Value::Pair {
            first: scale.apply(read_signed(data, 0, 2)?),
            second: scale.apply(read_signed(data, 2, 2)?),
        },
    };

    Ok(value)
}

/// Decode the text of an ASCII sentence, trimming surrounding whitespace.
pub fn decode_text(data: &[u8]) -> Result<Value, FieldError> {
    if !data.is_ascii() {
        return Err(FieldError::InvalidText);
    }
    let text = String::from_utf8_lossy(data);
    Ok(Value::Text(text.trim().to_string()))
}

/// Render seven-segment patterns through the table's glyph map.
///
/// Bit 7 is the decimal point when the full pattern has no glyph of its own.
/// Unknown patterns render as `?`.
fn seven_segment_text(patterns: &[u8], table: &FormatTable) -> String {
    let mut text = String::with_capacity(patterns.len() * 2);
    for &pattern in patterns {
        if let Some(glyph) = table.glyph(pattern) {
            text.push(glyph);
            continue;
        }
        text.push(table.glyph(pattern & 0x7F).unwrap_or('?'));
        if pattern & 0x80 != 0 {
            text.push('.');
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use fastnet_table::Scale;

    use super::*;

    fn table() -> FormatTable {
        FormatTable::bundled().unwrap()
    }

    fn spec(offset: usize, width: usize, signed: bool, scale: Scale) -> FieldSpec {
        FieldSpec {
            name: Arc::from("test"),
            offset,
            width,
            signed,
            scale,
            unit: Arc::from(""),
        }
    }

    #[test]
    fn read_unsigned_big_endian() {
        assert_eq!(read_unsigned(&[0x12, 0x34, 0x56], 0, 3).unwrap(), 0x12_3456);
        assert_eq!(read_unsigned(&[0x12, 0x34, 0x56], 1, 2).unwrap(), 0x3456);
        assert_eq!(read_unsigned(&[0xFF], 0, 1).unwrap(), 0xFF);
    }

    #[test]
    fn read_signed_extends_sign() {
        assert_eq!(read_signed(&[0xFF, 0xFE], 0, 2).unwrap(), -2);
        assert_eq!(read_signed(&[0x7F, 0xFF], 0, 2).unwrap(), 32767);
        assert_eq!(read_signed(&[0x80, 0x00, 0x00], 0, 3).unwrap(), -8_388_608);
        assert_eq!(read_signed(&[0x80], 0, 1).unwrap(), -128);
        assert_eq!(read_signed(&[0xFF; 8], 0, 8).unwrap(), -1);
    }

    #[test]
    fn read_out_of_bounds() {
        assert_eq!(
            read_unsigned(&[0x01, 0x02], 1, 2),
            Err(FieldError::OutOfBounds {
                offset: 1,
                width: 2,
                len: 2
            })
        );
        assert_eq!(
            read_unsigned(&[0x01], usize::MAX, 2),
            Err(FieldError::OutOfBounds {
                offset: usize::MAX,
                width: 2,
                len: 1
            })
        );
        assert_eq!(
            read_unsigned(&[0x01], 0, 0),
            Err(FieldError::InvalidWidth { width: 0 })
        );
    }

    #[test]
    fn decode_scaled_fields() {
        let payload = [0x00, 0x7B, 0xFF, 0x85, 0x01];
        assert_eq!(
            decode(&payload, &spec(0, 2, false, Scale::divide_by(10))).unwrap(),
            12.3
        );
        assert_eq!(
            decode(&payload, &spec(2, 2, true, Scale::divide_by(100))).unwrap(),
            -1.23
        );
        let doubled = Scale {
            multiplier: 2,
            divisor: 1,
        };
        assert_eq!(decode(&payload, &spec(4, 1, false, doubled)).unwrap(), 2.0);
    }

    #[test]
    fn decode_rejects_short_payload() {
        let err = decode(&[0x00], &spec(0, 2, false, Scale::UNIT)).unwrap_err();
        assert_eq!(
            err,
            FieldError::OutOfBounds {
                offset: 0,
                width: 2,
                len: 1
            }
        );
    }

    #[test]
    fn decode_rejects_oversized_width() {
        let err = decode(&[0u8; 8], &spec(0, 8, false, Scale::UNIT)).unwrap_err();
        assert_eq!(err, FieldError::InvalidWidth { width: 8 });
    }

    #[test]
    fn channel_signed16() {
        let value = decode_channel(&[0x00, 0x7B], FormatByte(0x41), &table()).unwrap();
        assert_eq!(value, Value::Number(12.3));

        let value = decode_channel(&[0xFF, 0x38], FormatByte(0x01), &table()).unwrap();
        assert_eq!(value, Value::Number(-200.0));
    }

    #[test]
    fn channel_segment6_unsigned10() {
        // segment 0b101010, value 0x3FF
        let value = decode_channel(&[0xAB, 0xFF], FormatByte(0x02), &table()).unwrap();
        assert_eq!(
            value,
            Value::Segmented {
                segment: 0x2A,
                value: 1023.0
            }
        );
    }

    #[test]
    fn channel_signed_segment7_unsigned9() {
        let negative = decode_channel(&[0x80, 0x2D], FormatByte(0x03), &table()).unwrap();
        assert_eq!(
            negative,
            Value::Segmented {
                segment: 0x40,
                value: -45.0
            }
        );

        let positive = decode_channel(&[0x01, 0x2C], FormatByte(0x43), &table()).unwrap();
        assert_eq!(
            positive,
            Value::Segmented {
                segment: 0x00,
                value: 30.0
            }
        );
    }

    #[test]
    fn channel_segment8_unsigned24() {
        let value =
            decode_channel(&[0x07, 0x01, 0x00, 0x00], FormatByte(0x84), &table()).unwrap();
        assert_eq!(
            value,
            Value::Segmented {
                segment: 0x07,
                value: 655.36
            }
        );
    }

    #[test]
    fn channel_timer() {
        let value =
            decode_channel(&[0xAA, 0x01, 0x02, 0x03], FormatByte(0x05), &table()).unwrap();
        assert_eq!(value, Value::Elapsed(Duration::from_secs(3723)));

        // Hours above 24 are legal on race timers.
        let value =
            decode_channel(&[0x00, 30, 0x00, 0x00], FormatByte(0x05), &table()).unwrap();
        assert_eq!(value, Value::Elapsed(Duration::from_secs(30 * 3600)));
    }

    #[test]
    fn channel_seven_segment_text() {
        let value =
            decode_channel(&[0x77, 0x3F, 0xE6, 0x02], FormatByte(0x06), &table()).unwrap();
        assert_eq!(value, Value::Text("A04.?".to_string()));
    }

    #[test]
    fn channel_unsigned15() {
        let value =
            decode_channel(&[0xFF, 0xFF, 0x03, 0xE8], FormatByte(0x47), &table()).unwrap();
        // high = 0x03 >> 1 = 1, low = 0xE8 -> 0x1E8 = 488
        assert_eq!(value, Value::Number(48.8));
    }

    #[test]
    fn channel_segment7_unsigned9() {
        let value = decode_channel(&[0x81, 0x2C], FormatByte(0x08), &table()).unwrap();
        assert_eq!(
            value,
            Value::Segmented {
                segment: 0x40,
                value: 300.0
            }
        );
    }

    #[test]
    fn channel_signed_pair() {
        let value =
            decode_channel(&[0x00, 0x64, 0xFF, 0x9C], FormatByte(0x4A), &table()).unwrap();
        assert_eq!(
            value,
            Value::Pair {
                first: 10.0,
                second: -10.0
            }
        );
    }

    #[test]
    fn channel_unsupported_format() {
        for code in [0x00, 0x09, 0x0B, 0x0F] {
            let err = decode_channel(&[0; 4], FormatByte(code), &table()).unwrap_err();
            assert_eq!(err, FieldError::UnsupportedFormat { code });
        }
    }

    #[test]
    fn channel_short_data() {
        let err = decode_channel(&[0x00, 0x01], FormatByte(0x05), &table()).unwrap_err();
        assert_eq!(
            err,
            FieldError::OutOfBounds {
                offset: 0,
                width: 4,
                len: 2
            }
        );
    }

    #[test]
    fn text_is_trimmed_ascii() {
        assert_eq!(
            decode_text(b" HELLO  ").unwrap(),
            Value::Text("HELLO".to_string())
        );
        assert_eq!(decode_text(&[0x41, 0xC3]), Err(FieldError::InvalidText));
    }
}
