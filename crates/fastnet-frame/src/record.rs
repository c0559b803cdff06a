use std::fmt::Write;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use fastnet_table::{FormatByte, FormatTable, Layout};
use serde::{Serialize, Serializer};

use crate::codec::Header;
use crate::error::{DecodeError, FieldError};
use crate::field;

/// An engineering value decoded from one field or channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Number(f64),
    /// A value sharing its data word with a display segment code.
    Segmented { segment: u8, value: f64 },
    Pair { first: f64, second: f64 },
    Elapsed(Duration),
    Text(String),
}

impl Value {
    /// The primary numeric reading, when the value has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(value) | Value::Segmented { value, .. } => Some(*value),
            Value::Elapsed(elapsed) => Some(elapsed.as_secs_f64()),
            Value::Pair { .. } | Value::Text(_) => None,
        }
    }
}

/// One named value of a decoded sentence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedField {
    pub name: Arc<str>,
    pub unit: Arc<str>,
    /// Broadcast channel id, for channel-based sentences.
    pub channel: Option<u8>,
    /// Channel format byte, for channel-based sentences.
    pub format: Option<FormatByte>,
    pub value: Value,
    /// Data bytes the value was decoded from.
    #[serde(serialize_with = "hex")]
    pub raw: Bytes,
}

/// A validated, fully decoded sentence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedRecord {
    /// Position of this record in the decoder's output, starting at 0.
    pub sequence: u64,
    /// Wall-clock time at which the frame was validated.
    pub received_at: SystemTime,
    pub to: u8,
    pub to_name: Option<Arc<str>>,
    pub from: u8,
    pub from_name: Option<Arc<str>>,
    pub command: u8,
    pub command_name: Arc<str>,
    pub fields: Vec<DecodedField>,
    /// Bytes the frame occupied on the wire.
    pub wire_len: usize,
}

impl DecodedRecord {
    /// First field with the given name.
    pub fn field(&self, name: &str) -> Option<&DecodedField> {
        self.fields.iter().find(|field| field.name.as_ref() == name)
    }

    /// First field decoded from the given broadcast channel.
    pub fn channel(&self, id: u8) -> Option<&DecodedField> {
        self.fields.iter().find(|field| field.channel == Some(id))
    }
}

/// Next resolved item of a decoded byte stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Record(DecodedRecord),
    Error(DecodeError),
}

impl Outcome {
    pub fn is_record(&self) -> bool {
        matches!(self, Outcome::Record(_))
    }

    pub fn record(&self) -> Option<&DecodedRecord> {
        match self {
            Outcome::Record(record) => Some(record),
            Outcome::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&DecodeError> {
        match self {
            Outcome::Record(_) => None,
            Outcome::Error(err) => Some(err),
        }
    }

    pub fn into_record(self) -> Option<DecodedRecord> {
        match self {
            Outcome::Record(record) => Some(record),
            Outcome::Error(_) => None,
        }
    }
}

/// Decode every field of a checksum-verified body.
pub(crate) fn decode_fields(
    header: &Header,
    body: &Bytes,
    layout: &Layout,
    table: &FormatTable,
) -> Result<Vec<DecodedField>, FieldError> {
    match layout {
        Layout::Fixed { fields, .. } => fields
            .iter()
            .map(|spec| -> Result<DecodedField, FieldError> {
                let value = field::decode(body, spec)?;
                Ok(DecodedField {
                    name: Arc::clone(&spec.name),
                    unit: Arc::clone(&spec.unit),
                    channel: None,
                    format: None,
                    value: Value::Number(value),
                    raw: body.slice(spec.offset..spec.end()),
                })
            })
            .collect(),
        Layout::Channels => decode_channels(body, table),
        Layout::Text => decode_text(header, body, table),
    }
}

fn decode_channels(body: &Bytes, table: &FormatTable) -> Result<Vec<DecodedField>, FieldError> {
    let mut fields = Vec::new();
    let mut index = 0usize;

    while index < body.len() {
        let channel = body[index];
        let format = body
            .get(index + 1)
            .copied()
            .map(FormatByte)
            .ok_or(FieldError::OutOfBounds {
                offset: index + 1,
                width: 1,
                len: body.len(),
            })?;
        let width = format
            .data_format()
            .ok_or(FieldError::UnsupportedFormat {
                code: format.code(),
            })?
            .width();

        let start = index + 2;
        let end = start + width;
        if end > body.len() {
            return Err(FieldError::OutOfBounds {
                offset: start,
                width,
                len: body.len(),
            });
        }

        let raw = body.slice(start..end);
        let value = field::decode_channel(&raw, format, table)?;
        let (name, unit) = channel_labels(channel, table);
        fields.push(DecodedField {
            name,
            unit,
            channel: Some(channel),
            format: Some(format),
            value,
            raw,
        });

        index = end;
    }

    Ok(fields)
}

fn decode_text(
    header: &Header,
    body: &Bytes,
    table: &FormatTable,
) -> Result<Vec<DecodedField>, FieldError> {
    if body.len() < 2 {
        return Err(FieldError::OutOfBounds {
            offset: 0,
            width: 2,
            len: header.body_len(),
        });
    }

    let channel = body[0];
    let raw = body.slice(2..);
    let value = field::decode_text(&raw)?;
    let (name, unit) = channel_labels(channel, table);
    Ok(vec![DecodedField {
        name,
        unit,
        channel: Some(channel),
        format: Some(FormatByte(body[1])),
        value,
        raw,
    }])
}

fn channel_labels(channel: u8, table: &FormatTable) -> (Arc<str>, Arc<str>) {
    match table.channel(channel) {
        Some(spec) => (Arc::clone(&spec.name), Arc::clone(&spec.unit)),
        None => (
            Arc::from(format!("Unknown (0x{channel:02X})")),
            Arc::from(""),
        ),
    }
}

fn hex<S: Serializer>(bytes: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes.iter() {
        // Writing to a String cannot fail.
        let _ = write!(out, "{byte:02x}");
    }
    serializer.serialize_str(&out)
}
