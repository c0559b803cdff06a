use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::config::TableConfig;
use crate::error::{Result, TableError};
use crate::format::{FieldSpec, Layout, SentenceFormat, MAX_FIELD_WIDTH};

/// The declarative table shipped with the crate.
pub const BUNDLED_TABLE: &str = include_str!("../data/fastnet.json");

/// Table document version understood by this crate.
pub const TABLE_VERSION: u32 = 1;

/// Largest body a Fastnet header can declare.
pub const MAX_PAYLOAD_LEN: usize = u8::MAX as usize;

/// A broadcast channel: display name and engineering unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelSpec {
    pub id: u8,
    pub name: Arc<str>,
    pub unit: Arc<str>,
}

/// A device address on the bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddressSpec {
    pub id: u8,
    pub name: Arc<str>,
}

/// Read-only lookup tables keyed by command, channel, address and glyph pattern.
///
/// Built once and shared between decoders (wrap it in an `Arc`).
#[derive(Debug, Clone, Default)]
pub struct FormatTable {
    commands: BTreeMap<u8, SentenceFormat>,
    channels: BTreeMap<u8, ChannelSpec>,
    addresses: BTreeMap<u8, AddressSpec>,
    glyphs: BTreeMap<u8, char>,
}

#[derive(Deserialize)]
struct TableDocument {
    version: u32,
    commands: Vec<CommandEntry>,
    #[serde(default)]
    channels: Vec<ChannelEntry>,
    #[serde(default)]
    addresses: Vec<AddressEntry>,
    #[serde(default)]
    glyphs: Vec<GlyphEntry>,
}

#[derive(Deserialize)]
struct CommandEntry {
    #[serde(deserialize_with = "hex_byte")]
    id: u8,
    name: Arc<str>,
    layout: Layout,
}

#[derive(Deserialize)]
struct ChannelEntry {
    #[serde(deserialize_with = "hex_byte")]
    id: u8,
    name: Arc<str>,
    #[serde(default)]
    unit: Option<Arc<str>>,
}

#[derive(Deserialize)]
struct AddressEntry {
    #[serde(deserialize_with = "hex_byte")]
    id: u8,
    name: Arc<str>,
}

#[derive(Deserialize)]
struct GlyphEntry {
    #[serde(deserialize_with = "hex_byte")]
    pattern: u8,
    glyph: String,
}

impl FormatTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the table bundled with the crate.
    pub fn bundled() -> Result<Self> {
        Self::from_json(BUNDLED_TABLE)
    }

    /// Load a table from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_json_with_config(json, TableConfig::default())
    }

    /// Load a table from a JSON string with explicit config.
    pub fn from_json_with_config(json: &str, config: TableConfig) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value_with_config(value, config)
    }

    /// Load a table from a parsed JSON value.
    pub fn from_value_with_config(value: Value, config: TableConfig) -> Result<Self> {
        let document: TableDocument = serde_json::from_value(value)?;
        Self::from_document(document, config)
    }

    /// Load a table from a file.
    pub fn from_path(path: &Path) -> Result<Self> {
        Self::from_path_with_config(path, TableConfig::default())
    }

    /// Load a table from a file with explicit config.
    pub fn from_path_with_config(path: &Path, config: TableConfig) -> Result<Self> {
        let content = read_limited(path, config.max_table_file_size)?;
        Self::from_json_with_config(&content, config)
    }

    fn from_document(document: TableDocument, config: TableConfig) -> Result<Self> {
        if document.version != TABLE_VERSION {
            return Err(TableError::UnsupportedVersion(document.version));
        }

        let mut table = Self::new();

        for entry in document.commands {
            let format = SentenceFormat {
                command: entry.id,
                name: entry.name,
                layout: entry.layout,
            };
            table.insert_command(format, &config)?;
        }

        for entry in document.channels {
            let spec = ChannelSpec {
                id: entry.id,
                name: entry.name,
                unit: entry.unit.unwrap_or_else(|| Arc::from("")),
            };
            insert_entry(&mut table.channels, "channel", entry.id, spec, &config)?;
        }

        for entry in document.addresses {
            let spec = AddressSpec {
                id: entry.id,
                name: entry.name,
            };
            insert_entry(&mut table.addresses, "address", entry.id, spec, &config)?;
        }

        for entry in document.glyphs {
            let mut chars = entry.glyph.chars();
            let glyph = match (chars.next(), chars.next()) {
                (Some(glyph), None) => glyph,
                _ => {
                    return Err(TableError::InvalidGlyph {
                        pattern: entry.pattern,
                        glyph: entry.glyph,
                    })
                }
            };
            insert_entry(&mut table.glyphs, "glyph", entry.pattern, glyph, &config)?;
        }

        tracing::debug!(
            commands = table.commands.len(),
            channels = table.channels.len(),
            addresses = table.addresses.len(),
            glyphs = table.glyphs.len(),
            "loaded format table"
        );

        Ok(table)
    }

    /// Register a sentence format, replacing any existing entry for its command.
    pub fn register(&mut self, format: SentenceFormat) -> Result<()> {
        let config = TableConfig {
            reject_duplicate_ids: false,
            ..TableConfig::default()
        };
        self.insert_command(format, &config)
    }

    fn insert_command(&mut self, format: SentenceFormat, config: &TableConfig) -> Result<()> {
        check_layout(format.command, &format.layout)?;
        insert_entry(&mut self.commands, "command", format.command, format, config)
    }

    /// Look up the format for a command byte.
    pub fn lookup(&self, command: u8) -> Option<&SentenceFormat> {
        self.commands.get(&command)
    }

    /// Every known sentence format, ordered by command byte.
    pub fn commands(&self) -> impl Iterator<Item = &SentenceFormat> + '_ {
        self.commands.values()
    }

    /// Look up a broadcast channel.
    pub fn channel(&self, id: u8) -> Option<&ChannelSpec> {
        self.channels.get(&id)
    }

    /// Every known channel, ordered by id.
    pub fn channels(&self) -> impl Iterator<Item = &ChannelSpec> + '_ {
        self.channels.values()
    }

    /// Look up a bus address.
    pub fn address(&self, id: u8) -> Option<&AddressSpec> {
        self.addresses.get(&id)
    }

    /// Every known address, ordered by id.
    pub fn addresses(&self) -> impl Iterator<Item = &AddressSpec> + '_ {
        self.addresses.values()
    }

    /// Character shown by a seven-segment bit pattern.
    pub fn glyph(&self, pattern: u8) -> Option<char> {
        self.glyphs.get(&pattern).copied()
    }
}

fn check_layout(command: u8, layout: &Layout) -> Result<()> {
    let Layout::Fixed {
        payload_len,
        fields,
    } = layout
    else {
        return Ok(());
    };

    if *payload_len > MAX_PAYLOAD_LEN {
        return Err(TableError::PayloadTooLarge {
            command,
            payload_len: *payload_len,
            max: MAX_PAYLOAD_LEN,
        });
    }

    for field in fields {
        check_field(command, *payload_len, field)?;
    }
    Ok(())
}

fn check_field(command: u8, payload_len: usize, field: &FieldSpec) -> Result<()> {
    if field.width == 0 || field.width > MAX_FIELD_WIDTH {
        return Err(TableError::InvalidWidth {
            command,
            field: field.name.to_string(),
            width: field.width,
            max: MAX_FIELD_WIDTH,
        });
    }

    let end = field.offset.saturating_add(field.width);
    if end > payload_len {
        return Err(TableError::FieldOutOfBounds {
            command,
            field: field.name.to_string(),
            offset: field.offset,
            end,
            payload_len,
        });
    }

    if field.scale.divisor == 0 {
        return Err(TableError::ZeroDivisor {
            command,
            field: field.name.to_string(),
        });
    }
    Ok(())
}

fn insert_entry<V>(
    map: &mut BTreeMap<u8, V>,
    kind: &'static str,
    id: u8,
    value: V,
    config: &TableConfig,
) -> Result<()> {
    if map.insert(id, value).is_some() && config.reject_duplicate_ids {
        return Err(TableError::Duplicate { kind, id });
    }
    Ok(())
}

fn read_limited(path: &Path, max_bytes: usize) -> Result<String> {
    let file = std::fs::File::open(path)
        .map_err(|err| TableError::LoadFailed(format!("{}: {err}", path.display())))?;
    let metadata = file
        .metadata()
        .map_err(|err| TableError::LoadFailed(err.to_string()))?;

    if !metadata.is_file() {
        return Err(TableError::LoadFailed(format!(
            "not a regular file: {}",
            path.display()
        )));
    }
    if metadata.len() > max_bytes as u64 {
        return Err(TableError::LoadFailed(format!(
            "table file too large ({} bytes): {}",
            metadata.len(),
            path.display()
        )));
    }

    let read_limit = u64::try_from(max_bytes.saturating_add(1)).unwrap_or(u64::MAX);
    let mut content = String::new();
    file.take(read_limit)
        .read_to_string(&mut content)
        .map_err(|err| {
            TableError::LoadFailed(format!("failed reading {}: {err}", path.display()))
        })?;
    if content.len() > max_bytes {
        return Err(TableError::LoadFailed(format!(
            "table file too large while reading: {}",
            path.display()
        )));
    }
    Ok(content)
}

fn hex_byte<'de, D>(deserializer: D) -> std::result::Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    parse_hex_byte(&text).ok_or_else(|| {
        serde::de::Error::custom(format!("invalid byte id {text:?}, expected \"0xNN\""))
    })
}

fn parse_hex_byte(text: &str) -> Option<u8> {
    let digits = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X"))?;
    if digits.is_empty() || digits.len() > 2 {
        return None;
    }
    u8::from_str_radix(digits, 16).ok()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::format::Scale;

    const SMALL_TABLE: &str = r#"{
        "version": 1,
        "commands": [
            { "id": "0x01", "name": "Broadcast", "layout": { "kind": "channels" } },
            { "id": "0x20", "name": "Position", "layout": {
                "kind": "fixed",
                "payload_len": 6,
                "fields": [
                    { "name": "Latitude", "offset": 0, "width": 3, "signed": true,
                      "scale": { "divisor": 1000 }, "unit": "min" },
                    { "name": "Longitude", "offset": 3, "width": 3, "signed": true,
                      "scale": { "divisor": 1000 }, "unit": "min" }
                ]
            } }
        ],
        "channels": [ { "id": "0x41", "name": "Boatspeed (Knots)", "unit": "kn" } ],
        "addresses": [ { "id": "0xff", "name": "Entire System" } ],
        "glyphs": [ { "pattern": "0x3F", "glyph": "0" } ]
    }"#;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "fastnet-table-{tag}-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn bundled_table_loads() {
        let table = FormatTable::bundled().unwrap();

        let broadcast = table.lookup(0x01).unwrap();
        assert_eq!(broadcast.name.as_ref(), "Broadcast");
        assert_eq!(broadcast.layout, Layout::Channels);

        let keep_alive = table.lookup(0x0C).unwrap();
        assert_eq!(keep_alive.layout.fixed_len(), Some(0));

        let boatspeed = table.channel(0x41).unwrap();
        assert_eq!(boatspeed.name.as_ref(), "Boatspeed (Knots)");
        assert_eq!(boatspeed.unit.as_ref(), "kn");

        assert_eq!(table.address(0xFF).unwrap().name.as_ref(), "Entire System");
        assert_eq!(table.glyph(0x3F), Some('0'));
    }

    #[test]
    fn bundled_fixed_layouts_fit_their_payloads() {
        let table = FormatTable::bundled().unwrap();
        assert!(table.commands().count() >= 3);

        for format in table.commands() {
            if let Layout::Fixed {
                payload_len,
                fields,
            } = &format.layout
            {
                assert!(*payload_len <= MAX_PAYLOAD_LEN);
                let covered: usize = fields.iter().map(|field| field.width).sum();
                assert!(covered <= *payload_len, "command 0x{:02X}", format.command);
                for field in fields {
                    assert!(field.end() <= *payload_len);
                    assert!((1..=MAX_FIELD_WIDTH).contains(&field.width));
                }
            }
        }
    }

    #[test]
    fn enumeration_matches_lookup() {
        let table = FormatTable::bundled().unwrap();
        let listed: Vec<u8> = table.commands().map(|format| format.command).collect();
        for id in 0..=u8::MAX {
            assert_eq!(table.lookup(id).is_some(), listed.contains(&id));
        }
    }

    #[test]
    fn unknown_command_is_none() {
        let table = FormatTable::bundled().unwrap();
        assert!(table.lookup(0x7E).is_none());
        assert!(table.channel(0x02).is_none());
    }

    #[test]
    fn small_table_fixed_fields() {
        let table = FormatTable::from_json(SMALL_TABLE).unwrap();
        let position = table.lookup(0x20).unwrap();
        let Layout::Fixed {
            payload_len,
            fields,
        } = &position.layout
        else {
            panic!("expected fixed layout");
        };
        assert_eq!(*payload_len, 6);
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[1].offset, 3);
        assert!(fields[0].signed);
        assert_eq!(
            fields[0].scale,
            Scale {
                multiplier: 1,
                divisor: 1000
            }
        );
        assert_eq!(table.address(0xFF).unwrap().name.as_ref(), "Entire System");
    }

    #[test]
    fn rejects_field_past_payload() {
        let json = r#"{
            "version": 1,
            "commands": [ { "id": "0x20", "name": "Bad", "layout": {
                "kind": "fixed", "payload_len": 2,
                "fields": [ { "name": "Wide", "offset": 1, "width": 2 } ]
            } } ]
        }"#;
        let err = FormatTable::from_json(json).unwrap_err();
        assert!(matches!(
            err,
            TableError::FieldOutOfBounds {
                command: 0x20,
                end: 3,
                payload_len: 2,
                ..
            }
        ));
    }

    #[test]
    fn rejects_zero_width_and_zero_divisor() {
        let zero_width = r#"{
            "version": 1,
            "commands": [ { "id": "0x20", "name": "Bad", "layout": {
                "kind": "fixed", "payload_len": 2,
                "fields": [ { "name": "Empty", "offset": 0, "width": 0 } ]
            } } ]
        }"#;
        assert!(matches!(
            FormatTable::from_json(zero_width),
            Err(TableError::InvalidWidth { width: 0, .. })
        ));

        let zero_divisor = r#"{
            "version": 1,
            "commands": [ { "id": "0x20", "name": "Bad", "layout": {
                "kind": "fixed", "payload_len": 2,
                "fields": [ { "name": "X", "offset": 0, "width": 2,
                              "scale": { "divisor": 0 } } ]
            } } ]
        }"#;
        assert!(matches!(
            FormatTable::from_json(zero_divisor),
            Err(TableError::ZeroDivisor { .. })
        ));
    }

    #[test]
    fn duplicate_ids_rejected_by_default() {
        let json = r#"{
            "version": 1,
            "commands": [],
            "channels": [
                { "id": "0x41", "name": "First" },
                { "id": "0x41", "name": "Second" }
            ]
        }"#;
        assert!(matches!(
            FormatTable::from_json(json),
            Err(TableError::Duplicate {
                kind: "channel",
                id: 0x41
            })
        ));

        let permissive = TableConfig {
            reject_duplicate_ids: false,
            ..TableConfig::default()
        };
        let table = FormatTable::from_json_with_config(json, permissive).unwrap();
        assert_eq!(table.channel(0x41).unwrap().name.as_ref(), "Second");
        assert_eq!(table.channel(0x41).unwrap().unit.as_ref(), "");
    }

    #[test]
    fn rejects_bad_ids_and_versions() {
        let bad_id = r#"{ "version": 1, "commands": [
            { "id": "65", "name": "Decimal", "layout": { "kind": "channels" } } ] }"#;
        assert!(matches!(
            FormatTable::from_json(bad_id),
            Err(TableError::InvalidJson(_))
        ));

        let bad_version = r#"{ "version": 2, "commands": [] }"#;
        assert!(matches!(
            FormatTable::from_json(bad_version),
            Err(TableError::UnsupportedVersion(2))
        ));

        let bad_glyph = r#"{ "version": 1, "commands": [],
            "glyphs": [ { "pattern": "0x3F", "glyph": "00" } ] }"#;
        assert!(matches!(
            FormatTable::from_json(bad_glyph),
            Err(TableError::InvalidGlyph { pattern: 0x3F, .. })
        ));
    }

    #[test]
    fn parse_hex_byte_forms() {
        assert_eq!(parse_hex_byte("0x41"), Some(0x41));
        assert_eq!(parse_hex_byte("0XfF"), Some(0xFF));
        assert_eq!(parse_hex_byte("0x7"), Some(0x07));
        assert_eq!(parse_hex_byte("0x"), None);
        assert_eq!(parse_hex_byte("0x100"), None);
        assert_eq!(parse_hex_byte("41"), None);
    }

    #[test]
    fn register_replaces_command() {
        let mut table = FormatTable::bundled().unwrap();
        table
            .register(SentenceFormat {
                command: 0x0C,
                name: Arc::from("Keep Alive (extended)"),
                layout: Layout::Fixed {
                    payload_len: 2,
                    fields: vec![FieldSpec {
                        name: Arc::from("Counter"),
                        offset: 0,
                        width: 2,
                        signed: false,
                        scale: Scale::UNIT,
                        unit: Arc::from(""),
                    }],
                },
            })
            .unwrap();
        assert_eq!(table.lookup(0x0C).unwrap().layout.fixed_len(), Some(2));

        let err = table
            .register(SentenceFormat {
                command: 0x21,
                name: Arc::from("Too long"),
                layout: Layout::Fixed {
                    payload_len: 300,
                    fields: Vec::new(),
                },
            })
            .unwrap_err();
        assert!(matches!(err, TableError::PayloadTooLarge { .. }));
    }

    #[test]
    fn from_path_loads_and_enforces_size() {
        let dir = temp_dir("path");
        let path = dir.join("table.json");
        std::fs::write(&path, SMALL_TABLE).unwrap();

        let table = FormatTable::from_path(&path).unwrap();
        assert!(table.lookup(0x20).is_some());

        let tiny = TableConfig {
            max_table_file_size: 16,
            ..TableConfig::default()
        };
        assert!(matches!(
            FormatTable::from_path_with_config(&path, tiny),
            Err(TableError::LoadFailed(_))
        ));

        assert!(matches!(
            FormatTable::from_path(&dir.join("missing.json")),
            Err(TableError::LoadFailed(_))
        ));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
