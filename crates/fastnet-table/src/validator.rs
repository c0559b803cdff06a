use jsonschema::Validator;
use serde_json::Value;

use crate::config::TableConfig;
use crate::error::{Result, TableError};
use crate::table::FormatTable;

/// JSON Schema describing a format table document.
pub const TABLE_SCHEMA: &str = include_str!("../data/fastnet-table.schema.json");

fn compile_table_schema() -> Result<Validator> {
    let schema: Value = serde_json::from_str(TABLE_SCHEMA)?;
    jsonschema::validator_for(&schema)
        .map_err(|err| TableError::SchemaViolation(format!("schema failed to compile: {err}")))
}

/// Check a table document against [`TABLE_SCHEMA`].
pub fn validate_table(document: &Value) -> Result<()> {
    let validator = compile_table_schema()?;

    let mut errors = validator.iter_errors(document);
    if let Some(first) = errors.next() {
        let mut message = first.to_string();
        for err in errors.take(3) {
            message.push_str("; ");
            message.push_str(&err.to_string());
        }
        return Err(TableError::SchemaViolation(message));
    }

    Ok(())
}

impl FormatTable {
    /// Load a table from JSON after validating it against [`TABLE_SCHEMA`].
    pub fn from_json_validated(json: &str, config: TableConfig) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        validate_table(&value)?;
        Self::from_value_with_config(value, config)
    }
}
