/// Controls how format tables are loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableConfig {
    /// Maximum bytes allowed for a table file loaded from disk.
    pub max_table_file_size: usize,
    /// When true, a repeated identifier is an error. When false, the later
    /// entry replaces the earlier one.
    pub reject_duplicate_ids: bool,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            max_table_file_size: 256 * 1024,
            reject_duplicate_ids: true,
        }
    }
}
