//! Source row records and the configuration that maps arbitrary column names
//! onto the four logical fields.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One record from the external tabular source: column name to stringified
/// value.
pub type SourceRow = HashMap<String, String>;

/// Maps the source query's column names onto the logical relationship fields.
///
/// The creation query and the removal query each carry their own map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowFieldMap {
    /// Column holding the parent asset identifier.
    pub parent: String,
    /// Column holding the child asset identifier.
    pub child: String,
    /// Column holding the raw dependency label.
    #[serde(default)]
    pub dependency: String,
    /// Column holding the raw impact label.
    #[serde(default)]
    pub impact: String,
}

impl RowFieldMap {
    /// Reads a logical field from a row; a missing column reads as empty.
    pub fn get<'a>(&self, row: &'a SourceRow, column: &str) -> &'a str {
        row.get(column).map(String::as_str).unwrap_or("")
    }
}
