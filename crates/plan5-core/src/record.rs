//! Decoded records and their identifiers.

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Stable identity of a record within one load session:
/// `(table name, position)`. Reloading a table invalidates every identifier
/// derived from its previous content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordId {
    /// Owning table name.
    pub table: String,
    /// Zero-based position within the table.
    pub position: u32,
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.table, self.position)
    }
}

/// One decoded row of a table.
///
/// Field order follows the table descriptor's declaration order. Records
/// are immutable after decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    table: String,
    position: u32,
    fields: Vec<(String, Value)>,
}

impl Record {
    /// Create a record. Used by the decoder and by synthetic aggregate rows.
    pub fn new(table: impl Into<String>, position: u32, fields: Vec<(String, Value)>) -> Self {
        Self {
            table: table.into(),
            position,
            fields,
        }
    }

    /// The owning table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Zero-based position within the owning table.
    pub fn position(&self) -> u32 {
        self.position
    }

    /// The record's identity.
    pub fn id(&self) -> RecordId {
        RecordId {
            table: self.table.clone(),
            position: self.position,
        }
    }

    /// Look up a field value by name.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, v)| v)
    }

    /// All fields in declaration order.
    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }
}
