//! Field definitions for table descriptors.

/// Semantic kind of a declared field.
///
/// The DBF column type only says how bytes are laid out; the declared kind
/// decides what the decoder converts them into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Whole number (DBF `N` without decimals).
    Int,
    /// Decimal number (DBF `N` with decimals, or `F`).
    Float,
    /// Character or memo text (DBF `C`/`M`).
    Text,
    /// Calendar date (DBF `D`, `YYYYMMDD`).
    Date,
    /// Logical flag (DBF `L`).
    Bool,
}

impl FieldKind {
    /// Kind name for diagnostics and configuration.
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Int => "int",
            FieldKind::Float => "float",
            FieldKind::Text => "text",
            FieldKind::Date => "date",
            FieldKind::Bool => "bool",
        }
    }

    /// Parse a configuration kind name.
    pub fn parse(name: &str) -> Option<FieldKind> {
        match name {
            "int" => Some(FieldKind::Int),
            "float" => Some(FieldKind::Float),
            "text" => Some(FieldKind::Text),
            "date" => Some(FieldKind::Date),
            "bool" => Some(FieldKind::Bool),
            _ => None,
        }
    }
}

/// A declared field of a table.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    /// Field name used throughout the API (e.g. `employee_id`).
    pub name: String,
    /// Uppercase DBF column header this field is decoded from
    /// (e.g. `EMPLOYEEID`; at most 10 characters in the file format).
    pub column: String,
    /// Semantic kind.
    pub kind: FieldKind,
    /// Whether the field must be present for a record to be considered
    /// complete. Informational; decoding never drops records over it.
    pub required: bool,
}

impl FieldDef {
    /// Create an optional field. The DBF column defaults to the uppercased
    /// field name.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        let name = name.into();
        let column = name.to_ascii_uppercase();
        Self {
            name,
            column,
            kind,
            required: false,
        }
    }

    /// Create a required field.
    pub fn required(name: impl Into<String>, kind: FieldKind) -> Self {
        let mut field = Self::new(name, kind);
        field.required = true;
        field
    }

    /// Override the DBF column header (needed when the field name exceeds
    /// the 10-character column limit, e.g. `employee_id` -> `EMPLOYEEID`).
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }
}
