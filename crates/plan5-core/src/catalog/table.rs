//! Table descriptors.

use super::field::FieldDef;

/// A declared table: name, source file stem, and ordered field list.
///
/// Immutable once the catalog is built.
#[derive(Debug, Clone, PartialEq)]
pub struct TableDef {
    /// Table name (unique within the catalog, e.g. `5EMPL`).
    pub name: String,
    /// File stem the registry matches in the source directory
    /// (`<stem>.DBF`). Defaults to the table name.
    pub file_stem: String,
    /// Whether a missing source file is tolerated without a warning.
    pub optional: bool,
    /// Human-readable description.
    pub description: String,
    /// Ordered field definitions.
    pub fields: Vec<FieldDef>,
}

impl TableDef {
    /// Create a table descriptor.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            file_stem: name.clone(),
            name,
            optional: false,
            description: String::new(),
            fields: Vec::new(),
        }
    }

    /// Add a field.
    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Add multiple fields.
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = FieldDef>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Mark the table's source file as optional.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Override the source file stem.
    pub fn with_file_stem(mut self, stem: impl Into<String>) -> Self {
        self.file_stem = stem.into();
        self
    }

    /// Look up a field by its API name.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Look up a field by its DBF column header (case-insensitive).
    pub fn field_by_column(&self, column: &str) -> Option<&FieldDef> {
        self.fields
            .iter()
            .find(|f| f.column.eq_ignore_ascii_case(column))
    }

    /// Names of fields marked required.
    pub fn required_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
    }
}
