//! Declarative schema configuration.
//!
//! Tables are added by data, not by code: a JSON document describing
//! tables, fields, and relations builds the same [`Catalog`] the builder
//! API does. Malformed configuration fails fast with [`SchemaError`]
//! before any table load begins.

use std::path::Path;

use serde::Deserialize;

use super::{Catalog, FieldDef, FieldKind, RelationDef, TableDef};
use crate::error::SchemaError;

#[derive(Debug, Deserialize)]
struct SchemaConfig {
    #[serde(default)]
    tables: Vec<TableConfig>,
    #[serde(default)]
    relations: Vec<RelationConfig>,
}

#[derive(Debug, Deserialize)]
struct TableConfig {
    name: String,
    #[serde(default)]
    file: Option<String>,
    #[serde(default)]
    optional: bool,
    #[serde(default)]
    description: String,
    fields: Vec<FieldConfig>,
}

#[derive(Debug, Deserialize)]
struct FieldConfig {
    name: String,
    kind: String,
    #[serde(default)]
    column: Option<String>,
    #[serde(default)]
    required: bool,
}

#[derive(Debug, Deserialize)]
struct RelationConfig {
    name: String,
    source_table: String,
    source_field: String,
    target_table: String,
    target_field: String,
    cardinality: String,
}

impl Catalog {
    /// Build a catalog from a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Catalog, SchemaError> {
        let config: SchemaConfig =
            serde_json::from_str(json).map_err(|e| SchemaError::Config(e.to_string()))?;

        let mut builder = Catalog::builder();

        for table in config.tables {
            let mut def = TableDef::new(&table.name).with_description(table.description);
            if let Some(file) = table.file {
                def = def.with_file_stem(file);
            }
            if table.optional {
                def = def.optional();
            }
            for field in table.fields {
                let kind = FieldKind::parse(&field.kind).ok_or_else(|| {
                    SchemaError::Config(format!(
                        "table {}: field {} has unknown kind {:?}",
                        table.name, field.name, field.kind
                    ))
                })?;
                let mut fd = if field.required {
                    FieldDef::required(&field.name, kind)
                } else {
                    FieldDef::new(&field.name, kind)
                };
                if let Some(column) = field.column {
                    fd = fd.with_column(column);
                }
                def = def.with_field(fd);
            }
            builder = builder.table(def);
        }

        for relation in config.relations {
            let def = match relation.cardinality.as_str() {
                "one_to_many" => RelationDef::one_to_many(
                    &relation.name,
                    &relation.source_table,
                    &relation.source_field,
                    &relation.target_table,
                    &relation.target_field,
                ),
                "many_to_one" => RelationDef::many_to_one(
                    &relation.name,
                    &relation.source_table,
                    &relation.source_field,
                    &relation.target_table,
                    &relation.target_field,
                ),
                "one_to_one" => RelationDef::one_to_one(
                    &relation.name,
                    &relation.source_table,
                    &relation.source_field,
                    &relation.target_table,
                    &relation.target_field,
                ),
                other => {
                    return Err(SchemaError::Config(format!(
                        "relation {}: unknown cardinality {:?}",
                        relation.name, other
                    )))
                }
            };
            builder = builder.relation(def);
        }

        builder.build()
    }

    /// Build a catalog from a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Catalog, SchemaError> {
        let json = std::fs::read_to_string(path.as_ref())
            .map_err(|e| SchemaError::Config(format!("{}: {}", path.as_ref().display(), e)))?;
        Catalog::from_json(&json)
    }
}
