//! Schema catalog: declared tables, fields, and relations.
//!
//! The catalog is built once at startup (from code, the standard
//! declarations, or a JSON configuration document) and treated as
//! read-only thereafter.

mod catalog;
mod config;
mod field;
mod relation;
mod standard;
mod table;

pub use catalog::{Catalog, CatalogBuilder};
pub use field::{FieldDef, FieldKind};
pub use relation::{Cardinality, RelationDef};
pub use table::TableDef;
