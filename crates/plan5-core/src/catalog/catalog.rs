//! Catalog construction and dependency ordering.

use std::collections::{HashMap, HashSet};

use tracing::warn;

use super::relation::RelationDef;
use super::table::TableDef;
use crate::error::{SchemaError, Violation};

/// The immutable schema catalog: every declared table and relation, plus
/// the precomputed dependency order.
///
/// Built once at startup and shared read-only for the process lifetime.
#[derive(Debug)]
pub struct Catalog {
    tables: Vec<TableDef>,
    by_name: HashMap<String, usize>,
    relations: Vec<RelationDef>,
    relations_by_name: HashMap<String, usize>,
    order: Vec<String>,
    levels: Vec<Vec<String>>,
}

impl Catalog {
    /// Start building a catalog.
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    /// Resolve a table descriptor by name.
    pub fn resolve(&self, name: &str) -> Result<&TableDef, SchemaError> {
        self.get(name)
            .ok_or_else(|| SchemaError::UnknownTable(name.to_string()))
    }

    /// Look up a table descriptor by name.
    pub fn get(&self, name: &str) -> Option<&TableDef> {
        self.by_name.get(name).map(|&i| &self.tables[i])
    }

    /// Whether a table is declared.
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// All declared tables in declaration order.
    pub fn tables(&self) -> &[TableDef] {
        &self.tables
    }

    /// Resolve a relation by name.
    pub fn relation(&self, name: &str) -> Result<&RelationDef, SchemaError> {
        self.relations_by_name
            .get(name)
            .map(|&i| &self.relations[i])
            .ok_or_else(|| SchemaError::UnknownRelation(name.to_string()))
    }

    /// All declared relations in declaration order.
    pub fn relations(&self) -> &[RelationDef] {
        &self.relations
    }

    /// Relations touching the given table on either side.
    pub fn relations_for(&self, table: &str) -> Vec<&RelationDef> {
        self.relations.iter().filter(|r| r.touches(table)).collect()
    }

    /// Table names in load order: every table after all tables it depends
    /// on, ties broken by declaration order.
    pub fn dependency_order(&self) -> &[String] {
        &self.order
    }

    /// The load order partitioned into levels; all tables within a level
    /// can load concurrently.
    pub fn dependency_levels(&self) -> &[Vec<String>] {
        &self.levels
    }
}

/// Accumulates table and relation declarations, then validates and orders
/// them in a single constraint pass.
#[derive(Default)]
pub struct CatalogBuilder {
    tables: Vec<TableDef>,
    relations: Vec<RelationDef>,
}

impl CatalogBuilder {
    /// Declare a table.
    pub fn table(mut self, table: TableDef) -> Self {
        self.tables.push(table);
        self
    }

    /// Declare a relation.
    pub fn relation(mut self, relation: RelationDef) -> Self {
        self.relations.push(relation);
        self
    }

    /// Validate all declarations and build the catalog.
    ///
    /// Every violation is collected before failing, so a broken
    /// configuration reports all of its problems at once. No partial
    /// catalog survives a failure.
    pub fn build(self) -> Result<Catalog, SchemaError> {
        let mut violations = Vec::new();

        let mut by_name = HashMap::new();
        for (i, table) in self.tables.iter().enumerate() {
            if by_name.insert(table.name.clone(), i).is_some() {
                violations.push(Violation::new(&table.name, "duplicate table declaration"));
            }
            if table.fields.is_empty() {
                violations.push(Violation::new(&table.name, "table declares no fields"));
            }
        }

        let mut relations_by_name = HashMap::new();
        for (i, relation) in self.relations.iter().enumerate() {
            if relations_by_name
                .insert(relation.name.clone(), i)
                .is_some()
            {
                violations.push(Violation::new(
                    &relation.source_table,
                    format!("duplicate relation declaration: {}", relation.name),
                ));
            }

            for (table, field) in [
                (&relation.source_table, &relation.source_field),
                (&relation.target_table, &relation.target_field),
            ] {
                match by_name.get(table).map(|&i| &self.tables[i]) {
                    None => violations.push(Violation::new(
                        table,
                        format!("relation {} references an undeclared table", relation.name),
                    )),
                    Some(def) => {
                        if def.field(field).is_none() {
                            violations.push(Violation::new(
                                table,
                                format!(
                                    "relation {} references unknown field {}",
                                    relation.name, field
                                ),
                            ));
                        }
                    }
                }
            }
        }

        if !violations.is_empty() {
            return Err(SchemaError::Invalid(violations));
        }

        let (order, levels) = compute_levels(&self.tables, &self.relations, &by_name);

        Ok(Catalog {
            tables: self.tables,
            by_name,
            relations: self.relations,
            relations_by_name,
            order,
            levels,
        })
    }
}

/// Kahn-style level partition over the relation graph.
///
/// The foreign-key side of a relation depends on the key side.
/// Self-relations carry no ordering constraint. If a cross-table cycle
/// remains, the earliest-declared remaining table is forced into the next
/// level with a warning instead of rejecting the configuration.
fn compute_levels(
    tables: &[TableDef],
    relations: &[RelationDef],
    by_name: &HashMap<String, usize>,
) -> (Vec<String>, Vec<Vec<String>>) {
    let n = tables.len();
    let mut deps: Vec<HashSet<usize>> = vec![HashSet::new(); n];

    for relation in relations {
        if relation.is_self_relation() {
            continue;
        }
        let (fk_table, _) = relation.fk_side();
        let (key_table, _) = relation.key_side();
        let fk = by_name[fk_table];
        let key = by_name[key_table];
        deps[fk].insert(key);
    }

    let mut placed: HashSet<usize> = HashSet::new();
    let mut remaining: Vec<usize> = (0..n).collect();
    let mut levels: Vec<Vec<String>> = Vec::new();
    let mut order: Vec<String> = Vec::new();

    while !remaining.is_empty() {
        let mut level: Vec<usize> = remaining
            .iter()
            .copied()
            .filter(|&i| deps[i].iter().all(|d| placed.contains(d)))
            .collect();

        if level.is_empty() {
            // Cross-table cycle: break it at the earliest declaration.
            let forced = remaining[0];
            warn!(
                table = %tables[forced].name,
                "relation graph contains a cycle; forcing load order by declaration order"
            );
            level.push(forced);
        }

        for &i in &level {
            placed.insert(i);
        }
        remaining.retain(|i| !placed.contains(i));

        let names: Vec<String> = level.iter().map(|&i| tables[i].name.clone()).collect();
        order.extend(names.iter().cloned());
        levels.push(names);
    }

    (order, levels)
}
