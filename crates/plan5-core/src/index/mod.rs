//! Hash indexes over declared relationships.
//!
//! For every relation whose both endpoint tables loaded, one linear scan
//! of each side builds `foreign-key value -> record positions` maps, giving
//! O(1) amortized lookups independent of table growth. A relation with a
//! failed or missing endpoint is marked unresolved instead of failing the
//! others.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::catalog::Catalog;
use crate::record::Record;
use crate::value::IndexKey;

/// Index over a single relation.
#[derive(Debug)]
pub struct RelationIndex {
    relation: String,
    fk_table: String,
    key_table: String,
    /// Key value -> positions in the foreign-key ("many") side table.
    fk_map: HashMap<IndexKey, Vec<u32>>,
    /// Key value -> positions in the key ("one") side table.
    key_map: HashMap<IndexKey, Vec<u32>>,
}

impl RelationIndex {
    /// The relation name this index serves.
    pub fn relation(&self) -> &str {
        &self.relation
    }

    /// The table holding the foreign key.
    pub fn fk_table(&self) -> &str {
        &self.fk_table
    }

    /// The table holding the referenced key.
    pub fn key_table(&self) -> &str {
        &self.key_table
    }

    /// Positions of foreign-key side records carrying `key`. Absent keys
    /// yield an empty slice, never an error.
    pub fn lookup(&self, key: &IndexKey) -> &[u32] {
        self.fk_map.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Positions of key-side records whose key field equals `key`.
    pub fn lookup_key_side(&self, key: &IndexKey) -> &[u32] {
        self.key_map.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of distinct foreign-key values.
    pub fn distinct_keys(&self) -> usize {
        self.fk_map.len()
    }
}

/// All relation indexes of one load session.
#[derive(Debug, Default)]
pub struct RelationIndexSet {
    indexes: HashMap<String, RelationIndex>,
    unresolved: Vec<String>,
}

impl RelationIndexSet {
    /// Build indexes for every relation whose endpoints are both present
    /// in `records` (table name -> decoded records).
    pub fn build(catalog: &Catalog, records: &HashMap<String, Arc<Vec<Record>>>) -> Self {
        let mut indexes = HashMap::new();
        let mut unresolved = Vec::new();

        for relation in catalog.relations() {
            let (fk_table, fk_field) = relation.fk_side();
            let (key_table, key_field) = relation.key_side();

            let (Some(fk_records), Some(key_records)) =
                (records.get(fk_table), records.get(key_table))
            else {
                warn!(
                    relation = %relation.name,
                    "endpoint table unavailable; relation left unresolved"
                );
                unresolved.push(relation.name.clone());
                continue;
            };

            let fk_map = scan(fk_records, fk_field);
            let key_map = scan(key_records, key_field);

            debug!(
                relation = %relation.name,
                keys = fk_map.len(),
                "relation index built"
            );

            indexes.insert(
                relation.name.clone(),
                RelationIndex {
                    relation: relation.name.clone(),
                    fk_table: fk_table.to_string(),
                    key_table: key_table.to_string(),
                    fk_map,
                    key_map,
                },
            );
        }

        Self {
            indexes,
            unresolved,
        }
    }

    /// The index for a relation, if it resolved.
    pub fn get(&self, relation: &str) -> Option<&RelationIndex> {
        self.indexes.get(relation)
    }

    /// Foreign-key side positions for `key`, empty when the key is absent
    /// or the relation unresolved.
    pub fn lookup(&self, relation: &str, key: &IndexKey) -> &[u32] {
        self.indexes
            .get(relation)
            .map(|index| index.lookup(key))
            .unwrap_or(&[])
    }

    /// Whether the relation's index was built in this session.
    pub fn is_resolved(&self, relation: &str) -> bool {
        self.indexes.contains_key(relation)
    }

    /// Relations that could not be resolved this session.
    pub fn unresolved(&self) -> &[String] {
        &self.unresolved
    }
}

fn scan(records: &[Record], field: &str) -> HashMap<IndexKey, Vec<u32>> {
    let mut map: HashMap<IndexKey, Vec<u32>> = HashMap::new();
    for record in records {
        let Some(value) = record.get(field) else {
            continue;
        };
        if let Some(key) = IndexKey::from_value(value) {
            map.entry(key).or_default().push(record.position());
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FieldDef, FieldKind, RelationDef, TableDef};
    use crate::value::Value;

    fn sample_catalog() -> Catalog {
        Catalog::builder()
            .table(
                TableDef::new("5EMPL")
                    .with_field(FieldDef::required("id", FieldKind::Int))
                    .with_field(FieldDef::required("name", FieldKind::Text)),
            )
            .table(
                TableDef::new("5ABSEN")
                    .with_field(FieldDef::required("id", FieldKind::Int))
                    .with_field(
                        FieldDef::required("employee_id", FieldKind::Int)
                            .with_column("EMPLOYEEID"),
                    ),
            )
            .relation(RelationDef::one_to_many(
                "employee_absences",
                "5EMPL",
                "id",
                "5ABSEN",
                "employee_id",
            ))
            .build()
            .unwrap()
    }

    fn employee(position: u32, id: i64, name: &str) -> Record {
        Record::new(
            "5EMPL",
            position,
            vec![
                ("id".into(), Value::Int(id)),
                ("name".into(), Value::Text(name.into())),
            ],
        )
    }

    fn absence(position: u32, id: i64, employee_id: Value) -> Record {
        Record::new(
            "5ABSEN",
            position,
            vec![
                ("id".into(), Value::Int(id)),
                ("employee_id".into(), employee_id),
            ],
        )
    }

    fn sample_records() -> HashMap<String, Arc<Vec<Record>>> {
        let mut map = HashMap::new();
        map.insert(
            "5EMPL".to_string(),
            Arc::new(vec![employee(0, 1, "Mustermann"), employee(1, 2, "Beispiel")]),
        );
        map.insert(
            "5ABSEN".to_string(),
            Arc::new(vec![
                absence(0, 10, Value::Int(1)),
                absence(1, 11, Value::Int(1)),
                absence(2, 12, Value::Int(2)),
                absence(3, 13, Value::Null),
            ]),
        );
        map
    }

    #[test]
    fn test_lookup_returns_all_matches_in_order() {
        let set = RelationIndexSet::build(&sample_catalog(), &sample_records());

        let hits = set.lookup("employee_absences", &IndexKey::Int(1));
        assert_eq!(hits, &[0, 1]);
        let hits = set.lookup("employee_absences", &IndexKey::Int(2));
        assert_eq!(hits, &[2]);
    }

    #[test]
    fn test_absent_key_is_empty_not_error() {
        let set = RelationIndexSet::build(&sample_catalog(), &sample_records());
        assert!(set.lookup("employee_absences", &IndexKey::Int(99)).is_empty());
        assert!(set.lookup("no_such_relation", &IndexKey::Int(1)).is_empty());
    }

    #[test]
    fn test_null_foreign_keys_not_indexed() {
        let set = RelationIndexSet::build(&sample_catalog(), &sample_records());
        let index = set.get("employee_absences").unwrap();
        // Three absences carry a key; the null one does not participate.
        assert_eq!(index.distinct_keys(), 2);
    }

    #[test]
    fn test_key_side_lookup() {
        let set = RelationIndexSet::build(&sample_catalog(), &sample_records());
        let index = set.get("employee_absences").unwrap();
        assert_eq!(index.lookup_key_side(&IndexKey::Int(2)), &[1]);
        assert_eq!(index.fk_table(), "5ABSEN");
        assert_eq!(index.key_table(), "5EMPL");
    }

    #[test]
    fn test_missing_endpoint_marks_unresolved() {
        let mut records = sample_records();
        records.remove("5ABSEN");

        let set = RelationIndexSet::build(&sample_catalog(), &records);
        assert!(!set.is_resolved("employee_absences"));
        assert_eq!(set.unresolved(), &["employee_absences".to_string()]);
        assert!(set.lookup("employee_absences", &IndexKey::Int(1)).is_empty());
    }
}
