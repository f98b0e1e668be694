//! Relation definitions between tables.

/// Cardinality of a declared relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// Unique foreign key on the source side.
    OneToOne,
    /// Foreign key on the target side (target is the "many" side).
    OneToMany,
    /// Foreign key on the source side (source is the "many" side).
    ManyToOne,
}

/// A declared foreign-key association between two tables.
///
/// `source` is the side the relation is declared from; which side carries
/// the foreign key follows from the cardinality (see [`Self::fk_side`]).
#[derive(Debug, Clone, PartialEq)]
pub struct RelationDef {
    /// Relation name (unique within the catalog).
    pub name: String,
    /// Source table name.
    pub source_table: String,
    /// Field on the source table.
    pub source_field: String,
    /// Target table name.
    pub target_table: String,
    /// Field on the target table.
    pub target_field: String,
    /// Relation cardinality.
    pub cardinality: Cardinality,
}

impl RelationDef {
    /// Create a one-to-many relation: one source row owns many target rows;
    /// the target table carries the foreign key.
    pub fn one_to_many(
        name: impl Into<String>,
        source_table: impl Into<String>,
        source_field: impl Into<String>,
        target_table: impl Into<String>,
        target_field: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            source_table: source_table.into(),
            source_field: source_field.into(),
            target_table: target_table.into(),
            target_field: target_field.into(),
            cardinality: Cardinality::OneToMany,
        }
    }

    /// Create a many-to-one relation: the source table carries the foreign
    /// key pointing at one target row.
    pub fn many_to_one(
        name: impl Into<String>,
        source_table: impl Into<String>,
        source_field: impl Into<String>,
        target_table: impl Into<String>,
        target_field: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            source_table: source_table.into(),
            source_field: source_field.into(),
            target_table: target_table.into(),
            target_field: target_field.into(),
            cardinality: Cardinality::ManyToOne,
        }
    }

    /// Create a one-to-one relation; the source side carries the key.
    pub fn one_to_one(
        name: impl Into<String>,
        source_table: impl Into<String>,
        source_field: impl Into<String>,
        target_table: impl Into<String>,
        target_field: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            source_table: source_table.into(),
            source_field: source_field.into(),
            target_table: target_table.into(),
            target_field: target_field.into(),
            cardinality: Cardinality::OneToOne,
        }
    }

    /// The `(table, field)` carrying the foreign key, i.e. the "many" side.
    pub fn fk_side(&self) -> (&str, &str) {
        match self.cardinality {
            Cardinality::OneToMany => (&self.target_table, &self.target_field),
            Cardinality::ManyToOne | Cardinality::OneToOne => {
                (&self.source_table, &self.source_field)
            }
        }
    }

    /// The `(table, field)` carrying the referenced key, i.e. the "one" side.
    pub fn key_side(&self) -> (&str, &str) {
        match self.cardinality {
            Cardinality::OneToMany => (&self.source_table, &self.source_field),
            Cardinality::ManyToOne | Cardinality::OneToOne => {
                (&self.target_table, &self.target_field)
            }
        }
    }

    /// Whether this relation references the given table on either side.
    pub fn touches(&self, table: &str) -> bool {
        self.source_table == table || self.target_table == table
    }

    /// Whether both sides reference the same table (e.g. a group's parent
    /// group). Self-relations are excluded from dependency ordering.
    pub fn is_self_relation(&self) -> bool {
        self.source_table == self.target_table
    }

    /// The table on the opposite side of `table`, if the relation touches it.
    pub fn other_side(&self, table: &str) -> Option<&str> {
        if self.source_table == table {
            Some(&self.target_table)
        } else if self.target_table == table {
            Some(&self.source_table)
        } else {
            None
        }
    }
}
