//! The schema view: what the compiler knows about queryable tables.
//!
//! [`SchemaView`] is the trait the query builder consumes; [`SchemaSet`]
//! with [`TableSchema`] is the in-memory implementation used by tests and
//! the CLI. A schema id is a logical name (`"events"`); the `table` field
//! is the SQL relation it maps to.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::types::FieldType;

/// An association between two schemas, with the key metadata needed to
/// generate the join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Assoc {
    /// The root table holds the foreign key (`events.organization_id`).
    BelongsTo {
        /// Target schema id.
        schema: String,
        /// FK column on the root table.
        owner_key: String,
        /// Key column on the associated table, usually its primary key.
        related_key: String,
    },
    /// The associated table holds the foreign key, at most one row.
    HasOne {
        schema: String,
        /// Key column on the root table, usually its primary key.
        owner_key: String,
        /// FK column on the associated table.
        related_key: String,
    },
    /// The associated table holds the foreign key, many rows.
    HasMany {
        schema: String,
        owner_key: String,
        related_key: String,
    },
    /// Rows related through a join table.
    ManyToMany {
        schema: String,
        join_table: String,
        /// FK column on the join table pointing at the root.
        join_owner_key: String,
        /// FK column on the join table pointing at the association.
        join_related_key: String,
        /// Key column on the associated table, usually its primary key.
        related_key: String,
    },
}

impl Assoc {
    /// The target schema id.
    pub fn schema(&self) -> &str {
        match self {
            Assoc::BelongsTo { schema, .. }
            | Assoc::HasOne { schema, .. }
            | Assoc::HasMany { schema, .. }
            | Assoc::ManyToMany { schema, .. } => schema,
        }
    }

    /// Whether rows can multiply through this association.
    pub fn is_to_many(&self) -> bool {
        matches!(self, Assoc::HasMany { .. } | Assoc::ManyToMany { .. })
    }
}

/// Read-only schema metadata consumed by the query builder.
///
/// All methods take a schema id so one view can describe the root and
/// every association target. Implementations must be pure: the builder
/// assumes repeated calls return the same answers within a compile.
pub trait SchemaView {
    /// The declared field names of a schema.
    fn fields(&self, schema: &str) -> Vec<String>;

    /// The type of a field, or `None` when the schema has no such field.
    fn field_type(&self, schema: &str, field: &str) -> Option<FieldType>;

    /// The primary key column of a schema.
    fn primary_key(&self, schema: &str) -> Option<String>;

    /// The SQL table a schema maps to.
    fn table(&self, schema: &str) -> Option<String>;

    /// A declared association, by name.
    fn association(&self, schema: &str, name: &str) -> Option<Assoc>;

    /// Whether a schema declares the field.
    fn has_field(&self, schema: &str, field: &str) -> bool {
        self.field_type(schema, field).is_some()
    }
}

/// One table's worth of schema metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub table: String,
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
    pub fields: FxHashMap<String, FieldType>,
    #[serde(default)]
    pub assocs: FxHashMap<String, Assoc>,
}

fn default_primary_key() -> String {
    "id".to_string()
}

impl TableSchema {
    /// Start a schema for the given SQL table, with primary key `id`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            primary_key: default_primary_key(),
            fields: FxHashMap::default(),
            assocs: FxHashMap::default(),
        }
    }

    /// Declare a field.
    pub fn field(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.fields.insert(name.into(), ty);
        self
    }

    /// Override the primary key column.
    pub fn primary_key(mut self, name: impl Into<String>) -> Self {
        self.primary_key = name.into();
        self
    }

    /// Declare an association.
    pub fn assoc(mut self, name: impl Into<String>, assoc: Assoc) -> Self {
        self.assocs.insert(name.into(), assoc);
        self
    }
}

/// An in-memory catalog of schemas keyed by schema id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaSet {
    schemas: FxHashMap<String, TableSchema>,
}

impl SchemaSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema under an id.
    pub fn define(mut self, id: impl Into<String>, schema: TableSchema) -> Self {
        self.schemas.insert(id.into(), schema);
        self
    }

    pub fn get(&self, id: &str) -> Option<&TableSchema> {
        self.schemas.get(id)
    }
}

impl SchemaView for SchemaSet {
    fn fields(&self, schema: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .schemas
            .get(schema)
            .map(|s| s.fields.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    fn field_type(&self, schema: &str, field: &str) -> Option<FieldType> {
        self.schemas.get(schema)?.fields.get(field).cloned()
    }

    fn primary_key(&self, schema: &str) -> Option<String> {
        self.schemas.get(schema).map(|s| s.primary_key.clone())
    }

    fn table(&self, schema: &str) -> Option<String> {
        self.schemas.get(schema).map(|s| s.table.clone())
    }

    fn association(&self, schema: &str, name: &str) -> Option<Assoc> {
        self.schemas.get(schema)?.assocs.get(name).cloned()
    }
}
