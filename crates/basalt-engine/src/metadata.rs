use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::key;

/// Mandatory document identifier field.
pub const ID_FIELD: &str = "_id";

/// Name of the implicit unique index on `_id`.
pub const ID_INDEX_NAME: &str = "_id_";

/// One field of an index declaration: name plus direction
/// (`1` ascending, `-1` descending).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexField {
    pub name: String,
    pub order: i32,
}

impl IndexField {
    pub fn asc(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            order: 1,
        }
    }

    pub fn desc(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            order: -1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexOptions {
    pub name: String,
    pub unique: bool,
    #[serde(default)]
    pub autogenerated: bool,
}

/// A declared secondary index: an ordered field list plus options.
///
/// Field order is meaningful: it defines both the `{fields}`/`{values}`
/// key segments and the equality-prefix the planner can match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexModel {
    pub fields: Vec<IndexField>,
    pub options: IndexOptions,
}

impl IndexModel {
    pub fn new(fields: Vec<IndexField>) -> Self {
        Self {
            fields,
            options: IndexOptions::default(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.options.name = name.into();
        self
    }

    pub fn unique(mut self, unique: bool) -> Self {
        self.options.unique = unique;
        self
    }

    /// The implicit unique index on `(_id, 1)` every collection carries.
    pub fn id_index() -> Self {
        Self {
            fields: vec![IndexField::asc(ID_FIELD)],
            options: IndexOptions {
                name: ID_INDEX_NAME.to_string(),
                unique: true,
                autogenerated: true,
            },
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.fields.is_empty() {
            return Err(EngineError::EmptyIndexFields);
        }
        for (i, field) in self.fields.iter().enumerate() {
            if field.order != 1 && field.order != -1 {
                return Err(EngineError::InvalidIndexOrder(field.order));
            }
            if self.fields[..i].iter().any(|f| f.name == field.name) {
                return Err(EngineError::DuplicateIndexField(field.name.clone()));
            }
        }
        Ok(())
    }

    /// Deterministic default name: `field1_1_field2_-1_...`.
    pub fn default_name(&self) -> String {
        self.fields
            .iter()
            .map(|f| format!("{}_{}", f.name, f.order))
            .collect::<Vec<_>>()
            .join("_")
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// The `{fields}` key segment for this index.
    pub fn fields_signature(&self) -> String {
        key::fields_signature(self.field_names())
    }

    /// True when both indexes cover the same set of field names,
    /// regardless of order or direction.
    pub fn same_field_set(&self, other: &IndexModel) -> bool {
        if self.fields.len() != other.fields.len() {
            return false;
        }
        let mut mine: Vec<&str> = self.field_names().collect();
        let mut theirs: Vec<&str> = other.field_names().collect();
        mine.sort_unstable();
        theirs.sort_unstable();
        mine == theirs
    }
}

/// Persisted per-collection record: declared indexes and document count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionMetadata {
    pub name: String,
    pub indexes: Vec<IndexModel>,
    pub document_count: i64,
}

impl CollectionMetadata {
    /// Default metadata for a collection with no persisted record:
    /// only the autogenerated `_id_` index, zero documents.
    pub fn synthesized(name: &str) -> Self {
        Self {
            name: name.to_string(),
            indexes: vec![IndexModel::id_index()],
            document_count: 0,
        }
    }
}
