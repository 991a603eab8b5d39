//! Composite unique identifiers.

use std::fmt;

use serde::Serialize;

/// An entity name plus the ordered values of its unique-id columns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct UniqueId {
    pub entity_spec: String,
    pub db_ids: Vec<String>,
}

impl UniqueId {
    pub fn new(entity_spec: impl Into<String>, db_ids: Vec<String>) -> Self {
        Self {
            entity_spec: entity_spec.into(),
            db_ids,
        }
    }
}

impl fmt::Display for UniqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.entity_spec, self.db_ids.join(", "))
    }
}
