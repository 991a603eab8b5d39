//! Decoded domain objects.

use std::collections::BTreeMap;

use serde::Serialize;

use super::unique_id::UniqueId;
use crate::spec::{EntityKind, Granularity, Value};

/// Fields every proposition carries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropositionData {
    pub id: String,
    pub unique_id: UniqueId,
    pub key_id: String,
    pub properties: BTreeMap<String, Value>,
    /// Referenced unique ids by reference name.
    pub references: BTreeMap<String, Vec<UniqueId>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Constant {
    #[serde(flatten)]
    pub data: PropositionData,
}

/// Something that happened over an interval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    #[serde(flatten)]
    pub data: PropositionData,
    pub start: i64,
    pub finish: Option<i64>,
    pub granularity: Option<Granularity>,
}

/// A value observed at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrimitiveParameter {
    #[serde(flatten)]
    pub data: PropositionData,
    pub position: i64,
    pub value: Option<Value>,
    pub granularity: Option<Granularity>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Proposition {
    Constant(Constant),
    Event(Event),
    PrimitiveParameter(PrimitiveParameter),
}

impl Proposition {
    pub fn data(&self) -> &PropositionData {
        match self {
            Proposition::Constant(p) => &p.data,
            Proposition::Event(p) => &p.data,
            Proposition::PrimitiveParameter(p) => &p.data,
        }
    }

    fn data_mut(&mut self) -> &mut PropositionData {
        match self {
            Proposition::Constant(p) => &mut p.data,
            Proposition::Event(p) => &mut p.data,
            Proposition::PrimitiveParameter(p) => &mut p.data,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Proposition::Constant(_) => EntityKind::Constant,
            Proposition::Event(_) => EntityKind::Event,
            Proposition::PrimitiveParameter(_) => EntityKind::PrimitiveParameter,
        }
    }

    pub fn id(&self) -> &str {
        &self.data().id
    }

    pub fn unique_id(&self) -> &UniqueId {
        &self.data().unique_id
    }

    pub fn key_id(&self) -> &str {
        &self.data().key_id
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.data().properties.get(name)
    }

    pub fn references(&self, name: &str) -> &[UniqueId] {
        self.data()
            .references
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Whether `other` decodes the same object from another row.
    pub fn is_same_object(&self, other: &Proposition) -> bool {
        self.id() == other.id() && self.unique_id() == other.unique_id()
    }

    /// Add the reference ids of `other` that this object does not have yet.
    pub fn merge_references(&mut self, other: Proposition) {
        let references = &mut self.data_mut().references;
        for (name, ids) in other.data().references.iter() {
            let existing = references.entry(name.clone()).or_default();
            for id in ids {
                if !existing.contains(id) {
                    existing.push(id.clone());
                }
            }
        }
    }
}
