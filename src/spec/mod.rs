//! Specification model.
//!
//! Backend configuration is described by immutable spec objects built once
//! through validating constructors:
//!
//! - [`ColumnSpec`] / [`JoinSpec`] - chains of links from an entity's root table
//! - [`EntitySpec`] - one logical entity and the chains it reads
//! - [`StagingSpec`] - table substitutions
//! - [`Filter`] - request predicates
//! - [`Mappings`] - code translation tables
//!
//! [`BackendSpec`] ties entity and staging specs together and rejects
//! combinations that would make generated SQL ambiguous.

pub mod column;
pub mod entity;
pub mod error;
pub mod filter;
pub mod interval;
pub mod mappings;
pub mod staging;
pub mod value;

use std::collections::HashSet;
use std::sync::Arc;

pub use column::{ColumnOp, ColumnSpec, Constraint, JoinSpec};
pub use entity::{
    EntityKind, EntitySpec, EntitySpecBuilder, PositionFormat, PropertySpec, PropositionIdSource,
    ReferenceSpec,
};
pub use error::{SpecError, SpecResult};
pub use filter::{Bound, Comparator, Filter, PositionFilter, PropertyValueFilter, Side};
pub use interval::{datetime_to_position, position_to_datetime, Granularity, Interval};
pub use mappings::{DirMappingLoader, InMemoryMappingLoader, MappingLoader, Mappings, WILDCARD};
pub use staging::{StagedColumn, StagingSpec, TableSpec};
pub use value::{Value, ValueType};

/// The validated set of entity and staging specs for one backend.
#[derive(Debug, Clone, Default)]
pub struct BackendSpec {
    entities: Vec<Arc<EntitySpec>>,
    staging: Vec<StagingSpec>,
}

impl BackendSpec {
    pub fn new(entities: Vec<EntitySpec>, staging: Vec<StagingSpec>) -> SpecResult<Self> {
        let mut names = HashSet::new();
        for entity in &entities {
            if !names.insert(entity.name()) {
                return Err(SpecError::InvalidBackend(format!(
                    "duplicate entity spec '{}'",
                    entity.name()
                )));
            }
        }

        for spec in &staging {
            if let Some(unknown) = spec.entity_specs().iter().find(|e| !names.contains(e.as_str())) {
                return Err(SpecError::InvalidBackend(format!(
                    "staging spec for '{}' names unknown entity spec '{}'",
                    spec.replaced(),
                    unknown
                )));
            }
        }

        staging::check_overlap(&staging)?;

        Ok(Self {
            entities: entities.into_iter().map(Arc::new).collect(),
            staging,
        })
    }

    pub fn entities(&self) -> &[Arc<EntitySpec>] {
        &self.entities
    }

    pub fn entity(&self, name: &str) -> Option<&Arc<EntitySpec>> {
        self.entities.iter().find(|e| e.name() == name)
    }

    pub fn staging(&self) -> &[StagingSpec] {
        &self.staging
    }

    /// The entity specs `entity` references that this backend defines.
    pub fn referenced_by(&self, entity: &EntitySpec) -> Vec<&EntitySpec> {
        self.entities
            .iter()
            .filter(|e| entity.references().iter().any(|r| r.entity == e.name()))
            .map(|e| e.as_ref())
            .collect()
    }
}
