//! Query assembly.
//!
//! [`SqlGenerator`] is the only public way to obtain SQL for an entity. It
//! runs staging, flattening, aliasing and every clause builder, then
//! serializes the statement for its dialect.
//!
//! A property filter naming proposition ids of an entity spec that the
//! queried entity references is read through that entity's property chain.
//! A chain starting at the referenced entity's own table is grafted onto the
//! end of the reference chain; one starting at the queried entity's base
//! table is used as is. Either way it is flattened after the entity's own
//! chains, so links it shares with a reference chain reuse its aliases.

use log::debug;
use serde::Serialize;

use super::from::build_from;
use super::order_by::build_order_by;
use super::select::{build_select, ResultLayout, RolePositions};
use super::staging::apply_staging;
use super::where_clause::{ReferencedProperty, WhereClause};
use super::Sources;
use crate::spec::staging::check_overlap;
use crate::spec::{
    BackendSpec, ColumnSpec, EntitySpec, Filter, PropertySpec, SpecError, SpecResult,
    StagingSpec,
};
use crate::sql::{Dialect, Query, SortDir};

/// What to read from an entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRequest {
    /// Proposition ids wanted; intersected with the entity's ids.
    pub prop_ids: Vec<String>,
    pub filters: Vec<Filter>,
    /// Restrict to these key ids; empty reads every key.
    pub key_ids: Vec<String>,
    /// Direction for the time columns; key order is always ascending.
    pub order: Option<SortDir>,
}

impl QueryRequest {
    pub fn new<S: Into<String>>(prop_ids: impl IntoIterator<Item = S>) -> Self {
        Self {
            prop_ids: prop_ids.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_filter(mut self, filter: impl Into<Filter>) -> Self {
        self.filters.push(filter.into());
        self
    }

    pub fn with_key_ids<S: Into<String>>(mut self, key_ids: impl IntoIterator<Item = S>) -> Self {
        self.key_ids = key_ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_order(mut self, order: SortDir) -> Self {
        self.order = Some(order);
        self
    }
}

/// A serialized statement and how to read its rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedQuery {
    pub entity: String,
    pub sql: String,
    pub layout: ResultLayout,
    /// Requested ids that the entity can produce, in declaration order.
    pub prop_ids: Vec<String>,
}

/// Generates one SELECT per entity and request.
#[derive(Debug, Clone, Default)]
pub struct SqlGenerator {
    dialect: Dialect,
    staging: Vec<StagingSpec>,
}

impl SqlGenerator {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            staging: Vec::new(),
        }
    }

    /// A generator applying the staging specs of `backend`, which were
    /// checked for overlap when it was built.
    pub fn for_backend(dialect: Dialect, backend: &BackendSpec) -> Self {
        Self {
            dialect,
            staging: backend.staging().to_vec(),
        }
    }

    /// Apply `staging` before aliasing. Fails when two specs replace the
    /// same table for the same entity spec.
    pub fn with_staging(mut self, staging: Vec<StagingSpec>) -> SpecResult<Self> {
        check_overlap(&staging)?;
        self.staging = staging;
        Ok(self)
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn generate(&self, entity: &EntitySpec, request: &QueryRequest) -> SpecResult<GeneratedQuery> {
        self.generate_with(entity, &[], request)
    }

    /// Generate with the entity specs that `entity` references at hand, so
    /// that filters on their properties can be applied.
    pub fn generate_with(
        &self,
        entity: &EntitySpec,
        referenced: &[&EntitySpec],
        request: &QueryRequest,
    ) -> SpecResult<GeneratedQuery> {
        let requested: Vec<String> = entity
            .prop_ids()
            .iter()
            .filter(|id| request.prop_ids.contains(id))
            .cloned()
            .collect();
        if requested.is_empty() {
            return Err(SpecError::request(
                entity.name(),
                "none of the requested proposition ids belong to this entity",
            ));
        }

        let filtered = referenced_properties(entity, referenced, &request.filters)?;

        let mut staged: Vec<ColumnSpec> = entity
            .chains()
            .into_iter()
            .map(|(_, chain)| apply_staging(chain, entity.name(), &self.staging))
            .collect();
        let own = staged.len();
        for found in &filtered {
            let tail = apply_staging(&found.property.column, found.entity.name(), &self.staging);
            staged.push(match found.via {
                Some(reference) => apply_staging(reference, entity.name(), &self.staging).graft(tail),
                None => tail,
            });
        }
        let chains: Vec<&ColumnSpec> = staged.iter().collect();
        let (sources, ends) = Sources::new(&chains);
        let roles = role_positions(entity, &ends);
        let referenced: Vec<ReferencedProperty<'_>> = filtered
            .iter()
            .zip(&ends[own..])
            .map(|(found, &position)| ReferencedProperty {
                filter: found.filter,
                entity: found.entity,
                property: found.property,
                position,
            })
            .collect();

        let (select, layout) = build_select(entity, &sources, &roles, &requested)?;
        let (from, joins) = build_from(&sources)?;
        let where_clause = WhereClause {
            entity,
            sources: &sources,
            roles: &roles,
            requested: &requested,
            referenced: &referenced,
        }
        .build(&request.filters, &request.key_ids)?;
        let order_by = build_order_by(&sources, &roles, request.order)?;

        let mut query = Query::new().select(select).from(from);
        for join in joins {
            query = query.join(join.join_type, join.table, join.on);
        }
        if let Some(predicate) = where_clause {
            query = query.filter(predicate);
        }
        let query = query.order_by(order_by);

        let sql = query.to_sql(self.dialect);
        debug!("generated SQL for {}:\n{}", entity.name(), sql);

        Ok(GeneratedQuery {
            entity: entity.name().to_string(),
            sql,
            layout,
            prop_ids: requested,
        })
    }
}

struct Referenced<'e> {
    filter: usize,
    entity: &'e EntitySpec,
    property: &'e PropertySpec,
    /// Reference chain the property chain is grafted onto.
    via: Option<&'e ColumnSpec>,
}

/// Property filters answered by a referenced entity spec rather than the
/// queried one, with the chain each is read through.
fn referenced_properties<'e>(
    entity: &'e EntitySpec,
    referenced: &[&'e EntitySpec],
    filters: &'e [Filter],
) -> SpecResult<Vec<Referenced<'e>>> {
    let mut found = Vec::new();
    for (i, filter) in filters.iter().enumerate() {
        let Filter::PropertyValue(f) = filter else {
            continue;
        };
        if filter.applies_to(entity.prop_ids()) {
            continue;
        }
        let other = referenced.iter().copied().find(|other| {
            entity.references().iter().any(|r| r.entity == other.name())
                && filter.applies_to(other.prop_ids())
        });
        let Some(other) = other else {
            continue;
        };

        let property = other.property(f.property()).ok_or_else(|| {
            SpecError::request(other.name(), format!("no property named '{}'", f.property()))
        })?;
        let via = if property.column.same_table(entity.base()) {
            None
        } else {
            let reference = entity
                .references()
                .iter()
                .filter(|r| r.entity == other.name())
                .flat_map(|r| r.unique_ids.iter())
                .find(|chain| chain.last().same_table(&property.column));
            match reference {
                Some(chain) => Some(chain),
                None => {
                    return Err(SpecError::request(
                        entity.name(),
                        format!(
                            "property '{}' of '{}' is not reachable from {}",
                            property.name,
                            other.name(),
                            entity.base().qualified_table()
                        ),
                    ))
                }
            }
        };
        found.push(Referenced {
            filter: i,
            entity: other,
            property,
            via,
        });
    }
    Ok(found)
}

/// Split per-chain end positions back into roles, following the order of
/// [`EntitySpec::chains`].
fn role_positions(entity: &EntitySpec, ends: &[usize]) -> RolePositions {
    let mut at = 0;
    let mut take = |n: usize| {
        let slice = ends[at..at + n].to_vec();
        at += n;
        slice
    };

    let key = take(1)[0];
    let unique_ids = take(entity.unique_ids().len());
    let prop_id = entity.prop_id_source().column().map(|_| take(1)[0]);
    let start = entity.start().map(|_| take(1)[0]);
    let finish = entity.finish().map(|_| take(1)[0]);
    let value = entity.value().map(|_| take(1)[0]);
    let properties = take(entity.properties().len());
    let references = entity
        .references()
        .iter()
        .map(|r| take(r.unique_ids.len()))
        .collect();

    RolePositions {
        key,
        unique_ids,
        prop_id,
        start,
        finish,
        value,
        properties,
        references,
    }
}
