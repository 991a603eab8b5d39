//! WHERE clause.
//!
//! Predicates are ANDed in a fixed order:
//!
//! 1. column constraints along the chains
//! 2. key id restriction
//! 3. request filters that apply to the entity, or to an entity spec it
//!    references
//! 4. proposition id restriction
//!
//! Dialect differences (IN list chunking, literal spelling) are left to the
//! serializer, so the predicate tree is the same for every dialect.

use std::collections::HashSet;

use super::literal::{key_expr, position_expr, value_expr};
use super::select::RolePositions;
use super::Sources;
use crate::spec::{
    Comparator, Constraint, EntityKind, EntitySpec, Filter, Mappings, PositionFilter,
    PropertySpec, PropertyValueFilter, PropositionIdSource, Side, SpecError, SpecResult, Value,
    WILDCARD,
};
use crate::sql::{and_all, lit_str, Expr, ExprExt};

/// A property of a referenced entity spec read by one request filter.
#[derive(Debug, Clone, Copy)]
pub struct ReferencedProperty<'q> {
    /// Index of the filter in the request.
    pub filter: usize,
    pub entity: &'q EntitySpec,
    pub property: &'q PropertySpec,
    /// Read-column position of the property chain.
    pub position: usize,
}

/// Inputs shared by every predicate of one query.
pub struct WhereClause<'q, 'a> {
    pub entity: &'q EntitySpec,
    pub sources: &'q Sources<'a>,
    pub roles: &'q RolePositions,
    /// Requested proposition ids, already intersected with the entity's.
    pub requested: &'q [String],
    pub referenced: &'q [ReferencedProperty<'q>],
}

impl WhereClause<'_, '_> {
    /// Build the ANDed predicate, `None` when nothing restricts the query.
    pub fn build(&self, filters: &[Filter], key_ids: &[String]) -> SpecResult<Option<Expr>> {
        let mut predicates: Vec<Expr> = Vec::new();

        for predicate in self.constraint_predicates()? {
            if !predicates.contains(&predicate) {
                predicates.push(predicate);
            }
        }

        if !key_ids.is_empty() {
            let values = key_ids
                .iter()
                .map(|k| key_expr(k, self.entity.key_type()))
                .collect::<SpecResult<Vec<_>>>()?;
            predicates.push(self.sources.column_expr(self.roles.key)?.in_list(values));
        }

        for (i, filter) in filters.iter().enumerate() {
            if !filter.applies_to(self.entity.prop_ids()) {
                let referenced = self.referenced.iter().find(|r| r.filter == i);
                if let (Filter::PropertyValue(f), Some(r)) = (filter, referenced) {
                    let column = self.sources.column_expr(r.position)?;
                    predicates.push(value_predicate(r.entity, r.property, column, f)?);
                }
                continue;
            }
            let predicate = match filter {
                Filter::Position(f) => self.position_predicates(f)?,
                Filter::PropertyValue(f) => vec![self.property_predicate(f)?],
            };
            predicates.extend(predicate);
        }

        if let Some(predicate) = self.prop_id_predicate()? {
            predicates.push(predicate);
        }

        Ok(and_all(predicates))
    }

    fn constraint_predicates(&self) -> SpecResult<Vec<Expr>> {
        let mut predicates = Vec::new();
        for (pos, link) in self.sources.links().iter().enumerate() {
            let Some(constraint) = link.constraint() else {
                continue;
            };
            let column = self.sources.column_expr(pos)?;
            let predicate = match constraint {
                Constraint::Like(pattern) => column.like(lit_str(pattern), None),
                Constraint::Compare { comparator, values } => {
                    let values = values.iter().map(value_expr).collect::<SpecResult<Vec<_>>>()?;
                    compare(column, *comparator, values)?
                }
            };
            predicates.push(predicate);
        }
        Ok(predicates)
    }

    fn position_predicates(&self, filter: &PositionFilter) -> SpecResult<Vec<Expr>> {
        if self.entity.kind() == EntityKind::Constant {
            return Ok(vec![]);
        }
        let Some(start) = self.roles.start else {
            return Ok(vec![]);
        };
        let column_for = |side: Side| match side {
            Side::Start => start,
            Side::Finish => self.roles.finish.unwrap_or(start),
        };
        let format = self.entity.position_format();
        let interval = filter.interval()?;

        let mut predicates = Vec::new();
        if let (Some(bound), Some(min_start)) = (filter.start(), interval.min_start) {
            let column = self.sources.column_expr(column_for(bound.side))?;
            predicates.push(column.gte(position_expr(min_start, format)?));
        }
        if let (Some(bound), Some(max_finish)) = (filter.finish(), interval.max_finish) {
            let column = self.sources.column_expr(column_for(bound.side))?;
            predicates.push(column.lte(position_expr(max_finish, format)?));
        }
        Ok(predicates)
    }

    fn property_predicate(&self, filter: &PropertyValueFilter) -> SpecResult<Expr> {
        let entity = self.entity;
        let index = entity
            .properties()
            .iter()
            .position(|p| p.name == filter.property())
            .ok_or_else(|| {
                SpecError::request(
                    entity.name(),
                    format!("no property named '{}'", filter.property()),
                )
            })?;
        let column = self.sources.column_expr(self.roles.properties[index])?;
        value_predicate(entity, &entity.properties()[index], column, filter)
    }

    fn prop_id_predicate(&self) -> SpecResult<Option<Expr>> {
        let entity = self.entity;
        if self.requested.len() == entity.prop_ids().len() {
            return Ok(None);
        }
        let Some(pos) = self.roles.prop_id else {
            return Ok(None);
        };
        let column = self.sources.column_expr(pos)?;
        let requested: HashSet<&str> = self.requested.iter().map(String::as_str).collect();

        match entity.prop_id_source() {
            PropositionIdSource::Fixed => Ok(None),
            PropositionIdSource::Column(_) => {
                let ids = self.requested.iter().map(|id| lit_str(id)).collect();
                Ok(Some(column.in_list(ids)))
            }
            PropositionIdSource::CaseMapped { mappings, .. }
            | PropositionIdSource::CodeTable { mappings, .. } => {
                let wildcard_requested = mappings
                    .wildcard_target()
                    .is_some_and(|t| requested.contains(t));
                let codes: Vec<Expr> = mappings
                    .entries()
                    .iter()
                    .filter(|(code, target)| {
                        code != WILDCARD && requested.contains(target.as_str()) != wildcard_requested
                    })
                    .map(|(code, _)| lit_str(code))
                    .collect();

                if wildcard_requested {
                    // Everything except codes of unrequested ids.
                    Ok((!codes.is_empty()).then(|| column.not_in_list(codes)))
                } else {
                    Ok(Some(column.in_list(codes)))
                }
            }
        }
    }
}

/// Predicate of a property value filter on `column`, which reads `property`
/// of `entity`.
fn value_predicate(
    entity: &EntitySpec,
    property: &PropertySpec,
    column: Expr,
    filter: &PropertyValueFilter,
) -> SpecResult<Expr> {
    let Some(mappings) = &property.mappings else {
        let values = filter
            .values()
            .iter()
            .map(value_expr)
            .collect::<SpecResult<Vec<_>>>()?;
        return compare(column, filter.comparator(), values);
    };

    // Property values are mapping targets; the column holds the codes.
    let targets: Vec<String> = filter.values().iter().map(|v| v.to_string()).collect();
    let comparator = filter.comparator();
    let wildcard = mappings
        .wildcard_target()
        .is_some_and(|t| targets.iter().any(|v| v == t));

    if comparator.is_membership() {
        // Every code not listed for another target decodes to the wildcard's
        // target, so matching it means excluding the other targets' codes.
        let (negated, codes) = if wildcard {
            (
                !comparator.is_negated(),
                codes_where(mappings, |t| !targets.iter().any(|v| v == t)),
            )
        } else {
            (comparator.is_negated(), codes_of(mappings, &targets))
        };
        let comparator = match (negated, codes.len() == 1) {
            (false, true) => Comparator::EqualTo,
            (false, false) => Comparator::In,
            (true, true) => Comparator::NotEqualTo,
            (true, false) => Comparator::NotIn,
        };
        let literals = codes.iter().map(|c| lit_str(c)).collect();
        return compare(column, comparator, literals);
    }

    let codes = codes_of(mappings, &targets);
    if wildcard || codes.len() != 1 {
        return Err(SpecError::request(
            entity.name(),
            format!(
                "{:?} on coded property '{}' needs exactly one matching code",
                comparator,
                filter.property()
            ),
        ));
    }
    compare(column, comparator, vec![lit_str(codes[0])])
}

/// Listed codes of `targets`, in target order, without duplicates.
fn codes_of<'m>(mappings: &'m Mappings, targets: &[String]) -> Vec<&'m str> {
    let mut codes: Vec<&str> = Vec::new();
    for target in targets {
        for code in mappings.codes_for(target) {
            if code != WILDCARD && !codes.contains(&code) {
                codes.push(code);
            }
        }
    }
    codes
}

/// Listed codes whose target satisfies `keep`, in declaration order.
fn codes_where(mappings: &Mappings, keep: impl Fn(&str) -> bool) -> Vec<&str> {
    mappings
        .entries()
        .iter()
        .filter(|(code, target)| code != WILDCARD && keep(target))
        .map(|(code, _)| code.as_str())
        .collect()
}

/// Apply a comparator to already-canonicalized literal values.
fn compare(column: Expr, comparator: Comparator, mut values: Vec<Expr>) -> SpecResult<Expr> {
    if comparator.is_multi_valued() {
        return Ok(match comparator {
            Comparator::NotIn => column.not_in_list(values),
            _ => column.in_list(values),
        });
    }
    if values.len() != 1 {
        return Err(SpecError::InvalidFilter(format!(
            "{:?} takes one value, got {}",
            comparator,
            values.len()
        )));
    }
    let value = values.remove(0);
    Ok(match comparator {
        Comparator::EqualTo => column.eq(value),
        Comparator::NotEqualTo => column.ne(value),
        Comparator::LessThan => column.lt(value),
        Comparator::LessThanOrEqualTo => column.lte(value),
        Comparator::GreaterThan => column.gt(value),
        Comparator::GreaterThanOrEqualTo => column.gte(value),
        Comparator::In | Comparator::NotIn => unreachable!("handled above"),
    })
}

/// Convenience for tests and callers holding plain values.
pub fn compare_values(column: Expr, comparator: Comparator, values: &[Value]) -> SpecResult<Expr> {
    let values = values.iter().map(value_expr).collect::<SpecResult<Vec<_>>>()?;
    compare(column, comparator, values)
}
