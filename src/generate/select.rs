//! SELECT projection and the layout of the rows it produces.

use serde::Serialize;

use super::case::case_expr;
use super::Sources;
use crate::spec::{EntitySpec, PropositionIdSource, SpecResult};
use crate::sql::{Expr, SelectExpr};

/// Result column of every role in the projection, 0-based.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResultLayout {
    pub key: usize,
    pub unique_ids: Vec<usize>,
    pub prop_id: Option<usize>,
    pub start: Option<usize>,
    pub finish: Option<usize>,
    pub value: Option<usize>,
    /// `(property name, column)` in declaration order.
    pub properties: Vec<(String, usize)>,
    /// `(reference name, unique-id columns)` in declaration order.
    pub references: Vec<(String, Vec<usize>)>,
    pub column_count: usize,
}

/// Read-column positions of each role's chain within the flattened links.
#[derive(Debug, Clone, Default)]
pub struct RolePositions {
    pub key: usize,
    pub unique_ids: Vec<usize>,
    pub prop_id: Option<usize>,
    pub start: Option<usize>,
    pub finish: Option<usize>,
    pub value: Option<usize>,
    pub properties: Vec<usize>,
    pub references: Vec<Vec<usize>>,
}

/// Build the projection in role order: key, unique ids, proposition id,
/// start, finish, value, properties, reference unique ids.
pub fn build_select(
    entity: &EntitySpec,
    sources: &Sources<'_>,
    roles: &RolePositions,
    requested: &[String],
) -> SpecResult<(Vec<SelectExpr>, ResultLayout)> {
    let mut select: Vec<SelectExpr> = Vec::new();
    let mut push = |expr: Expr| {
        select.push(SelectExpr::new(expr));
        select.len() - 1
    };

    let key = push(sources.column_expr(roles.key)?);

    let mut unique_ids = Vec::with_capacity(roles.unique_ids.len());
    for &pos in &roles.unique_ids {
        unique_ids.push(push(sources.column_expr(pos)?));
    }

    let prop_id = match (entity.prop_id_source(), roles.prop_id) {
        (PropositionIdSource::CaseMapped { mappings, .. }, Some(pos)) => {
            let column = sources.column_expr(pos)?;
            Some(push(case_expr(&column, mappings, requested)))
        }
        (_, Some(pos)) => Some(push(sources.column_expr(pos)?)),
        (_, None) => None,
    };

    let start = roles.start.map(|p| sources.column_expr(p)).transpose()?.map(&mut push);
    let finish = roles.finish.map(|p| sources.column_expr(p)).transpose()?.map(&mut push);
    let value = roles.value.map(|p| sources.column_expr(p)).transpose()?.map(&mut push);

    let mut properties = Vec::with_capacity(roles.properties.len());
    for (spec, &pos) in entity.properties().iter().zip(&roles.properties) {
        properties.push((spec.name.clone(), push(sources.column_expr(pos)?)));
    }

    let mut references = Vec::with_capacity(roles.references.len());
    for (spec, positions) in entity.references().iter().zip(&roles.references) {
        let mut columns = Vec::with_capacity(positions.len());
        for &pos in positions {
            columns.push(push(sources.column_expr(pos)?));
        }
        references.push((spec.name.clone(), columns));
    }

    let layout = ResultLayout {
        key,
        unique_ids,
        prop_id,
        start,
        finish,
        value,
        properties,
        references,
        column_count: select.len(),
    };
    Ok((select, layout))
}
