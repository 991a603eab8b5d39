//! ORDER BY clause.

use super::select::RolePositions;
use super::Sources;
use crate::spec::SpecResult;
use crate::sql::{OrderByExpr, SortDir};

/// Key ascending. With a requested direction and both time columns present,
/// start then finish follow in that direction. The unique-id columns come
/// last, ascending, so every row of one object arrives in one run and the
/// decoder can merge them. A column already ordered on is not repeated.
pub fn build_order_by(
    sources: &Sources<'_>,
    roles: &RolePositions,
    order: Option<SortDir>,
) -> SpecResult<Vec<OrderByExpr>> {
    let mut order_by = vec![OrderByExpr::asc(sources.column_expr(roles.key)?)];

    if let (Some(dir), Some(start), Some(finish)) = (order, roles.start, roles.finish) {
        order_by.push(OrderByExpr::new(sources.column_expr(start)?, dir));
        order_by.push(OrderByExpr::new(sources.column_expr(finish)?, dir));
    }

    for &position in &roles.unique_ids {
        let expr = sources.column_expr(position)?;
        if !order_by.iter().any(|o| o.expr == expr) {
            order_by.push(OrderByExpr::asc(expr));
        }
    }

    Ok(order_by)
}
