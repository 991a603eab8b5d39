//! FROM clause with one JOIN per alias reached through a join.

use super::Sources;
use crate::spec::{SpecError, SpecResult};
use crate::sql::{ExprExt, Join, TableRef};

/// `FROM root a1` followed by `[LEFT OUTER] JOIN t aN ON (aP.from = aN.to)`
/// for each fresh alias, in first-appearance order.
pub fn build_from(sources: &Sources<'_>) -> SpecResult<(TableRef, Vec<Join>)> {
    let links = sources.links();
    let mut from: Option<TableRef> = None;
    let mut joins = Vec::new();

    for (pos, link) in links.iter().enumerate() {
        if !sources.aliaser().is_first_use(pos) {
            continue;
        }

        let mut table = TableRef::new(link.table_name()).with_alias(&sources.alias(pos)?);
        if let Some(schema) = link.schema() {
            table = table.with_schema(schema);
        }

        if pos == 0 {
            from = Some(table);
            continue;
        }

        let join = links[pos - 1].join().ok_or_else(|| {
            SpecError::InvalidValue(format!(
                "{} is not reachable from the root table",
                link.qualified_table()
            ))
        })?;
        let on = sources
            .key_expr(pos - 1, join.from_key())?
            .eq(sources.key_expr(pos, join.to_key())?);
        joins.push(Join {
            join_type: join.join_type(),
            table,
            on,
        });
    }

    let from = from.ok_or_else(|| SpecError::InvalidValue("query reads no tables".into()))?;
    Ok((from, joins))
}
