//! Staging substitution.
//!
//! Rewrites chain links on a replaced table to the staging table, for
//! entities inside a staging spec's entity set. The read column and the join
//! keys belonging to a rewritten link take the staged column names.

use crate::spec::{ColumnSpec, JoinSpec, StagingSpec};

/// Rewrite `chain` for `entity` against every staging spec.
///
/// Links on the staging table itself are never rewritten again, so applying
/// the pass twice gives the same chain as applying it once.
pub fn apply_staging(chain: &ColumnSpec, entity: &str, staging: &[StagingSpec]) -> ColumnSpec {
    let applicable: Vec<&StagingSpec> = staging.iter().filter(|s| s.applies_to(entity)).collect();
    if applicable.is_empty() {
        return chain.clone();
    }
    rewrite(chain.clone(), entity, &applicable)
}

fn staging_for<'a>(link: &ColumnSpec, staging: &[&'a StagingSpec]) -> Option<&'a StagingSpec> {
    staging
        .iter()
        .copied()
        .find(|s| link.is_table(s.replaced().schema.as_deref(), &s.replaced().table))
}

fn rewrite(mut link: ColumnSpec, entity: &str, staging: &[&StagingSpec]) -> ColumnSpec {
    let own = staging_for(&link, staging);
    let join = link.take_join();

    if let Some(spec) = own {
        let area = spec.staging_area();
        link.set_table(area.schema.clone(), area.table.clone());
        let column = link.column().map(|c| spec.column_name(c, entity).to_string());
        link.set_column(column);
    }

    match join {
        None => link,
        Some(join) => {
            let (from_key, to_key, join_type, next) = join.into_parts();
            let from_key = match own {
                Some(spec) => spec.column_name(&from_key, entity).to_string(),
                None => from_key,
            };
            let to_key = match staging_for(&next, staging) {
                Some(spec) => spec.column_name(&to_key, entity).to_string(),
                None => to_key,
            };
            let next = rewrite(next, entity, staging);
            link.with_join(JoinSpec::new(&from_key, &to_key, join_type, next))
        }
    }
}
