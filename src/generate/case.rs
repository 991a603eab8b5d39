//! CASE projection translating stored codes to proposition ids.

use super::literal::like_code;
use crate::spec::{Mappings, WILDCARD};
use crate::sql::{lit_null, lit_str, Expr};

/// `CASE WHEN col LIKE 'code' THEN 'propId' ... [ELSE 'propId'] END`.
///
/// Entries keep their declaration order and are restricted to the requested
/// proposition ids. A wildcard entry becomes the ELSE branch. Rows whose code
/// matches nothing come back NULL.
pub fn case_expr(column: &Expr, mappings: &Mappings, requested: &[String]) -> Expr {
    let is_requested = |target: &str| requested.iter().any(|r| r == target);

    let when_clauses: Vec<(Expr, Expr)> = mappings
        .entries()
        .iter()
        .filter(|(code, target)| code != WILDCARD && is_requested(target))
        .map(|(code, target)| (like_code(column.clone(), code), lit_str(target)))
        .collect();

    let else_clause = mappings
        .wildcard_target()
        .filter(|t| is_requested(t))
        .map(|t| Box::new(lit_str(t)));

    match (when_clauses.is_empty(), else_clause) {
        (true, Some(else_expr)) => *else_expr,
        (true, None) => lit_null(),
        (false, else_clause) => Expr::Case {
            when_clauses,
            else_clause,
        },
    }
}
