//! SQL generation.
//!
//! Turns an [`EntitySpec`](crate::spec::EntitySpec) and a [`QueryRequest`]
//! into one SELECT statement:
//!
//! ```text
//! chains ──[staging]──> staged chains ──[flatten]──> links ──[aliaser]──> aliases
//!                                                                │
//!              SELECT / FROM / WHERE / ORDER BY  <───────────────┘
//! ```
//!
//! Generation is pure: the same inputs always give byte-identical SQL.

pub mod aliaser;
pub mod assembler;
pub mod case;
pub mod from;
pub mod literal;
pub mod order_by;
pub mod select;
pub mod staging;
pub mod where_clause;

pub use aliaser::TableAliaser;
pub use assembler::{GeneratedQuery, QueryRequest, SqlGenerator};
pub use literal::{escape_like, render_literal, value_expr};
pub use select::ResultLayout;
pub use staging::apply_staging;

use crate::spec::{ColumnOp, ColumnSpec, SpecError, SpecResult};
use crate::sql::{func, table_col, Expr};

/// The flattened, aliased links of one query.
#[derive(Debug)]
pub struct Sources<'a> {
    links: Vec<&'a ColumnSpec>,
    aliaser: TableAliaser,
}

impl<'a> Sources<'a> {
    /// Flatten `chains` in order. Returns the sources and, per chain, the
    /// position of the link whose column is read.
    pub fn new(chains: &[&'a ColumnSpec]) -> (Self, Vec<usize>) {
        let mut links = Vec::new();
        let mut ends = Vec::with_capacity(chains.len());
        for &chain in chains {
            links.extend(chain.links());
            ends.push(links.len() - 1);
        }
        let aliaser = TableAliaser::new(&links);
        (Self { links, aliaser }, ends)
    }

    pub fn links(&self) -> &[&'a ColumnSpec] {
        &self.links
    }

    pub fn aliaser(&self) -> &TableAliaser {
        &self.aliaser
    }

    /// Alias of the link at `position`.
    pub fn alias(&self, position: usize) -> SpecResult<String> {
        self.aliaser
            .alias(position)
            .ok_or_else(|| SpecError::InvalidValue(format!("no table alias at position {}", position)))
    }

    /// `aN.column` of the link at `position`, with its column op applied.
    pub fn column_expr(&self, position: usize) -> SpecResult<Expr> {
        let link = self.links[position];
        let column = link.column().ok_or_else(|| {
            SpecError::InvalidValue(format!("{} link names no column", link.qualified_table()))
        })?;
        let expr = table_col(&self.alias(position)?, column);
        Ok(match link.op() {
            Some(ColumnOp::Upper) => func("upper", vec![expr]),
            None => expr,
        })
    }

    /// `aN.key` for a join key on the link at `position`.
    pub fn key_expr(&self, position: usize, key: &str) -> SpecResult<Expr> {
        Ok(table_col(&self.alias(position)?, key))
    }
}
