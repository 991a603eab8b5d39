//! SQL Dialect definitions and formatting rules.
//!
//! This module provides a trait-based abstraction for SQL dialect differences.
//! Each dialect implements `SqlDialect` to handle its specific syntax:
//!
//! - Identifier quoting: bare when plain, `"` otherwise
//! - Boolean literals: TRUE/FALSE vs 1/0
//! - Timestamp literals: `TIMESTAMP '...'` vs `TO_TIMESTAMP(...)` vs `'...'`
//! - Table alias syntax: `t AS a1` vs `t a1`
//! - IN list limits: unbounded vs 1000 elements per list
//!
//! # Usage
//!
//! ```ignore
//! use propsql::dialect::{Dialect, SqlDialect};
//!
//! let dialect = Dialect::Oracle;
//! assert_eq!(dialect.max_in_list_len(), Some(1000));
//! ```

mod ansi;
pub mod helpers;
mod oracle;
mod sqlite;

pub use ansi::Ansi;
pub use oracle::{Oracle, ORACLE_MAX_IN_LIST};
pub use sqlite::Sqlite;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// SQL dialect trait - defines how SQL constructs are rendered.
///
/// Implementations handle dialect-specific syntax differences.
/// The default implementations follow ANSI SQL where possible.
pub trait SqlDialect: std::fmt::Debug {
    /// Dialect name for display/logging.
    fn name(&self) -> &'static str;

    // =========================================================================
    // Identifier and Literal Quoting
    // =========================================================================

    /// Quote an identifier (schema, table, column, alias).
    ///
    /// Plain identifiers are emitted bare so that databases which fold
    /// unquoted names (Oracle upper-cases them) resolve them normally.
    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double_if_needed(ident)
    }

    /// Quote a string literal.
    ///
    /// All dialects use single quotes with `''` for escaping.
    fn quote_string(&self, s: &str) -> String {
        helpers::quote_string_single(s)
    }

    /// Format a boolean literal.
    ///
    /// - Default: `TRUE`/`FALSE`
    /// - Oracle, SQLite: `1`/`0`
    fn format_bool(&self, b: bool) -> &'static str;

    /// Format a NULL literal.
    fn format_null(&self) -> &'static str {
        "NULL"
    }

    // =========================================================================
    // Date/Time
    // =========================================================================

    /// Format a timestamp literal with millisecond precision.
    fn format_timestamp_literal(&self, ts: &NaiveDateTime) -> String;

    // =========================================================================
    // FROM Syntax
    // =========================================================================

    /// Whether `AS` may precede a table alias.
    ///
    /// Oracle accepts `AS` for column aliases only.
    fn supports_table_alias_as(&self) -> bool {
        true
    }

    // =========================================================================
    // Predicates
    // =========================================================================

    /// Maximum number of expressions in a single IN list, if bounded.
    ///
    /// Longer lists are split into several IN groups on the same expression.
    fn max_in_list_len(&self) -> Option<usize> {
        None
    }
}

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// ANSI SQL.
    #[default]
    Default,
    /// Oracle-compatible SQL.
    Oracle,
    /// SQLite, with dates stored as text.
    Sqlite,
}

impl Dialect {
    /// Get the dialect implementation.
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            Dialect::Default => &Ansi,
            Dialect::Oracle => &Oracle,
            Dialect::Sqlite => &Sqlite,
        }
    }

    /// Parse a dialect name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "default" | "ansi" | "generic" => Some(Dialect::Default),
            "oracle" => Some(Dialect::Oracle),
            "sqlite" => Some(Dialect::Sqlite),
            _ => None,
        }
    }
}

// Implement SqlDialect for Dialect enum by delegating to concrete types
impl SqlDialect for Dialect {
    fn name(&self) -> &'static str {
        self.dialect().name()
    }

    fn quote_identifier(&self, ident: &str) -> String {
        self.dialect().quote_identifier(ident)
    }

    fn quote_string(&self, s: &str) -> String {
        self.dialect().quote_string(s)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        self.dialect().format_bool(b)
    }

    fn format_null(&self) -> &'static str {
        self.dialect().format_null()
    }

    fn format_timestamp_literal(&self, ts: &NaiveDateTime) -> String {
        self.dialect().format_timestamp_literal(ts)
    }

    fn supports_table_alias_as(&self) -> bool {
        self.dialect().supports_table_alias_as()
    }

    fn max_in_list_len(&self) -> Option<usize> {
        self.dialect().max_in_list_len()
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dialect().name())
    }
}
