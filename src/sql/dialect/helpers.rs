//! Shared helper functions for SQL dialect implementations.
//!
//! This module provides reusable building blocks that dialects can compose
//! to implement the `SqlDialect` trait with minimal duplication.

use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;

static PLAIN_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_$]*$").unwrap());

/// Timestamp layout shared by every dialect's literal body.
pub const TIMESTAMP_LAYOUT: &str = "%Y-%m-%d %H:%M:%S%.3f";

// =============================================================================
// Identifier Quoting
// =============================================================================

/// Quote identifier with double quotes (ANSI style).
pub fn quote_double(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Leave plain identifiers bare, double-quote everything else.
///
/// Oracle folds bare identifiers to upper case, so quoting a plain
/// lower-case name would change which object it resolves to.
/// Used by: Default, Oracle
pub fn quote_double_if_needed(ident: &str) -> String {
    if PLAIN_IDENTIFIER.is_match(ident) {
        ident.to_string()
    } else {
        quote_double(ident)
    }
}

// =============================================================================
// String Quoting
// =============================================================================

/// Quote string with single quotes (standard SQL).
/// Used by: All dialects
pub fn quote_string_single(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

// =============================================================================
// Boolean Formatting
// =============================================================================

/// Format boolean as literal TRUE/FALSE.
/// Used by: Default
pub fn format_bool_literal(b: bool) -> &'static str {
    if b {
        "TRUE"
    } else {
        "FALSE"
    }
}

/// Format boolean as numeric 1/0.
/// Used by: Oracle (no boolean type in SQL before 23c)
pub fn format_bool_numeric(b: bool) -> &'static str {
    if b {
        "1"
    } else {
        "0"
    }
}

// =============================================================================
// Timestamp Literals
// =============================================================================

/// `TIMESTAMP 'YYYY-MM-DD HH:MM:SS.fff'`
/// Used by: Default
pub fn format_timestamp_ansi(ts: &NaiveDateTime) -> String {
    format!("TIMESTAMP '{}'", ts.format(TIMESTAMP_LAYOUT))
}

/// `TO_TIMESTAMP('YYYY-MM-DD HH:MM:SS.fff', 'YYYY-MM-DD HH24:MI:SS.FF3')`
/// Used by: Oracle
pub fn format_timestamp_oracle(ts: &NaiveDateTime) -> String {
    format!(
        "TO_TIMESTAMP('{}', 'YYYY-MM-DD HH24:MI:SS.FF3')",
        ts.format(TIMESTAMP_LAYOUT)
    )
}

/// `'YYYY-MM-DD HH:MM:SS.fff'`, the text form dates are stored in.
/// Used by: SQLite
pub fn format_timestamp_text(ts: &NaiveDateTime) -> String {
    quote_string_single(&ts.format(TIMESTAMP_LAYOUT).to_string())
}
