//! ANSI SQL dialect - the Default dialect.
//!
//! Used for every database that accepts standard SQL:
//! - `TIMESTAMP '...'` literals
//! - `TRUE`/`FALSE` boolean literals
//! - `AS` before table aliases
//! - unbounded IN lists

use chrono::NaiveDateTime;

use super::helpers;
use super::SqlDialect;

/// ANSI SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Ansi;

impl SqlDialect for Ansi {
    fn name(&self) -> &'static str {
        "default"
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_literal(b)
    }

    fn format_timestamp_literal(&self, ts: &NaiveDateTime) -> String {
        helpers::format_timestamp_ansi(ts)
    }
}
