//! SQLite dialect.
//!
//! SQLite has no date-time type: dates live in TEXT columns in the canonical
//! `YYYY-MM-DD HH:MM:SS.fff` layout, so timestamp literals are plain strings
//! in that layout and compare as text. There are no boolean literals before
//! 3.23, so booleans are 1/0 like every other integer column.

use chrono::NaiveDateTime;

use super::helpers;
use super::SqlDialect;

/// SQLite dialect.
#[derive(Debug, Clone, Copy)]
pub struct Sqlite;

impl SqlDialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_numeric(b)
    }

    fn format_timestamp_literal(&self, ts: &NaiveDateTime) -> String {
        helpers::format_timestamp_text(ts)
    }
}
