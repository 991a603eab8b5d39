//! Oracle SQL dialect.
//!
//! Oracle differs from ANSI in ways that matter for generated queries:
//! - An IN list holds at most 1000 expressions (ORA-01795)
//! - Table aliases must not be preceded by `AS`
//! - No boolean literals in SQL, use 1/0
//! - Timestamp literals go through `TO_TIMESTAMP` with an explicit mask

use chrono::NaiveDateTime;

use super::helpers;
use super::SqlDialect;

/// Largest IN list Oracle accepts.
pub const ORACLE_MAX_IN_LIST: usize = 1000;

/// Oracle SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Oracle;

impl SqlDialect for Oracle {
    fn name(&self) -> &'static str {
        "oracle"
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_numeric(b)
    }

    fn format_timestamp_literal(&self, ts: &NaiveDateTime) -> String {
        helpers::format_timestamp_oracle(ts)
    }

    fn supports_table_alias_as(&self) -> bool {
        false
    }

    fn max_in_list_len(&self) -> Option<usize> {
        Some(ORACLE_MAX_IN_LIST)
    }
}
