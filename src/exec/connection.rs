//! Connection capability.
//!
//! The executor never opens database connections itself. It is handed a
//! [`ConnectionProvider`] and drives connections and cursors through these
//! traits, so any driver (or a test double) can sit behind it.

use std::collections::VecDeque;
use std::fmt;

use chrono::NaiveDateTime;

use super::error::ExecResult;
use crate::sql::dialect::helpers::TIMESTAMP_LAYOUT;

/// A column value as returned by a driver.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Timestamp(NaiveDateTime),
    Bytes(Vec<u8>),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Textual form of a non-null value.
    ///
    /// Integral reals print without a fraction so that `42.0` read from a
    /// numeric key column matches the id `42`.
    pub fn to_text(&self) -> Option<String> {
        match self {
            SqlValue::Null => None,
            SqlValue::Integer(i) => Some(i.to_string()),
            SqlValue::Real(r) if r.fract() == 0.0 && r.abs() < 9.0e15 => {
                Some((*r as i64).to_string())
            }
            SqlValue::Real(r) => Some(ryu::Buffer::new().format(*r).to_string()),
            SqlValue::Text(s) => Some(s.clone()),
            SqlValue::Timestamp(t) => Some(t.format(TIMESTAMP_LAYOUT).to_string()),
            SqlValue::Bytes(b) => Some(String::from_utf8_lossy(b).into_owned()),
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_text() {
            Some(text) => write!(f, "{}", text),
            None => write!(f, "NULL"),
        }
    }
}

impl From<i64> for SqlValue {
    fn from(i: i64) -> Self {
        SqlValue::Integer(i)
    }
}

impl From<f64> for SqlValue {
    fn from(r: f64) -> Self {
        SqlValue::Real(r)
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::Text(s.to_string())
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(SqlValue::Null, Into::into)
    }
}

/// One result row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: Vec<SqlValue>,
}

impl Row {
    pub fn new(values: Vec<SqlValue>) -> Self {
        Self { values }
    }

    pub fn get(&self, index: usize) -> Option<&SqlValue> {
        self.values.get(index)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<T: Into<SqlValue>> FromIterator<T> for Row {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

/// Hands out connections.
pub trait ConnectionProvider: Send + Sync {
    fn acquire(&self) -> ExecResult<Box<dyn Connection>>;

    /// Return a connection that will not be used for a query.
    fn release(&self, connection: Box<dyn Connection>) {
        drop(connection);
    }
}

/// A single database connection.
pub trait Connection: Send {
    fn validate(&mut self) -> ExecResult<()>;

    fn set_read_only(&mut self) -> ExecResult<()>;

    /// Execute `sql` on a forward-only cursor that owns this connection.
    fn open_cursor(self: Box<Self>, sql: &str, fetch_size: usize) -> ExecResult<Box<dyn Cursor>>;
}

/// Forward-only rows of one executed statement.
pub trait Cursor: Send {
    /// The next row, `None` once exhausted.
    fn next_row(&mut self) -> ExecResult<Option<Row>>;

    /// Release the statement and the connection. Calling it again does nothing.
    fn close(&mut self) -> ExecResult<()>;
}

/// Cursor over rows already in memory.
#[derive(Debug, Default)]
pub struct MemoryCursor {
    rows: VecDeque<ExecResult<Row>>,
    closed: bool,
}

impl MemoryCursor {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows: rows.into_iter().map(Ok).collect(),
            closed: false,
        }
    }

    /// Fail with `error` after the rows already queued.
    pub fn then_fail(mut self, error: super::ExecError) -> Self {
        self.rows.push_back(Err(error));
        self
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Cursor for MemoryCursor {
    fn next_row(&mut self) -> ExecResult<Option<Row>> {
        if self.closed {
            return Ok(None);
        }
        self.rows.pop_front().transpose()
    }

    fn close(&mut self) -> ExecResult<()> {
        self.closed = true;
        self.rows.clear();
        Ok(())
    }
}
