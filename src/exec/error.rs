//! Execution error types.

use std::fmt;

use thiserror::Error;

/// Result type for connection and cursor operations.
pub type ExecResult<T> = Result<T, ExecError>;

/// A failure at one step of running a statement.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecError {
    /// No connection could be obtained from the provider.
    #[error("failed to acquire connection: {0}")]
    Acquire(String),

    /// The connection did not pass validation.
    #[error("connection failed validation: {0}")]
    Validate(String),

    /// The connection could not be made read-only.
    #[error("failed to set connection read-only: {0}")]
    ReadOnly(String),

    /// The statement could not be prepared or executed.
    #[error("failed to execute statement: {0}")]
    Execute(String),

    /// Reading the next row failed.
    #[error("failed to fetch row: {0}")]
    Fetch(String),

    /// Releasing the statement or connection failed.
    #[error("failed to close cursor: {0}")]
    Close(String),
}

impl ExecError {
    /// Whether retrying the whole attempt can help.
    ///
    /// Every failure before the first row is retriable; a fetch or close
    /// failure happens after rows may have been handed out.
    pub fn is_retriable(&self) -> bool {
        !matches!(self, Self::Fetch(_) | Self::Close(_))
    }
}

/// Every error the executor saw before giving up, in attempt order.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct ReadError {
    pub errors: Vec<ExecError>,
}

impl ReadError {
    pub fn new(errors: Vec<ExecError>) -> Self {
        Self { errors }
    }

    /// The error of the final attempt.
    pub fn last(&self) -> Option<&ExecError> {
        self.errors.last()
    }
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "query failed after {} attempt(s)", self.errors.len())?;
        for (i, error) in self.errors.iter().enumerate() {
            write!(f, "\n  attempt {}: {}", i + 1, error)?;
        }
        Ok(())
    }
}
