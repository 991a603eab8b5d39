//! Statement execution.
//!
//! - [`connection`] - the connection capability the executor is handed
//! - [`retry`] - retrying executor and the skip-execution switch
//! - [`sqlite`] - `rusqlite` implementation of the capability

pub mod connection;
pub mod error;
pub mod retry;
pub mod sqlite;

pub use connection::{Connection, ConnectionProvider, Cursor, MemoryCursor, Row, SqlValue};
pub use error::{ExecError, ExecResult, ReadError};
pub use retry::{set_skip_execution, skip_execution, Execution, RetryPolicy, RetryingExecutor};
pub use sqlite::SqliteProvider;
