//! SQLite connection provider.
//!
//! `rusqlite` rows borrow their statement, which borrows the connection, so
//! a cursor cannot own all three and still hand rows out one at a time. The
//! statement instead runs on a reader thread that owns the connection and
//! pushes rows into a channel bounded by the fetch size. Dropping the
//! receiver stops the reader at its next send.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::thread::{self, JoinHandle};

use rusqlite::types::ValueRef;
use rusqlite::OpenFlags;

use super::connection::{Connection, ConnectionProvider, Cursor, Row, SqlValue};
use super::error::{ExecError, ExecResult};

/// Opens a new read-only SQLite connection per acquire. The database file
/// must exist.
#[derive(Debug, Clone)]
pub struct SqliteProvider {
    path: PathBuf,
}

impl SqliteProvider {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConnectionProvider for SqliteProvider {
    fn acquire(&self) -> ExecResult<Box<dyn Connection>> {
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = rusqlite::Connection::open_with_flags(&self.path, flags)
            .map_err(|e| ExecError::Acquire(format!("{}: {}", self.path.display(), e)))?;
        Ok(Box::new(SqliteConnection { conn }))
    }
}

struct SqliteConnection {
    conn: rusqlite::Connection,
}

impl Connection for SqliteConnection {
    fn validate(&mut self) -> ExecResult<()> {
        self.conn
            .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map(|_| ())
            .map_err(|e| ExecError::Validate(e.to_string()))
    }

    fn set_read_only(&mut self) -> ExecResult<()> {
        self.conn
            .execute_batch("PRAGMA query_only = ON")
            .map_err(|e| ExecError::ReadOnly(e.to_string()))
    }

    fn open_cursor(self: Box<Self>, sql: &str, fetch_size: usize) -> ExecResult<Box<dyn Cursor>> {
        let conn = self.conn;
        let sql = sql.to_string();
        let (tx, rx) = sync_channel(fetch_size.max(1));

        let handle = thread::Builder::new()
            .name("propsql-sqlite-reader".into())
            .spawn(move || pump(&conn, &sql, &tx))
            .map_err(|e| ExecError::Execute(format!("failed to start reader: {}", e)))?;

        let mut cursor = SqliteCursor {
            receiver: Some(rx),
            handle: Some(handle),
            done: false,
        };
        match cursor.recv() {
            Ok(Message::Ready) => Ok(Box::new(cursor)),
            Ok(Message::Failed(error)) => {
                cursor.done = true;
                let _ = cursor.close();
                Err(error)
            }
            Ok(_) | Err(_) => {
                let _ = cursor.close();
                Err(ExecError::Execute("reader stopped before the statement ran".into()))
            }
        }
    }
}

enum Message {
    Ready,
    Row(Row),
    Failed(ExecError),
    Done,
}

/// Reader thread body. Errors before the first row count as execution
/// failures; later ones as fetch failures.
fn pump(conn: &rusqlite::Connection, sql: &str, tx: &SyncSender<Message>) {
    let mut stmt = match conn.prepare(sql) {
        Ok(stmt) => stmt,
        Err(e) => {
            let _ = tx.send(Message::Failed(ExecError::Execute(e.to_string())));
            return;
        }
    };
    let columns = stmt.column_count();
    let mut rows = match stmt.query([]) {
        Ok(rows) => rows,
        Err(e) => {
            let _ = tx.send(Message::Failed(ExecError::Execute(e.to_string())));
            return;
        }
    };

    let mut ready = false;
    loop {
        let message = match rows.next() {
            Ok(Some(row)) => match convert(row, columns) {
                Ok(row) => Message::Row(row),
                Err(e) => Message::Failed(ExecError::Fetch(e.to_string())),
            },
            Ok(None) => Message::Done,
            Err(e) if !ready => Message::Failed(ExecError::Execute(e.to_string())),
            Err(e) => Message::Failed(ExecError::Fetch(e.to_string())),
        };

        if !ready {
            if matches!(message, Message::Failed(_)) {
                let _ = tx.send(message);
                return;
            }
            ready = true;
            if tx.send(Message::Ready).is_err() {
                return;
            }
        }

        let last = !matches!(message, Message::Row(_));
        if tx.send(message).is_err() || last {
            return;
        }
    }
}

fn convert(row: &rusqlite::Row<'_>, columns: usize) -> rusqlite::Result<Row> {
    (0..columns)
        .map(|i| {
            row.get_ref(i).map(|value| match value {
                ValueRef::Null => SqlValue::Null,
                ValueRef::Integer(i) => SqlValue::Integer(i),
                ValueRef::Real(r) => SqlValue::Real(r),
                ValueRef::Text(t) => SqlValue::Text(String::from_utf8_lossy(t).into_owned()),
                ValueRef::Blob(b) => SqlValue::Bytes(b.to_vec()),
            })
        })
        .collect::<rusqlite::Result<Vec<_>>>()
        .map(Row::new)
}

struct SqliteCursor {
    receiver: Option<Receiver<Message>>,
    handle: Option<JoinHandle<()>>,
    done: bool,
}

impl SqliteCursor {
    fn recv(&self) -> Result<Message, ()> {
        match &self.receiver {
            Some(rx) => rx.recv().map_err(|_| ()),
            None => Err(()),
        }
    }
}

impl Cursor for SqliteCursor {
    fn next_row(&mut self) -> ExecResult<Option<Row>> {
        if self.done {
            return Ok(None);
        }
        match self.recv() {
            Ok(Message::Row(row)) => Ok(Some(row)),
            Ok(Message::Done) | Ok(Message::Ready) => {
                self.done = true;
                Ok(None)
            }
            Ok(Message::Failed(error)) => {
                self.done = true;
                Err(error)
            }
            Err(()) => {
                self.done = true;
                Err(ExecError::Fetch("reader thread ended unexpectedly".into()))
            }
        }
    }

    fn close(&mut self) -> ExecResult<()> {
        self.done = true;
        // Unblocks a reader waiting on a full channel.
        self.receiver.take();
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| ExecError::Close("reader thread panicked".into())),
            None => Ok(()),
        }
    }
}

impl Drop for SqliteCursor {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
