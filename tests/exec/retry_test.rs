use propsql::exec::{
    Connection, ConnectionProvider, Cursor, ExecError, ExecResult, MemoryCursor, RetryPolicy,
    RetryingExecutor, Row,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Fails the first `failures` acquisitions with the given error, then hands
/// out connections whose cursor yields `rows`.
struct FlakyProvider {
    failures: u32,
    error: ExecError,
    rows: Vec<Row>,
    attempts: AtomicU32,
    released: AtomicU32,
    sql: Mutex<Vec<String>>,
}

impl FlakyProvider {
    fn new(failures: u32, error: ExecError) -> Arc<Self> {
        Arc::new(Self {
            failures,
            error,
            rows: vec![Row::new(vec![1i64.into()])],
            attempts: AtomicU32::new(0),
            released: AtomicU32::new(0),
            sql: Mutex::new(Vec::new()),
        })
    }

    fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

struct StubConnection {
    provider: Arc<FlakyProvider>,
    read_only: bool,
}

impl Connection for StubConnection {
    fn validate(&mut self) -> ExecResult<()> {
        Ok(())
    }

    fn set_read_only(&mut self) -> ExecResult<()> {
        self.read_only = true;
        Ok(())
    }

    fn open_cursor(self: Box<Self>, sql: &str, _fetch_size: usize) -> ExecResult<Box<dyn Cursor>> {
        assert!(self.read_only, "cursor opened before read-only was set");
        self.provider.sql.lock().unwrap().push(sql.to_string());
        Ok(Box::new(MemoryCursor::new(self.provider.rows.clone())))
    }
}

struct Handle(Arc<FlakyProvider>);

impl ConnectionProvider for Handle {
    fn acquire(&self) -> ExecResult<Box<dyn Connection>> {
        let n = self.0.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if n <= self.0.failures {
            return Err(self.0.error.clone());
        }
        Ok(Box::new(StubConnection {
            provider: Arc::clone(&self.0),
            read_only: false,
        }))
    }

    fn release(&self, connection: Box<dyn Connection>) {
        self.0.released.fetch_add(1, Ordering::SeqCst);
        drop(connection);
    }
}

/// Connections that never pass validation.
struct InvalidProvider {
    released: AtomicU32,
}

struct InvalidConnection;

impl Connection for InvalidConnection {
    fn validate(&mut self) -> ExecResult<()> {
        Err(ExecError::Validate("connection reset".into()))
    }

    fn set_read_only(&mut self) -> ExecResult<()> {
        Ok(())
    }

    fn open_cursor(self: Box<Self>, _sql: &str, _fetch_size: usize) -> ExecResult<Box<dyn Cursor>> {
        panic!("cursor opened on an invalid connection");
    }
}

impl ConnectionProvider for InvalidProvider {
    fn acquire(&self) -> ExecResult<Box<dyn Connection>> {
        Ok(Box::new(InvalidConnection))
    }

    fn release(&self, connection: Box<dyn Connection>) {
        self.released.fetch_add(1, Ordering::SeqCst);
        drop(connection);
    }
}

fn executor(provider: &Arc<FlakyProvider>, retries: u32) -> RetryingExecutor {
    RetryingExecutor::new(
        Arc::new(Handle(Arc::clone(provider))),
        RetryPolicy::new(retries, Duration::ZERO),
    )
}

#[test]
fn test_first_attempt_succeeds() {
    let provider = FlakyProvider::new(0, ExecError::Acquire("down".into()));
    let mut execution = executor(&provider, 3).execute("SELECT 1", 10).unwrap();

    assert_eq!(execution.attempts, 1);
    assert_eq!(provider.attempts(), 1);
    assert_eq!(*provider.sql.lock().unwrap(), vec!["SELECT 1".to_string()]);

    let cursor = execution.cursor.as_mut().unwrap();
    assert!(cursor.next_row().unwrap().is_some());
    assert!(cursor.next_row().unwrap().is_none());
}

#[test]
fn test_succeeds_after_transient_failures() {
    let provider = FlakyProvider::new(2, ExecError::Acquire("pool exhausted".into()));
    let execution = executor(&provider, 3).execute("SELECT 1", 10).unwrap();

    assert_eq!(execution.attempts, 3);
    assert!(execution.cursor.is_some());
}

#[test]
fn test_exhausted_retries_collect_every_error() {
    let provider = FlakyProvider::new(10, ExecError::Execute("deadlock".into()));
    let err = executor(&provider, 2).execute("SELECT 1", 10).unwrap_err();

    assert_eq!(provider.attempts(), 3);
    assert_eq!(err.errors.len(), 3);
    assert!(err.errors.iter().all(|e| *e == ExecError::Execute("deadlock".into())));
    assert_eq!(err.last(), Some(&ExecError::Execute("deadlock".into())));
    assert!(err.to_string().contains("3 attempt"));
}

#[test]
fn test_zero_retries_is_one_attempt() {
    let provider = FlakyProvider::new(1, ExecError::Acquire("down".into()));
    let err = executor(&provider, 0).execute("SELECT 1", 10).unwrap_err();

    assert_eq!(provider.attempts(), 1);
    assert_eq!(err.errors.len(), 1);
}

#[test]
fn test_non_retriable_error_stops_immediately() {
    let provider = FlakyProvider::new(5, ExecError::Acquire("bad password".into()));
    let policy = RetryPolicy::new(3, Duration::ZERO)
        .with_predicate(|e| !matches!(e, ExecError::Acquire(_)));
    let err = RetryingExecutor::new(Arc::new(Handle(Arc::clone(&provider))), policy)
        .execute("SELECT 1", 10)
        .unwrap_err();

    assert_eq!(provider.attempts(), 1);
    assert_eq!(err.errors.len(), 1);
}

#[test]
fn test_failed_validation_releases_connection() {
    let provider = Arc::new(InvalidProvider {
        released: AtomicU32::new(0),
    });
    let executor = RetryingExecutor::new(
        Arc::clone(&provider) as Arc<dyn ConnectionProvider>,
        RetryPolicy::new(1, Duration::ZERO),
    );
    let err = executor.execute("SELECT 1", 10).unwrap_err();

    assert_eq!(err.errors.len(), 2);
    assert!(matches!(err.errors[0], ExecError::Validate(_)));
    assert_eq!(provider.released.load(Ordering::SeqCst), 2);
}

#[test]
fn test_per_executor_skip() {
    let provider = FlakyProvider::new(0, ExecError::Acquire("down".into()));
    let execution = executor(&provider, 3)
        .with_skip_execution(true)
        .execute("SELECT 1", 10)
        .unwrap();

    assert!(execution.cursor.is_none());
    assert_eq!(execution.attempts, 0);
    assert_eq!(provider.attempts(), 0);
}
