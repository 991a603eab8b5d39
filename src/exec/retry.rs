//! Retrying executor.
//!
//! One attempt acquires a connection, validates it, makes it read-only and
//! executes the statement on a cursor. A failed attempt is retried after a
//! fixed backoff while budget remains and the policy calls the error
//! retriable. The cursor of the successful attempt goes to the caller, who
//! closes it.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};

use super::connection::{ConnectionProvider, Cursor};
use super::error::{ExecError, ExecResult, ReadError};

static SKIP_EXECUTION: AtomicBool = AtomicBool::new(false);

/// Turn process-wide skip-execution on or off.
///
/// While on, every executor returns an empty result without touching its
/// connection provider.
pub fn set_skip_execution(skip: bool) {
    SKIP_EXECUTION.store(skip, Ordering::SeqCst);
}

pub fn skip_execution() -> bool {
    SKIP_EXECUTION.load(Ordering::SeqCst)
}

type RetriablePredicate = Arc<dyn Fn(&ExecError) -> bool + Send + Sync>;

/// How many times to retry, how long to wait between attempts and which
/// errors are worth retrying.
#[derive(Clone)]
pub struct RetryPolicy {
    pub retries: u32,
    pub backoff: Duration,
    retriable: RetriablePredicate,
}

impl RetryPolicy {
    pub fn new(retries: u32, backoff: Duration) -> Self {
        Self {
            retries,
            backoff,
            retriable: Arc::new(ExecError::is_retriable),
        }
    }

    /// Replace the retriable-error predicate.
    pub fn with_predicate(
        mut self,
        predicate: impl Fn(&ExecError) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.retriable = Arc::new(predicate);
        self
    }

    pub fn is_retriable(&self, error: &ExecError) -> bool {
        (self.retriable)(error)
    }

    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500))
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("retries", &self.retries)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

/// Outcome of a successful run.
pub struct Execution {
    /// `None` when execution was skipped.
    pub cursor: Option<Box<dyn Cursor>>,
    pub attempts: u32,
}

impl fmt::Debug for Execution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Execution")
            .field("cursor", &self.cursor.as_ref().map(|_| "<cursor>"))
            .field("attempts", &self.attempts)
            .finish()
    }
}

/// Runs statements through a [`ConnectionProvider`] with retries.
pub struct RetryingExecutor {
    provider: Arc<dyn ConnectionProvider>,
    policy: RetryPolicy,
    skip_execution: bool,
}

impl RetryingExecutor {
    pub fn new(provider: Arc<dyn ConnectionProvider>, policy: RetryPolicy) -> Self {
        Self {
            provider,
            policy,
            skip_execution: false,
        }
    }

    /// Skip execution for this executor only.
    pub fn with_skip_execution(mut self, skip: bool) -> Self {
        self.skip_execution = skip;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn execute(&self, sql: &str, fetch_size: usize) -> Result<Execution, ReadError> {
        if self.skip_execution || skip_execution() {
            info!("execution skipped; returning an empty result");
            return Ok(Execution {
                cursor: None,
                attempts: 0,
            });
        }

        let max_attempts = self.policy.max_attempts();
        let mut errors = Vec::new();

        for attempt in 1..=max_attempts {
            debug!("query attempt {} of {}", attempt, max_attempts);
            match self.attempt(sql, fetch_size) {
                Ok(cursor) => {
                    return Ok(Execution {
                        cursor: Some(cursor),
                        attempts: attempt,
                    })
                }
                Err(error) => {
                    warn!("query attempt {} of {} failed: {}", attempt, max_attempts, error);
                    let retriable = self.policy.is_retriable(&error);
                    errors.push(error);
                    if !retriable || attempt == max_attempts {
                        break;
                    }
                    if !self.policy.backoff.is_zero() {
                        thread::sleep(self.policy.backoff);
                    }
                }
            }
        }

        Err(ReadError::new(errors))
    }

    fn attempt(&self, sql: &str, fetch_size: usize) -> ExecResult<Box<dyn Cursor>> {
        let mut connection = self.provider.acquire()?;
        if let Err(error) = connection
            .validate()
            .and_then(|()| connection.set_read_only())
        {
            self.provider.release(connection);
            return Err(error);
        }
        connection.open_cursor(sql, fetch_size)
    }
}
