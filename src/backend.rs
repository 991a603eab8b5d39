//! Relational backend: generation, execution and decoding behind two calls.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{ConnectionConfig, Settings};
use crate::decode::{ResultStream, RowDecoder};
use crate::error::Result;
use crate::exec::{ConnectionProvider, RetryPolicy, RetryingExecutor};
use crate::generate::{GeneratedQuery, QueryRequest, SqlGenerator};
use crate::spec::{BackendSpec, EntitySpec, SpecError};
use crate::sql::Dialect;

/// Per-call execution options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecOptions {
    pub fetch_size: usize,
    /// Retries after the first failed attempt.
    pub retries: u32,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            fetch_size: 1000,
            retries: 3,
        }
    }
}

/// Reads propositions for the entities of a [`BackendSpec`].
pub struct RelationalBackend {
    spec: BackendSpec,
    generator: SqlGenerator,
    provider: Arc<dyn ConnectionProvider>,
    /// Backoff and retriable predicate; the retry count comes per call.
    policy: RetryPolicy,
    skip_execution: bool,
}

impl RelationalBackend {
    pub fn new(spec: BackendSpec, dialect: Dialect, provider: Arc<dyn ConnectionProvider>) -> Self {
        let generator = SqlGenerator::for_backend(dialect, &spec);
        Self {
            spec,
            generator,
            provider,
            policy: RetryPolicy::default(),
            skip_execution: false,
        }
    }

    /// Build from settings, using the named connection or the default one.
    /// With no connections configured, `PROPSQL_DB_DRIVER` and
    /// `PROPSQL_DB_PATH` describe the database. Without a configured dialect
    /// the connection's driver decides it.
    pub fn from_settings(spec: BackendSpec, settings: &Settings, connection: Option<&str>) -> Result<Self> {
        let config = match connection {
            Some(name) => settings.get_connection(name)?.to_config()?,
            None => match settings.default_connection() {
                Some((_, conn)) => conn.to_config()?,
                None => ConnectionConfig::from_env()?,
            },
        };
        let dialect = settings.sql.dialect_for(Some(config.driver));
        let provider = config.provider()?;
        Ok(Self::new(spec, dialect, provider)
            .with_retry_policy(settings.executor.retry_policy())
            .with_skip_execution(settings.executor.skip_execution))
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.policy.backoff = backoff;
        self
    }

    /// Backoff and retriable predicate for every execution. The retry count
    /// of [`ExecOptions`] overrides the policy's.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_skip_execution(mut self, skip: bool) -> Self {
        self.skip_execution = skip;
        self
    }

    pub fn spec(&self) -> &BackendSpec {
        &self.spec
    }

    pub fn dialect(&self) -> Dialect {
        self.generator.dialect()
    }

    pub fn entity(&self, name: &str) -> Result<&Arc<EntitySpec>> {
        Ok(self
            .spec
            .entity(name)
            .ok_or_else(|| SpecError::request(name, "no such entity spec"))?)
    }

    /// Generate the statement and its row layout without running it.
    pub fn generate(&self, entity: &str, request: &QueryRequest) -> Result<GeneratedQuery> {
        let entity = self.entity(entity)?;
        let referenced = self.spec.referenced_by(entity);
        Ok(self.generator.generate_with(entity, &referenced, request)?)
    }

    pub fn generate_sql(&self, entity: &str, request: &QueryRequest) -> Result<String> {
        Ok(self.generate(entity, request)?.sql)
    }

    /// Generate, execute with retries and return a lazy stream of decoded
    /// propositions. The SQL is fully built before anything runs.
    pub fn generate_and_execute(
        &self,
        entity: &str,
        request: &QueryRequest,
        options: ExecOptions,
    ) -> Result<ResultStream> {
        let spec = Arc::clone(self.entity(entity)?);
        let query = self.generate(entity, request)?;

        let mut policy = self.policy.clone();
        policy.retries = options.retries;
        let executor = RetryingExecutor::new(Arc::clone(&self.provider), policy)
            .with_skip_execution(self.skip_execution);
        let execution = executor.execute(&query.sql, options.fetch_size)?;

        Ok(match execution.cursor {
            Some(cursor) => ResultStream::new(
                RowDecoder::new(spec, query.layout, query.prop_ids),
                cursor,
            ),
            None => ResultStream::empty(),
        })
    }
}

impl std::fmt::Debug for RelationalBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationalBackend")
            .field("entities", &self.spec.entities().len())
            .field("dialect", &self.dialect())
            .field("policy", &self.policy)
            .field("skip_execution", &self.skip_execution)
            .finish_non_exhaustive()
    }
}
