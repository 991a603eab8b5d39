//! Database connection configuration.
//!
//! Supports configuration via environment variables:
//! - `PROPSQL_DB_DRIVER`: Database driver (sqlite)
//! - `PROPSQL_DB_PATH`: Database location for the driver

use std::env;
use std::sync::Arc;

use crate::exec::{ConnectionProvider, SqliteProvider};
use crate::sql::Dialect;

/// Error type for connection configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Unsupported driver: {0}. Supported: sqlite")]
    UnsupportedDriver(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Supported database drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Driver {
    /// SQLite database file
    Sqlite,
}

impl Driver {
    /// Parse driver from string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, ConnectionError> {
        match s.to_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(Driver::Sqlite),
            other => Err(ConnectionError::UnsupportedDriver(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Driver::Sqlite => "sqlite",
        }
    }

    /// The SQL dialect this driver executes.
    pub fn dialect(&self) -> Dialect {
        match self {
            Driver::Sqlite => Dialect::Sqlite,
        }
    }
}

/// Database connection configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub driver: Driver,
    /// Driver-specific location (a file path for SQLite).
    pub connection_string: String,
}

impl ConnectionConfig {
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self {
            driver: Driver::Sqlite,
            connection_string: path.into(),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConnectionError> {
        let driver_str = env::var("PROPSQL_DB_DRIVER")
            .map_err(|_| ConnectionError::MissingEnvVar("PROPSQL_DB_DRIVER".to_string()))?;
        let driver = Driver::from_str(&driver_str)?;

        let connection_string = env::var("PROPSQL_DB_PATH")
            .map_err(|_| ConnectionError::MissingEnvVar("PROPSQL_DB_PATH".to_string()))?;

        let config = Self {
            driver,
            connection_string,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConnectionError> {
        if self.connection_string.trim().is_empty() {
            return Err(ConnectionError::InvalidConfig(format!(
                "{} connection needs a location",
                self.driver.as_str()
            )));
        }
        Ok(())
    }

    /// Build the connection provider for this configuration.
    pub fn provider(&self) -> Result<Arc<dyn ConnectionProvider>, ConnectionError> {
        self.validate()?;
        match self.driver {
            Driver::Sqlite => Ok(Arc::new(SqliteProvider::new(&self.connection_string))),
        }
    }
}
