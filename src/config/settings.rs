//! TOML-based configuration for propsql.
//!
//! Supports a config file (propsql.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [connections.warehouse]
//! driver = "sqlite"
//! connection_string = "${WAREHOUSE_DB}"
//!
//! [executor]
//! retries = 3
//! backoff_ms = 500
//! fetch_size = 1000
//!
//! [sql]
//! dialect = "oracle"
//!
//! [mappings]
//! dir = "./mappings"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::connection::{ConnectionConfig, Driver};
use crate::exec::RetryPolicy;
use crate::sql::Dialect;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Connection not found: {0}")]
    ConnectionNotFound(String),

    #[error("Unsupported driver: {0}")]
    UnsupportedDriver(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Named database connections.
    pub connections: HashMap<String, ConnectionSettings>,

    /// Executor configuration.
    pub executor: ExecutorSettings,

    /// SQL generation configuration.
    pub sql: SqlSettings,

    /// Code mapping configuration.
    pub mappings: MappingSettings,
}

/// Connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConnectionSettings {
    /// Database driver (sqlite).
    pub driver: String,

    /// Connection string (supports ${ENV_VAR} expansion).
    pub connection_string: String,
}

impl ConnectionSettings {
    /// Get the driver type.
    pub fn driver_type(&self) -> Result<Driver, SettingsError> {
        Driver::from_str(&self.driver)
            .map_err(|_| SettingsError::UnsupportedDriver(self.driver.clone()))
    }

    /// Get the connection string with environment variables expanded.
    pub fn resolved_connection_string(&self) -> Result<String, SettingsError> {
        expand_env_vars(&self.connection_string)
    }

    /// Resolve into a connection configuration.
    pub fn to_config(&self) -> Result<ConnectionConfig, SettingsError> {
        Ok(ConnectionConfig {
            driver: self.driver_type()?,
            connection_string: self.resolved_connection_string()?,
        })
    }
}

/// Executor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExecutorSettings {
    /// Retries after the first failed attempt.
    pub retries: u32,

    /// Fixed sleep between attempts.
    pub backoff_ms: u64,

    /// Rows buffered from the cursor at a time.
    pub fetch_size: usize,

    /// Generate SQL but never run it.
    pub skip_execution: bool,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            retries: 3,
            backoff_ms: 500,
            fetch_size: 1000,
            skip_execution: false,
        }
    }
}

impl ExecutorSettings {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retries, Duration::from_millis(self.backoff_ms))
    }
}

/// SQL generation configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SqlSettings {
    /// Target dialect: "default", "oracle" or "sqlite". Unset means the
    /// dialect of the connection's driver.
    pub dialect: Option<Dialect>,
}

impl SqlSettings {
    /// The configured dialect, else the one `driver` executes.
    pub fn dialect_for(&self, driver: Option<Driver>) -> Dialect {
        self.dialect
            .or_else(|| driver.map(|d| d.dialect()))
            .unwrap_or_default()
    }
}

/// Code mapping configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct MappingSettings {
    /// Directory holding mapping resources (supports ${ENV_VAR} expansion).
    pub dir: Option<String>,
}

impl MappingSettings {
    /// Mapping directory with environment variables expanded.
    pub fn resolved_dir(&self) -> Result<Option<PathBuf>, SettingsError> {
        self.dir
            .as_deref()
            .map(|d| expand_env_vars(d).map(PathBuf::from))
            .transpose()
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `PROPSQL_CONFIG`
    /// 2. `./propsql.toml`
    /// 3. `~/.config/propsql/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("PROPSQL_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("propsql.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("propsql").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        // Return defaults if no config file found
        Ok(Settings::default())
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.executor.fetch_size == 0 {
            return Err(SettingsError::InvalidConfig(
                "executor.fetch_size must be at least 1".into(),
            ));
        }
        for (name, conn) in &self.connections {
            conn.driver_type().map_err(|_| {
                SettingsError::UnsupportedDriver(format!("{} (connection '{}')", conn.driver, name))
            })?;
        }
        Ok(())
    }

    /// Get a connection by name.
    pub fn get_connection(&self, name: &str) -> Result<&ConnectionSettings, SettingsError> {
        self.connections
            .get(name)
            .ok_or_else(|| SettingsError::ConnectionNotFound(name.to_string()))
    }

    /// Get the default connection (first one defined, or "default" if it exists).
    pub fn default_connection(&self) -> Option<(&str, &ConnectionSettings)> {
        if let Some(conn) = self.connections.get("default") {
            return Some(("default", conn));
        }
        let mut names: Vec<&String> = self.connections.keys().collect();
        names.sort();
        names
            .first()
            .map(|name| (name.as_str(), &self.connections[*name]))
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let mut var_name = String::new();
        if chars.peek() == Some(&'{') {
            chars.next();
            for ch in chars.by_ref() {
                if ch == '}' {
                    break;
                }
                var_name.push(ch);
            }
        } else {
            // $VAR (ends at non-alphanumeric/underscore)
            while let Some(&ch) = chars.peek() {
                if !(ch.is_alphanumeric() || ch == '_') {
                    break;
                }
                var_name.push(ch);
                chars.next();
            }
            if var_name.is_empty() {
                // Just a lone $, keep it
                result.push('$');
                continue;
            }
        }

        let value =
            env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
