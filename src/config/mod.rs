//! Configuration module for propsql.
//!
//! Handles connection configuration, environment variables, settings and
//! backend specification files.

mod connection;
mod settings;
mod spec_file;

pub use connection::{ConnectionConfig, ConnectionError, Driver};
pub use settings::{
    expand_env_vars, ConnectionSettings, ExecutorSettings, MappingSettings, Settings,
    SettingsError, SqlSettings,
};
pub use spec_file::{load_backend_spec, parse_backend_spec, ConfigError};
