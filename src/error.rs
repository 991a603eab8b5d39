//! Crate-wide error type.

use thiserror::Error;

use crate::config::{ConfigError, ConnectionError, SettingsError};
use crate::decode::DecodeError;
use crate::exec::{ExecError, ReadError};
use crate::spec::SpecError;

/// Result type for top-level operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Spec(#[from] SpecError),

    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

impl Error {
    /// Whether the error came from bad configuration or a bad request, as
    /// opposed to the database or its data.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::Spec(_) | Error::Settings(_) | Error::Config(_) | Error::Connection(_)
        )
    }
}
