//! Specification errors.

use thiserror::Error;

/// Result type for specification construction and query generation.
pub type SpecResult<T> = Result<T, SpecError>;

/// Invalid specifications, filters, mappings or requests.
///
/// These are detected eagerly, while configuration is built or before any
/// SQL reaches a database, and are never retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpecError {
    /// An entity spec failed validation.
    #[error("invalid entity spec '{entity}': {reason}")]
    InvalidEntity { entity: String, reason: String },

    /// A staging spec failed validation.
    #[error("invalid staging spec for table '{table}': {reason}")]
    InvalidStaging { table: String, reason: String },

    /// A filter failed validation.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// A code mapping resource is malformed or ambiguous.
    #[error("invalid mappings in '{resource}': {reason}")]
    InvalidMappings { resource: String, reason: String },

    /// A code mapping resource could not be found or read.
    #[error("mapping resource '{resource}' could not be loaded: {reason}")]
    MappingNotFound { resource: String, reason: String },

    /// The backend spec as a whole is inconsistent.
    #[error("invalid backend spec: {0}")]
    InvalidBackend(String),

    /// A query request does not fit the entity it targets.
    #[error("invalid request for entity '{entity}': {reason}")]
    InvalidRequest { entity: String, reason: String },

    /// A value cannot be rendered as a SQL literal.
    #[error("invalid value: {0}")]
    InvalidValue(String),
}

impl SpecError {
    pub fn entity(entity: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidEntity {
            entity: entity.into(),
            reason: reason.into(),
        }
    }

    pub fn staging(table: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidStaging {
            table: table.into(),
            reason: reason.into(),
        }
    }

    pub fn mappings(resource: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidMappings {
            resource: resource.into(),
            reason: reason.into(),
        }
    }

    pub fn request(entity: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            entity: entity.into(),
            reason: reason.into(),
        }
    }
}
