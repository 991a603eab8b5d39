//! Row decoding errors.

use thiserror::Error;

use crate::spec::ValueType;

/// A row that could not be turned into a proposition.
///
/// Most problems affect only their own row, which is skipped. A row that
/// does not match the generated layout or a CASE column yielding an id that
/// was never requested means the query and the entity spec disagree, and the whole
/// stream stops.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("row {row}: key id is null")]
    NullKeyId { row: u64 },

    #[error("row {row}: unique id column {column} is null")]
    NullUniqueId { row: u64, column: usize },

    #[error("row {row}: proposition id is null")]
    NullPropositionId { row: u64 },

    #[error("row {row}: code '{code}' has no proposition id")]
    UnknownCode { row: u64, code: String },

    #[error("row {row}: proposition id '{prop_id}' was not requested")]
    UnexpectedPropositionId { row: u64, prop_id: String },

    #[error("row {row}: column {column} value '{value}' is not a {expected:?}")]
    InvalidValue {
        row: u64,
        column: usize,
        value: String,
        expected: ValueType,
    },

    #[error("row {row}: column {column} holds no usable position ({value})")]
    InvalidPosition { row: u64, column: usize, value: String },

    #[error("row {row}: expected at least {expected} columns, got {actual}")]
    MissingColumn { row: u64, expected: usize, actual: usize },
}

impl DecodeError {
    /// Whether the stream must stop instead of skipping the row.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::UnexpectedPropositionId { .. } | Self::MissingColumn { .. }
        )
    }
}
