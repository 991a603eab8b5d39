//! # propsql
//!
//! Compiles declarative mappings of clinical propositions onto relational
//! tables into dialect-specific SQL, runs it with bounded retries and decodes
//! the rows back into typed propositions.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │     Specification (entities, column chains, staging)     │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [staging, aliaser, clause builders]
//! ┌─────────────────────────────────────────────────────────┐
//! │            SELECT statement + result layout              │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [retrying executor]
//! ┌─────────────────────────────────────────────────────────┐
//! │                   Forward-only cursor                    │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [streaming decoder]
//! ┌─────────────────────────────────────────────────────────┐
//! │        Constants / Events / Primitive parameters         │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod backend;
pub mod config;
pub mod decode;
pub mod error;
pub mod exec;
pub mod generate;
pub mod spec;
pub mod sql;

pub use sql::dialect;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::backend::{ExecOptions, RelationalBackend};
    pub use crate::decode::{Proposition, ResultStream, UniqueId};
    pub use crate::dialect::{Dialect, SqlDialect};
    pub use crate::error::{Error, Result};
    pub use crate::exec::{ConnectionProvider, SqliteProvider};
    pub use crate::generate::{GeneratedQuery, QueryRequest, SqlGenerator};
    pub use crate::spec::{
        BackendSpec, Bound, ColumnSpec, Comparator, EntityKind, EntitySpec, Filter, Granularity,
        JoinSpec, PositionFilter, PropertySpec, PropertyValueFilter, PropositionIdSource, Side,
        StagingSpec, Value, ValueType,
    };
    pub use crate::sql::{JoinType, SortDir};
}

pub use backend::{ExecOptions, RelationalBackend};
pub use error::{Error, Result};
pub use generate::{QueryRequest, SqlGenerator};
pub use sql::Dialect;
