//! Result decoding.
//!
//! [`ResultStream`] pulls rows from a cursor and turns them into
//! [`Proposition`]s using the [`ResultLayout`](crate::generate::ResultLayout)
//! of the query that produced them.

pub mod error;
pub mod proposition;
pub mod row;
pub mod stream;
pub mod unique_id;

pub use error::DecodeError;
pub use proposition::{Constant, Event, PrimitiveParameter, Proposition, PropositionData};
pub use row::RowDecoder;
pub use stream::ResultStream;
pub use unique_id::UniqueId;
