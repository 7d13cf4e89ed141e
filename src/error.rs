//! Error taxonomy for the place index and search paths.
//!
//! Search APIs return partial result sets rather than failing on a single
//! bad record; only call-level argument problems surface to the caller.
//! Schema mismatches are handled internally by rebuilding the index and
//! never appear here.

use crate::dataset::EntityKind;

#[derive(Debug, thiserror::Error)]
pub enum PlaceError {
    /// A required call-level argument was empty or unusable. Never swallowed.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// A referenced entity could not be resolved into usable geometry.
    /// Recovered locally (skip + log) everywhere except the single-entity
    /// region constructors, which surface it to their direct caller.
    #[error("geometry unavailable for {kind} {id}")]
    GeometryUnavailable { kind: EntityKind, id: i64 },

    /// A tag value failed numeric parsing. Callers skip the entity.
    #[error("malformed value {value:?} for tag {key:?}")]
    MalformedTagValue { key: &'static str, value: String },

    #[error("place store: {0}")]
    Store(#[from] sled::Error),

    #[error("place row encoding: {0}")]
    Encoding(#[from] serde_json::Error),
}
