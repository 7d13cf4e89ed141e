//! Persistent place index.
//!
//! Administrative places (cities and suburbs) are reduced to named
//! bounding regions and stored durably so address queries don't have to
//! rescan the whole dataset. The index is fully derivable from the source
//! map: on any schema mismatch it is dropped and rebuilt, never migrated.

pub mod estimate;
pub mod indexer;
pub mod store;

pub use estimate::{PlaceSizeEstimator, SizeConfig};
pub use indexer::{IndexOutcome, IndexStats, PlaceIndexer};
pub use store::{IndexedPlace, PlaceCategory, PlaceStore, StoreOptions};
