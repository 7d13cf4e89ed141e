//! Alder - offline address search over OpenStreetMap data.
//!
//! Builds a persistent index of administrative place regions and answers
//! structured address queries (house number, street, city, zip) against
//! it plus a live in-memory map dataset.

pub mod config;
pub mod dataset;
pub mod error;
pub mod index;
pub mod models;
pub mod normalize;
pub mod search;

pub use config::Config;
pub use error::PlaceError;
pub use models::{GeoBounds, GeoPoint, Place, PlaceRegion};
