//! Address and place search.
//!
//! The resolver orchestrates city/suburb lookups from the persistent
//! index with street and house-number resolution against the live
//! dataset.

pub mod interpolate;
pub mod resolver;

pub use interpolate::{HouseMatch, HouseNumberInterpolator, NumberingStrategy};
pub use resolver::{AddressQuery, AddressResolver, DEFAULT_MAX_RESULTS};
