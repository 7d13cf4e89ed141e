//! Heuristic bounding-box sizes for center-node places.
//!
//! A place known only as a tagged node has no geometry to bound, so we
//! synthesize a square sized by its category. This is a deliberately
//! coarse approximation; its only job is to give city/suburb lookups
//! something to intersect against.

use serde::Deserialize;

/// Half-size defaults per place category, in degrees. The documented full
/// sizes are twice these (city 0.8°, town 0.4°, village 0.2°, suburb
/// 0.17°, hamlet 0.7°, default 0.4°).
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SizeConfig {
    pub city: f64,
    pub town: f64,
    pub village: f64,
    pub suburb: f64,
    pub hamlet: f64,
    pub default: f64,
}

impl Default for SizeConfig {
    fn default() -> Self {
        Self {
            city: 0.40,
            town: 0.20,
            village: 0.10,
            suburb: 0.085,
            hamlet: 0.35,
            default: 0.20,
        }
    }
}

/// Maps a place-category tag value to an estimated bounding-box half-size.
#[derive(Debug, Clone)]
pub struct PlaceSizeEstimator {
    config: SizeConfig,
}

impl PlaceSizeEstimator {
    pub fn new(config: SizeConfig) -> Self {
        Self { config }
    }

    /// Half-size in degrees for the given category. Case-insensitive;
    /// unknown or absent categories fall back to the default.
    pub fn estimate_half_size(&self, category: Option<&str>) -> f64 {
        match category.map(str::to_ascii_lowercase).as_deref() {
            Some("city") => self.config.city,
            Some("town") => self.config.town,
            Some("village") => self.config.village,
            Some("suburb") => self.config.suburb,
            Some("hamlet") => self.config.hamlet,
            _ => self.config.default,
        }
    }
}

impl Default for PlaceSizeEstimator {
    fn default() -> Self {
        Self::new(SizeConfig::default())
    }
}
