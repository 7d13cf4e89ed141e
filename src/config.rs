//! Optional TOML configuration for the binaries. Every field has a
//! built-in default, so running without a config file is fine.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::index::SizeConfig;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub place_sizes: SizeConfig,
    pub store: StoreConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Seconds between a write and the debounced background flush.
    pub flush_delay_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { flush_delay_secs: 60 }
    }
}

impl StoreConfig {
    pub fn flush_delay(&self) -> Duration {
        Duration::from_secs(self.flush_delay_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: crate::search::DEFAULT_MAX_RESULTS,
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.store.flush_delay_secs, 60);
        assert_eq!(config.search.max_results, 20);
        assert_eq!(config.place_sizes.city, 0.40);
    }

    #[test]
    fn test_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [place_sizes]
            city = 0.5

            [search]
            max_results = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.place_sizes.city, 0.5);
        assert_eq!(config.place_sizes.town, 0.20); // default preserved
        assert_eq!(config.search.max_results, 5);
        assert_eq!(config.store.flush_delay_secs, 60);
    }
}
