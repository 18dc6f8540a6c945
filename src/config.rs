// src/config.rs

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

pub const DEFAULT_BASE_URL: &str = "https://data.worldbank.org";
pub const DEFAULT_BOOTSTRAP_COUNTRY: &str = "Afghanistan";

/// Run configuration. Every field has a default so a YAML file only needs to
/// mention what it overrides.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub cache_path: PathBuf,
    pub db_path: PathBuf,
    pub catalog_path: PathBuf,
    pub bootstrap_country: String,
    /// Stop after this many countries were stored successfully.
    pub max_countries: Option<usize>,
    /// Country documents fetched concurrently. Storage stays sequential.
    pub concurrency: usize,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_path: PathBuf::from("fp_cache.json"),
            db_path: PathBuf::from("indicators.duckdb"),
            catalog_path: PathBuf::from("catalog.json"),
            bootstrap_country: DEFAULT_BOOTSTRAP_COUNTRY.to_string(),
            max_countries: None,
            concurrency: 4,
            timeout_secs: 30,
            user_agent: concat!("wdiscraper/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Config {
    /// Load a YAML config file; missing keys fall back to defaults.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text =
            fs::read_to_string(path).with_context(|| format!("reading config {:?}", path))?;
        serde_yaml::from_str(&text).with_context(|| format!("parsing config {:?}", path))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
