//! Engine settings, read from a TOML file or defaulted.
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub database_path: PathBuf,
    pub log_level: String,
    /// Upper bound on one due queue.
    pub max_due_items: usize,
    /// Baseline response time before a session has its own average.
    pub default_avg_response_ms: f64,
    /// Attempts at which topic confidence reaches 1.0.
    pub confidence_saturation: u32,
    pub skill_cache_ttl_secs: u64,
    /// Tries per answer when a versioned write loses a race.
    pub max_write_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("learning.sqlite3"),
            log_level: "info".to_string(),
            max_due_items: crate::engine::review_queue::DEFAULT_MAX_ITEMS,
            default_avg_response_ms: 10_000.0,
            confidence_saturation: crate::engine::proficiency::DEFAULT_CONFIDENCE_SATURATION,
            skill_cache_ttl_secs: 300,
            max_write_attempts: 3,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// `RUST_LOG` wins over the configured level.
    pub fn effective_log_level(&self) -> String {
        std::env::var("RUST_LOG").unwrap_or_else(|_| self.log_level.clone())
    }
}
