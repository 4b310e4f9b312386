//! Runtime configuration.
//!
//! Loaded from a TOML file; every key is optional and falls back to its
//! default.
//!
//! ```toml
//! data_dir = "data/options"
//! horizon_days = 90
//! strike_tolerance = "0.01"
//! top_volume_limit = 15
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analytics::ProjectionLimits;
use crate::chain::DEFAULT_STRIKE_TOLERANCE;
use crate::export::BOOKKEEPING_COLUMNS;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Directory of JSON record files.
    pub data_dir: PathBuf,
    /// When set, only records expiring within this many days of today are
    /// loaded into a view.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub horizon_days: Option<i64>,
    /// Maximum strike difference (exclusive) for a call and put to pair.
    pub strike_tolerance: Decimal,
    pub top_volume_limit: usize,
    pub term_structure_limit: usize,
    pub sentiment_limit: usize,
    /// Columns left out of CSV exports.
    pub bookkeeping_columns: Vec<String>,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data/options"),
            horizon_days: None,
            strike_tolerance: DEFAULT_STRIKE_TOLERANCE,
            top_volume_limit: 15,
            term_structure_limit: 12,
            sentiment_limit: 10,
            bookkeeping_columns: BOOKKEEPING_COLUMNS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl ChainConfig {
    /// Load and validate a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.strike_tolerance.is_sign_negative() {
            return Err(ConfigError::Invalid(format!(
                "strike_tolerance must not be negative, got {}",
                self.strike_tolerance
            )));
        }
        if let Some(days) = self.horizon_days {
            if days < 0 {
                return Err(ConfigError::Invalid(format!(
                    "horizon_days must not be negative, got {}",
                    days
                )));
            }
        }
        for (name, value) in [
            ("top_volume_limit", self.top_volume_limit),
            ("term_structure_limit", self.term_structure_limit),
            ("sentiment_limit", self.sentiment_limit),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{} must be at least 1", name)));
            }
        }
        Ok(())
    }

    pub fn projection_limits(&self) -> ProjectionLimits {
        ProjectionLimits {
            top_volume: self.top_volume_limit,
            term_structure: self.term_structure_limit,
            sentiment: self.sentiment_limit,
        }
    }
}
