//! API Configuration
//!
//! Loaded from an optional TOML file and `MAVUNO__*` environment variables,
//! e.g. `MAVUNO__BIND_ADDR=127.0.0.1:9000`.

use crate::rate_limit::RateLimitConfig;
use data_cleaner::CleaningConfig;
use inference_engine::TrainerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::Level;
use yield_analytics::TrendPolicy;

/// Default config file looked up when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "mavuno.toml";

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Listen address
    pub bind_addr: String,
    /// Raw production CSV cleaned at startup
    pub data_path: PathBuf,
    /// Directory holding `model.json` and `descriptor.json`
    pub model_dir: PathBuf,
    /// trace, debug, info, warn or error
    pub log_level: String,
    /// Prediction history retention
    pub history_capacity: usize,
    pub rate_limit: RateLimitConfig,
    pub cleaning: CleaningConfig,
    pub trend: TrendPolicy,
    pub trainer: TrainerConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5000".to_string(),
            data_path: PathBuf::from("data/kenya_only.csv"),
            model_dir: PathBuf::from("models"),
            log_level: "info".to_string(),
            history_capacity: 10_000,
            rate_limit: RateLimitConfig::default(),
            cleaning: CleaningConfig::default(),
            trend: TrendPolicy::default(),
            trainer: TrainerConfig::default(),
        }
    }
}

impl ApiConfig {
    /// Load configuration. An explicit path must exist; the default file is
    /// optional.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        config::Config::builder()
            .add_source(file)
            .add_source(config::Environment::with_prefix("MAVUNO").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// Parsed log level, INFO when unrecognized
    pub fn level(&self) -> Level {
        self.log_level.parse().unwrap_or(Level::INFO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.bind_addr, "0.0.0.0:5000");
        assert_eq!(config.level(), Level::INFO);
        assert_eq!(config.trend.increasing_above, 0.2);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mavuno.toml");
        std::fs::write(
            &path,
            r#"
bind_addr = "127.0.0.1:8088"
log_level = "debug"

[cleaning]
country = "uganda"

[trend]
increasing_above = 0.5
decreasing_below = -0.5
"#,
        )
        .unwrap();

        let config = ApiConfig::load(Some(&path)).unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:8088");
        assert_eq!(config.level(), Level::DEBUG);
        assert_eq!(config.cleaning.country.as_deref(), Some("uganda"));
        assert_eq!(config.cleaning.min_year, 2000);
        assert_eq!(config.trend.increasing_above, 0.5);
        assert_eq!(config.model_dir, PathBuf::from("models"));
    }

    #[test]
    fn test_explicit_missing_file_fails() {
        assert!(ApiConfig::load(Some(Path::new("/nonexistent/mavuno.toml"))).is_err());
    }
}
