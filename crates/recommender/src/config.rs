//! Service configuration
//!
//! Layering, lowest precedence first:
//! 1. Built-in defaults
//! 2. `config/recommender.{toml,yaml,json}` (optional)
//! 3. `RECOMMENDER__*` environment variables, e.g. `RECOMMENDER__ENGINE__MAX_TOP_N=50`
//!
//! `.env` is loaded with dotenvy by the binary before `load` runs.

use crate::cold_start::ColdStartPolicy;
use crate::observability::LogFormat;
use crate::error::EngineResult;
use crate::types::RatingRange;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

fn invalid(key: &'static str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key,
        message: message.into(),
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RecommenderConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub engine: EngineConfig,
    pub feedback: FeedbackConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    /// Operational endpoints only (/health, /ready)
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8090,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelConfig {
    /// bincode factor snapshot written by the training job
    pub factors_path: PathBuf,
    /// MovieLens u.data ratings
    pub ratings_path: PathBuf,
    /// MovieLens u.item catalog
    pub catalog_path: PathBuf,
    /// How often to check the factor file for a new snapshot; 0 disables reload
    pub reload_interval_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            factors_path: PathBuf::from("models/factors.bin"),
            ratings_path: PathBuf::from("data/u.data"),
            catalog_path: PathBuf::from("data/u.item"),
            reload_interval_secs: 60,
        }
    }
}

impl ModelConfig {
    pub fn reload_interval(&self) -> Option<Duration> {
        (self.reload_interval_secs > 0).then(|| Duration::from_secs(self.reload_interval_secs))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    pub min_rating: f64,
    pub max_rating: f64,
    pub default_top_n: usize,
    pub max_top_n: usize,
    /// 0 = fully personalized, 100 = fully fairness-driven
    pub default_fairness_preference: f64,
    /// Ratings at or above this are "liked" in simple explanations
    pub liked_threshold: f64,
    pub cold_start_policy: ColdStartPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_rating: 0.5,
            max_rating: 5.0,
            default_top_n: 10,
            max_top_n: 100,
            default_fairness_preference: 0.0,
            liked_threshold: 4.0,
            cold_start_policy: ColdStartPolicy::PopularityFallback,
        }
    }
}

impl EngineConfig {
    /// Fails when the configured bounds are inverted, equal, or not finite
    pub fn rating_range(&self) -> EngineResult<RatingRange> {
        RatingRange::new(self.min_rating, self.max_rating)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackBackend {
    Jsonl,
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FeedbackConfig {
    pub backend: FeedbackBackend,
    /// Used by the jsonl backend
    pub path: PathBuf,
    /// Used by the postgres backend
    pub database_url: Option<String>,
    pub max_connections: u32,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            backend: FeedbackBackend::Jsonl,
            path: PathBuf::from("data/explanation_feedback.jsonl"),
            database_url: None,
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
        }
    }
}

impl RecommenderConfig {
    /// Load configuration from config file and environment
    pub fn load() -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("config/recommender").required(false))
            .add_source(
                config::Environment::with_prefix("RECOMMENDER")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let engine = &self.engine;

        engine
            .rating_range()
            .map_err(|e| invalid("engine.min_rating", e.to_string()))?;

        if engine.max_top_n == 0 {
            return Err(invalid("engine.max_top_n", "must be greater than 0"));
        }
        if engine.default_top_n == 0 || engine.default_top_n > engine.max_top_n {
            return Err(invalid(
                "engine.default_top_n",
                format!("must be within [1, {}]", engine.max_top_n),
            ));
        }
        if !(0.0..=100.0).contains(&engine.default_fairness_preference) {
            return Err(invalid(
                "engine.default_fairness_preference",
                "must be within [0, 100]",
            ));
        }
        if !engine.liked_threshold.is_finite() {
            return Err(invalid("engine.liked_threshold", "must be finite"));
        }

        match self.feedback.backend {
            FeedbackBackend::Postgres if self.feedback.database_url.is_none() => {
                return Err(invalid(
                    "feedback.database_url",
                    "required when feedback.backend = \"postgres\"",
                ));
            }
            FeedbackBackend::Postgres if self.feedback.max_connections == 0 => {
                return Err(invalid("feedback.max_connections", "must be greater than 0"));
            }
            _ => {}
        }

        Ok(())
    }
}
