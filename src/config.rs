//! Configuration module

use std::env;
use std::path::PathBuf;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// Database connection URL; records stay in memory when unset
    pub database_url: Option<String>,

    /// Heart disease gradient boosting model (JSON export)
    pub heart_model_path: PathBuf,

    /// Scaler fit alongside the heart disease model
    pub heart_scaler_path: PathBuf,

    /// Car price random forest model (JSON export)
    pub car_price_model_path: PathBuf,

    /// Directory holding recommendations_<lang>.json files
    pub recommendations_dir: PathBuf,

    /// Language used when a request asks for an unknown one
    pub default_lang: String,

    /// Environment (development, production)
    pub environment: String,

    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let path = |key: &str, default: &str| PathBuf::from(lookup(key).unwrap_or_else(|| default.to_string()));

        Self {
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),

            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),

            heart_model_path: path("HEART_MODEL_PATH", "models/heart_disease/gradient_boosting_model.json"),

            heart_scaler_path: path("HEART_SCALER_PATH", "models/heart_disease/scaler.json"),

            car_price_model_path: path("CAR_PRICE_MODEL_PATH", "models/price_pilot/random_forest_model.json"),

            recommendations_dir: path("RECOMMENDATIONS_DIR", "recommendations"),

            default_lang: lookup("DEFAULT_LANG").unwrap_or_else(|| "en".to_string()),

            environment: lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),

            log_format: match lookup("LOG_FORMAT").as_deref() {
                Some("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
