//! Inference - model artifacts and predictors
//!
//! Artifacts are JSON exports of fitted tree ensembles and standard
//! scalers. They are loaded once at startup and shared read-only between
//! requests; nothing here holds mutable state.

pub mod features;
pub mod tree;
pub mod scaler;
pub mod heart;
pub mod car_price;

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;

pub use car_price::CarPricePredictor;
pub use features::FeatureVector;
pub use heart::{Attribution, HeartDiseasePredictor};
pub use scaler::StandardScaler;
pub use tree::TreeEnsemble;

// ============================================================================
// ERRORS
// ============================================================================

/// Failure while loading or checking a model artifact
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed artifact: {0}")]
    Malformed(String),

    #[error("feature layout mismatch: expected {expected:?}, artifact has {actual:?}")]
    LayoutMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },
}

/// Failure while running a loaded model on one record
#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("expected {expected} features, got {actual}")]
    FeatureCount { expected: usize, actual: usize },

    #[error("feature {feature} is not a finite number")]
    NonFiniteInput { feature: &'static str },

    #[error("model produced a non-finite output")]
    NonFiniteOutput,
}

// ============================================================================
// HELPERS
// ============================================================================

/// Read and deserialize a JSON artifact
pub(crate) fn read_artifact<T: DeserializeOwned>(path: &Path) -> Result<T, ModelError> {
    let raw = fs::read_to_string(path).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&raw).map_err(|source| ModelError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Compare an artifact's recorded feature names with the expected layout.
/// Artifacts without names are trusted on length alone.
pub(crate) fn check_layout(expected: &[&str], actual: Option<&[String]>) -> Result<(), ModelError> {
    let Some(actual) = actual else { return Ok(()) };

    if actual.len() != expected.len() || actual.iter().zip(expected).any(|(a, e)| a != e) {
        return Err(ModelError::LayoutMismatch {
            expected: expected.iter().map(|s| s.to_string()).collect(),
            actual: actual.to_vec(),
        });
    }
    Ok(())
}
