//! Heart disease predictor
//!
//! Gradient boosting classifier over standardized inputs. The label is the
//! sign of the log-odds margin; attributions are TreeSHAP values in the
//! same margin space.

use std::path::Path;

use serde::Serialize;

use super::features::{FeatureVector, HEART_FEATURES};
use super::scaler::StandardScaler;
use super::tree::{Objective, TreeEnsemble};
use super::{ModelError, PredictionError};
use crate::models::HeartInput;

/// Signed contribution of one feature to a single prediction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribution {
    pub feature_name: &'static str,
    pub shap_value: f64,
}

pub struct HeartDiseasePredictor {
    model: TreeEnsemble,
    scaler: StandardScaler,
}

impl HeartDiseasePredictor {
    /// Load model and scaler artifacts from disk
    pub fn load(model_path: impl AsRef<Path>, scaler_path: impl AsRef<Path>) -> Result<Self, ModelError> {
        tracing::info!("Loading heart disease model from: {}", model_path.as_ref().display());
        let model = TreeEnsemble::from_file(model_path)?;
        let scaler = StandardScaler::from_file(scaler_path)?;
        let predictor = Self::new(model, scaler)?;
        tracing::info!("Heart disease model loaded ({} trees)", predictor.model.n_trees());
        Ok(predictor)
    }

    /// Pair a model with its scaler, checking both against the layout
    pub fn new(model: TreeEnsemble, scaler: StandardScaler) -> Result<Self, ModelError> {
        if model.objective() != Objective::BinaryLogistic {
            return Err(ModelError::Malformed(
                "heart disease model must be a binary_logistic ensemble".to_string(),
            ));
        }
        model.check_layout(HEART_FEATURES)?;
        scaler.check_layout(HEART_FEATURES)?;
        Ok(Self { model, scaler })
    }

    /// Raw features in model order
    pub fn feature_vector(input: &HeartInput) -> Result<FeatureVector, PredictionError> {
        FeatureVector::new(
            HEART_FEATURES,
            vec![
                input.age as f64,
                input.sex as f64,
                input.cp as f64,
                input.trestbps as f64,
                input.chol as f64,
                input.fbs as f64,
                input.restecg as f64,
                input.thalach as f64,
                input.exang as f64,
                input.oldpeak,
                input.slope as f64,
                input.ca as f64,
                input.thal as f64,
            ],
        )
    }

    /// Log-odds of heart disease
    pub fn margin(&self, input: &HeartInput) -> Result<f64, PredictionError> {
        let features = Self::feature_vector(input)?;
        let scaled = self.scaler.transform(features.values())?;
        self.model.predict(&scaled)
    }

    /// Risk label: 1 when the positive class is more likely, else 0
    pub fn predict(&self, input: &HeartInput) -> Result<u8, PredictionError> {
        let margin = self.margin(input)?;
        Ok(u8::from(margin > 0.0))
    }

    /// Per-feature contributions, in feature layout order
    pub fn explain(&self, input: &HeartInput) -> Result<Vec<Attribution>, PredictionError> {
        let features = Self::feature_vector(input)?;
        let scaled = self.scaler.transform(features.values())?;
        let values = self.model.shap_values(&scaled)?;

        Ok(features
            .layout()
            .iter()
            .zip(values)
            .map(|(&feature_name, shap_value)| Attribution { feature_name, shap_value })
            .collect())
    }

    /// Margin predicted before looking at any feature
    pub fn expected_value(&self) -> f64 {
        self.model.expected_value()
    }
}
