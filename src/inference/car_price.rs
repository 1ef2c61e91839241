//! Car price predictor

use std::path::Path;

use super::features::{FeatureVector, CAR_PRICE_FEATURES};
use super::tree::{Objective, TreeEnsemble};
use super::{ModelError, PredictionError};
use crate::models::CarPriceInput;

/// Random forest regressor over raw (unscaled) car features
pub struct CarPricePredictor {
    model: TreeEnsemble,
}

impl CarPricePredictor {
    pub fn load(model_path: impl AsRef<Path>) -> Result<Self, ModelError> {
        tracing::info!("Loading car price model from: {}", model_path.as_ref().display());
        let predictor = Self::new(TreeEnsemble::from_file(model_path)?)?;
        tracing::info!("Car price model loaded ({} trees)", predictor.model.n_trees());
        Ok(predictor)
    }

    pub fn new(model: TreeEnsemble) -> Result<Self, ModelError> {
        if model.objective() != Objective::Regression {
            return Err(ModelError::Malformed(
                "car price model must be a regression ensemble".to_string(),
            ));
        }
        model.check_layout(CAR_PRICE_FEATURES)?;
        Ok(Self { model })
    }

    /// Features in model order; anything missing counts as 0
    pub fn feature_vector(input: &CarPriceInput) -> Result<FeatureVector, PredictionError> {
        let int = |v: Option<i64>| v.map(|v| v as f64).unwrap_or(0.0);
        let float = |v: Option<f64>| v.unwrap_or(0.0);

        FeatureVector::new(
            CAR_PRICE_FEATURES,
            vec![
                int(input.year),
                int(input.power),
                float(input.combined_consumption),
                float(input.mileage),
                int(input.num_doors),
                int(input.num_seats),
                float(input.length),
            ],
        )
    }

    pub fn predict(&self, input: &CarPriceInput) -> Result<f64, PredictionError> {
        let features = Self::feature_vector(input)?;
        self.model.predict(features.values())
    }
}
