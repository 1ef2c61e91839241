//! Standard scaler - training-time standardization replayed at inference

use std::path::Path;

use serde::Deserialize;

use super::{check_layout, read_artifact, ModelError, PredictionError};

/// `(x - mean) / scale`, per feature
#[derive(Debug, Clone, Deserialize)]
pub struct StandardScaler {
    #[serde(default)]
    feature_names: Option<Vec<String>>,
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let scaler: Self = read_artifact(path.as_ref())?;
        scaler.validate()?;
        Ok(scaler)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, ModelError> {
        let scaler: Self = serde_json::from_value(value)
            .map_err(|e| ModelError::Malformed(e.to_string()))?;
        scaler.validate()?;
        Ok(scaler)
    }

    fn validate(&self) -> Result<(), ModelError> {
        if self.mean.len() != self.scale.len() {
            return Err(ModelError::Malformed(format!(
                "scaler has {} means but {} scales",
                self.mean.len(),
                self.scale.len()
            )));
        }
        if self.mean.iter().chain(&self.scale).any(|v| !v.is_finite()) {
            return Err(ModelError::Malformed("scaler parameters must be finite".to_string()));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    /// Reject scalers fit on a different layout
    pub fn check_layout(&self, expected: &[&str]) -> Result<(), ModelError> {
        if self.len() != expected.len() {
            return Err(ModelError::Malformed(format!(
                "scaler covers {} features, layout has {}",
                self.len(),
                expected.len()
            )));
        }
        check_layout(expected, self.feature_names.as_deref())
    }

    pub fn transform(&self, x: &[f64]) -> Result<Vec<f64>, PredictionError> {
        if x.len() != self.len() {
            return Err(PredictionError::FeatureCount {
                expected: self.len(),
                actual: x.len(),
            });
        }

        Ok(x.iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(&v, (&mean, &scale))| {
                // constant features were fit with zero variance
                let scale = if scale == 0.0 { 1.0 } else { scale };
                (v - mean) / scale
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transform() {
        let scaler = StandardScaler::from_value(json!({
            "mean": [10.0, 0.0, 5.0],
            "scale": [2.0, 1.0, 0.0]
        }))
        .unwrap();

        let scaled = scaler.transform(&[14.0, -3.0, 7.0]).unwrap();
        assert_eq!(scaled, vec![2.0, -3.0, 2.0]);
    }

    #[test]
    fn test_rejects_mismatched_lengths() {
        let result = StandardScaler::from_value(json!({"mean": [1.0, 2.0], "scale": [1.0]}));
        assert!(matches!(result, Err(ModelError::Malformed(_))));

        let scaler = StandardScaler::from_value(json!({"mean": [1.0], "scale": [1.0]})).unwrap();
        assert!(matches!(
            scaler.transform(&[1.0, 2.0]),
            Err(PredictionError::FeatureCount { expected: 1, actual: 2 })
        ));
    }

    #[test]
    fn test_layout_check_uses_names() {
        let scaler = StandardScaler::from_value(json!({
            "feature_names": ["age", "chol"],
            "mean": [50.0, 200.0],
            "scale": [10.0, 40.0]
        }))
        .unwrap();

        assert!(scaler.check_layout(&["age", "chol"]).is_ok());
        assert!(matches!(
            scaler.check_layout(&["chol", "age"]),
            Err(ModelError::LayoutMismatch { .. })
        ));
        assert!(scaler.check_layout(&["age"]).is_err());
    }
}
