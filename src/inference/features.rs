//! Feature Contract
//!
//! **The order of these lists is the input layout of the trained models.**
//! Reordering a list silently corrupts every prediction; any change here
//! needs freshly exported artifacts.

use super::PredictionError;

/// Heart disease model inputs, in model order
pub const HEART_FEATURES: &[&str] = &[
    "age",      // 0: years
    "sex",      // 1: 1 = male
    "cp",       // 2: chest pain type
    "trestbps", // 3: resting blood pressure (mm Hg)
    "chol",     // 4: serum cholesterol (mg/dl)
    "fbs",      // 5: fasting blood sugar > 120 mg/dl
    "restecg",  // 6: resting ECG result
    "thalach",  // 7: max heart rate achieved
    "exang",    // 8: exercise induced angina
    "oldpeak",  // 9: ST depression
    "slope",    // 10: slope of peak exercise ST segment
    "ca",       // 11: vessels colored by fluoroscopy
    "thal",     // 12: thalassemia
];

pub const HEART_FEATURE_COUNT: usize = 13;

/// Car price model inputs, in model order
pub const CAR_PRICE_FEATURES: &[&str] = &[
    "year",
    "power",
    "combined_consumption",
    "mileage",
    "num_doors",
    "num_seats",
    "length",
];

pub const CAR_PRICE_FEATURE_COUNT: usize = 7;

/// Ordered numeric features bound to a named layout
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    layout: &'static [&'static str],
    values: Vec<f64>,
}

impl FeatureVector {
    /// Build a vector; `values` must follow `layout` and be finite
    pub fn new(layout: &'static [&'static str], values: Vec<f64>) -> Result<Self, PredictionError> {
        if values.len() != layout.len() {
            return Err(PredictionError::FeatureCount {
                expected: layout.len(),
                actual: values.len(),
            });
        }
        if let Some(i) = values.iter().position(|v| !v.is_finite()) {
            return Err(PredictionError::NonFiniteInput { feature: layout[i] });
        }
        Ok(Self { layout, values })
    }

    pub fn layout(&self) -> &'static [&'static str] {
        self.layout
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}
