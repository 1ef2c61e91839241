//! Heart disease input model

use serde::Serialize;
use serde_json::{Map, Value};
use validator::Validate;

use crate::validation::{FieldErrors, FieldReader};

/// One patient record, validated
#[derive(Debug, Clone, PartialEq, Serialize, Validate)]
pub struct HeartInput {
    #[validate(range(min = 0, max = 120))]
    pub age: i64,
    #[validate(range(min = 0, max = 1))]
    pub sex: i64,
    #[validate(range(min = 0, max = 3))]
    pub cp: i64,
    #[validate(range(min = 0))]
    pub trestbps: i64,
    #[validate(range(min = 0))]
    pub chol: i64,
    #[validate(range(min = 0, max = 1))]
    pub fbs: i64,
    #[validate(range(min = 0, max = 2))]
    pub restecg: i64,
    #[validate(range(min = 0))]
    pub thalach: i64,
    #[validate(range(min = 0, max = 1))]
    pub exang: i64,
    #[validate(range(min = 0.0))]
    pub oldpeak: f64,
    #[validate(range(min = 0, max = 2))]
    pub slope: i64,
    #[validate(range(min = 0, max = 3))]
    pub ca: i64,
    #[validate(range(min = 0, max = 3))]
    pub thal: i64,
}

impl HeartInput {
    /// Coerce and range-check a raw `data` object. Every field is required.
    pub fn from_json(data: &Map<String, Value>) -> Result<Self, FieldErrors> {
        let mut reader = FieldReader::new(data);

        let input = Self {
            age: reader.required_int("age"),
            sex: reader.required_int("sex"),
            cp: reader.required_int("cp"),
            trestbps: reader.required_int("trestbps"),
            chol: reader.required_int("chol"),
            fbs: reader.required_int("fbs"),
            restecg: reader.required_int("restecg"),
            thalach: reader.required_int("thalach"),
            exang: reader.required_int("exang"),
            oldpeak: reader.required_float("oldpeak"),
            slope: reader.required_int("slope"),
            ca: reader.required_int("ca"),
            thal: reader.required_int("thal"),
        };

        reader.merge_ranges(input.validate());
        reader.finish()?;
        Ok(input)
    }
}
