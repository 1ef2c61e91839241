//! Car models - stored records, price inputs and name lookup

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;

use crate::validation::{FieldErrors, FieldReader};

/// Longest accepted value for any stored car field
pub const MAX_FIELD_LENGTH: usize = 100;

/// Submitted car listing, persisted verbatim as text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CarRecord {
    pub name: Option<String>,
    pub price: Option<String>,
    pub year: Option<String>,
    pub origin: Option<String>,
    pub registration_date: Option<String>,
    pub technical_inspection: Option<String>,
    pub first_hand: Option<String>,
    pub mileage: Option<String>,
    pub fuel_type: Option<String>,
    pub transmission: Option<String>,
    pub num_doors: Option<String>,
    pub num_seats: Option<String>,
    pub power: Option<String>,
    pub co2_emission: Option<String>,
    pub trunk_volume: Option<String>,
    pub length: Option<String>,
    pub critair_rating: Option<String>,
    pub combined_consumption: Option<String>,
}

impl CarRecord {
    /// Validate one submitted record. Unknown keys are ignored.
    pub fn from_json(value: &Value) -> Result<Self, FieldErrors> {
        let Value::Object(data) = value else {
            return Err(FieldErrors::non_field(format!(
                "Invalid data. Expected a dictionary, but got {}.",
                json_type_name(value)
            )));
        };

        let mut reader = FieldReader::new(data);
        let mut field = |name: &str| reader.optional_char(name, MAX_FIELD_LENGTH);

        let record = Self {
            name: field("name"),
            price: field("price"),
            year: field("year"),
            origin: field("origin"),
            registration_date: field("registration_date"),
            technical_inspection: field("technical_inspection"),
            first_hand: field("first_hand"),
            mileage: field("mileage"),
            fuel_type: field("fuel_type"),
            transmission: field("transmission"),
            num_doors: field("num_doors"),
            num_seats: field("num_seats"),
            power: field("power"),
            co2_emission: field("co2_emission"),
            trunk_volume: field("trunk_volume"),
            length: field("length"),
            critair_rating: field("critair_rating"),
            combined_consumption: field("combined_consumption"),
        };

        reader.finish()?;
        Ok(record)
    }
}

/// Features submitted for a price estimate
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CarPriceInput {
    pub name: Option<String>,
    pub year: Option<i64>,
    pub origin: Option<bool>,
    pub technical_inspection: Option<bool>,
    pub first_hand: Option<bool>,
    pub mileage: Option<f64>,
    pub fuel_type: Option<String>,
    pub transmission: Option<String>,
    pub num_doors: Option<i64>,
    pub num_seats: Option<i64>,
    pub power: Option<i64>,
    pub co2_emission: Option<f64>,
    pub length: Option<f64>,
    pub critair_rating: Option<i64>,
    pub combined_consumption: Option<f64>,
}

impl CarPriceInput {
    /// Coerce a raw `data` object; every field may be absent, null or blank
    pub fn from_json(data: &Map<String, Value>) -> Result<Self, FieldErrors> {
        let mut reader = FieldReader::new(data);

        let input = Self {
            name: reader.optional_text("name"),
            year: reader.optional_int("year"),
            origin: reader.optional_bool("origin"),
            technical_inspection: reader.optional_bool("technical_inspection"),
            first_hand: reader.optional_bool("first_hand"),
            mileage: reader.optional_float("mileage"),
            fuel_type: reader.optional_text("fuel_type"),
            transmission: reader.optional_text("transmission"),
            num_doors: reader.optional_int("num_doors"),
            num_seats: reader.optional_int("num_seats"),
            power: reader.optional_int("power"),
            co2_emission: reader.optional_float("co2_emission"),
            length: reader.optional_float("length"),
            critair_rating: reader.optional_int("critair_rating"),
            combined_consumption: reader.optional_float("combined_consumption"),
        };

        reader.finish()?;
        Ok(input)
    }
}

/// Brand and model split out of a stored car name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BrandModel {
    pub brand: String,
    pub model: String,
}

impl BrandModel {
    /// Split on the first space; a single word has an empty model
    pub fn from_name(name: &str) -> Self {
        let (brand, model) = name.split_once(' ').unwrap_or((name, ""));
        Self {
            brand: brand.to_string(),
            model: model.to_string(),
        }
    }
}

/// Distinct (brand, model) pairs in first-seen order, skipping empty names
pub fn distinct_brand_models<I, S>(names: I) -> Vec<BrandModel>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut pairs = Vec::new();

    for name in names {
        let name = name.as_ref();
        if name.is_empty() {
            continue;
        }
        let pair = BrandModel::from_name(name);
        if seen.insert(pair.clone()) {
            pairs.push(pair);
        }
    }
    pairs
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}
