//! Field-level input validation
//!
//! Request payloads arrive as loose JSON objects. [`FieldReader`] coerces
//! each declared field into a typed value and collects every problem into
//! a [`FieldErrors`] map (`field -> [message]`), so a client gets the full
//! list of mistakes in one response. Numeric bounds are declared on the
//! typed input structs with `validator` and folded in afterwards through
//! [`FieldReader::merge_ranges`].

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};
use validator::{ValidationError, ValidationErrors};

pub const MSG_REQUIRED: &str = "This field is required.";
pub const MSG_NULL: &str = "This field may not be null.";
pub const MSG_BLANK: &str = "This field may not be blank.";
pub const MSG_INVALID_INT: &str = "A valid integer is required.";
pub const MSG_INVALID_NUMBER: &str = "A valid number is required.";
pub const MSG_INVALID_BOOL: &str = "Must be a valid boolean.";
pub const MSG_INVALID_STRING: &str = "Not a valid string.";

/// Key used for errors that are not tied to a single field
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

const TRUE_STRINGS: &[&str] = &["t", "T", "y", "Y", "yes", "Yes", "YES", "true", "True", "TRUE", "on", "On", "ON", "1"];
const FALSE_STRINGS: &[&str] = &["f", "F", "n", "N", "no", "No", "NO", "false", "False", "FALSE", "off", "Off", "OFF", "0"];
const NULL_STRINGS: &[&str] = &["null", "Null", "NULL", ""];

// ============================================================================
// ERROR MAP
// ============================================================================

/// Validation failures keyed by field name
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single error not attached to any field
    pub fn non_field(message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(NON_FIELD_ERRORS, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

// ============================================================================
// FIELD READER
// ============================================================================

/// Coerces fields out of a raw JSON object, accumulating errors
pub struct FieldReader<'a> {
    data: &'a Map<String, Value>,
    errors: FieldErrors,
}

impl<'a> FieldReader<'a> {
    pub fn new(data: &'a Map<String, Value>) -> Self {
        Self { data, errors: FieldErrors::new() }
    }

    /// Present and non-null value, or an error recorded against `name`
    fn present(&mut self, name: &str) -> Option<&'a Value> {
        match self.data.get(name) {
            None => {
                self.errors.add(name, MSG_REQUIRED);
                None
            }
            Some(Value::Null) => {
                self.errors.add(name, MSG_NULL);
                None
            }
            Some(value) => Some(value),
        }
    }

    fn record<T>(&mut self, name: &str, parsed: Result<T, &'static str>) -> Option<T> {
        match parsed {
            Ok(value) => Some(value),
            Err(message) => {
                self.errors.add(name, message);
                None
            }
        }
    }

    /// Required integer. Returns 0 when invalid; the error is kept.
    pub fn required_int(&mut self, name: &str) -> i64 {
        let Some(value) = self.present(name) else { return 0 };
        self.record(name, parse_int(value)).unwrap_or_default()
    }

    /// Required float. Returns 0.0 when invalid; the error is kept.
    pub fn required_float(&mut self, name: &str) -> f64 {
        let Some(value) = self.present(name) else { return 0.0 };
        self.record(name, parse_float(value)).unwrap_or_default()
    }

    /// Optional integer; absent, null and blank strings read as `None`
    pub fn optional_int(&mut self, name: &str) -> Option<i64> {
        let value = self.data.get(name).filter(|v| !is_blank(v))?;
        self.record(name, parse_int(value))
    }

    /// Optional float; absent, null and blank strings read as `None`
    pub fn optional_float(&mut self, name: &str) -> Option<f64> {
        let value = self.data.get(name).filter(|v| !is_blank(v))?;
        self.record(name, parse_float(value))
    }

    /// Optional boolean; absent and null-like values read as `None`
    pub fn optional_bool(&mut self, name: &str) -> Option<bool> {
        let value = self.data.get(name)?;
        if let Value::String(s) = value {
            if NULL_STRINGS.contains(&s.as_str()) {
                return None;
            }
        }
        if value.is_null() {
            return None;
        }
        self.record(name, parse_bool(value))
    }

    /// Optional text that may be blank
    pub fn optional_text(&mut self, name: &str) -> Option<String> {
        let value = self.data.get(name).filter(|v| !v.is_null())?;
        self.record(name, parse_text(value))
    }

    /// Optional non-blank text of at most `max_len` characters
    pub fn optional_char(&mut self, name: &str, max_len: usize) -> Option<String> {
        let value = self.data.get(name).filter(|v| !v.is_null())?;
        let text = self.record(name, parse_text(value))?;
        if text.is_empty() {
            self.errors.add(name, MSG_BLANK);
            return None;
        }
        if text.chars().count() > max_len {
            self.errors.add(name, format!("Ensure this field has no more than {} characters.", max_len));
            return None;
        }
        Some(text)
    }

    /// Fold `validator` range failures in, skipping fields that already
    /// failed coercion (their placeholder values are meaningless).
    pub fn merge_ranges(&mut self, result: Result<(), ValidationErrors>) {
        let Err(errors) = result else { return };
        for (field, failures) in errors.field_errors() {
            let field = field.to_string();
            if self.errors.contains(&field) {
                continue;
            }
            for failure in failures {
                self.errors.add(&field, range_message(failure));
            }
        }
    }

    /// Collected errors, or `Ok` when every field was valid
    pub fn finish(self) -> Result<(), FieldErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

// ============================================================================
// COERCION
// ============================================================================

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn parse_int(value: &Value) -> Result<i64, &'static str> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            match n.as_f64() {
                Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(f as i64),
                _ => Err(MSG_INVALID_INT),
            }
        }
        Value::String(s) => {
            let trimmed = s.trim();
            // "42.000" is accepted as 42
            let digits = match trimmed.split_once('.') {
                Some((int_part, frac)) if frac.chars().all(|c| c == '0') => int_part,
                Some(_) => return Err(MSG_INVALID_INT),
                None => trimmed,
            };
            digits.parse::<i64>().map_err(|_| MSG_INVALID_INT)
        }
        _ => Err(MSG_INVALID_INT),
    }
}

fn parse_float(value: &Value) -> Result<f64, &'static str> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|f| f.is_finite()).ok_or(MSG_INVALID_NUMBER)
}

fn parse_bool(value: &Value) -> Result<bool, &'static str> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f == 1.0 => Ok(true),
            Some(f) if f == 0.0 => Ok(false),
            _ => Err(MSG_INVALID_BOOL),
        },
        Value::String(s) if TRUE_STRINGS.contains(&s.as_str()) => Ok(true),
        Value::String(s) if FALSE_STRINGS.contains(&s.as_str()) => Ok(false),
        _ => Err(MSG_INVALID_BOOL),
    }
}

fn parse_text(value: &Value) -> Result<String, &'static str> {
    match value {
        Value::String(s) => Ok(s.trim().to_string()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(MSG_INVALID_STRING),
    }
}

fn format_bound(bound: f64) -> String {
    if bound.fract() == 0.0 {
        format!("{}", bound as i64)
    } else {
        format!("{}", bound)
    }
}

fn range_message(failure: &ValidationError) -> String {
    let param = |key: &str| failure.params.get(key).and_then(Value::as_f64);

    if let (Some(value), Some(max)) = (param("value"), param("max")) {
        if value > max {
            return format!("Ensure this value is less than or equal to {}.", format_bound(max));
        }
    }
    if let Some(min) = param("min") {
        return format!("Ensure this value is greater than or equal to {}.", format_bound(min));
    }
    match &failure.message {
        Some(message) => message.to_string(),
        None => failure.code.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_required_int_coercion() {
        let data = object(json!({"a": 3, "b": "7", "c": "8.00", "d": 4.0, "e": 4.5, "f": true, "g": null}));
        let mut reader = FieldReader::new(&data);

        assert_eq!(reader.required_int("a"), 3);
        assert_eq!(reader.required_int("b"), 7);
        assert_eq!(reader.required_int("c"), 8);
        assert_eq!(reader.required_int("d"), 4);
        reader.required_int("e");
        reader.required_int("f");
        reader.required_int("g");
        reader.required_int("missing");

        let errors = reader.finish().unwrap_err();
        assert_eq!(errors.get("e"), Some(&[MSG_INVALID_INT.to_string()][..]));
        assert_eq!(errors.get("f"), Some(&[MSG_INVALID_INT.to_string()][..]));
        assert_eq!(errors.get("g"), Some(&[MSG_NULL.to_string()][..]));
        assert_eq!(errors.get("missing"), Some(&[MSG_REQUIRED.to_string()][..]));
        assert_eq!(errors.fields().count(), 4);
    }

    #[test]
    fn test_optional_numbers_treat_blank_as_missing() {
        let data = object(json!({"year": "", "power": null, "length": " ", "mileage": "12.5"}));
        let mut reader = FieldReader::new(&data);

        assert_eq!(reader.optional_int("year"), None);
        assert_eq!(reader.optional_int("power"), None);
        assert_eq!(reader.optional_float("length"), None);
        assert_eq!(reader.optional_float("mileage"), Some(12.5));
        assert_eq!(reader.optional_float("absent"), None);
        assert!(reader.finish().is_ok());
    }

    #[test]
    fn test_optional_bool_accepts_common_spellings() {
        let data = object(json!({"a": "yes", "b": 0, "c": "OFF", "d": "", "e": "maybe"}));
        let mut reader = FieldReader::new(&data);

        assert_eq!(reader.optional_bool("a"), Some(true));
        assert_eq!(reader.optional_bool("b"), Some(false));
        assert_eq!(reader.optional_bool("c"), Some(false));
        assert_eq!(reader.optional_bool("d"), None);
        assert_eq!(reader.optional_bool("e"), None);

        let errors = reader.finish().unwrap_err();
        assert_eq!(errors.get("e"), Some(&[MSG_INVALID_BOOL.to_string()][..]));
    }

    #[test]
    fn test_optional_char_limits() {
        let long = "x".repeat(101);
        let data = object(json!({"name": "  Peugeot 208 ", "year": 2019, "blank": "  ", "long": long, "obj": {}}));
        let mut reader = FieldReader::new(&data);

        assert_eq!(reader.optional_char("name", 100).as_deref(), Some("Peugeot 208"));
        assert_eq!(reader.optional_char("year", 100).as_deref(), Some("2019"));
        assert_eq!(reader.optional_char("blank", 100), None);
        assert_eq!(reader.optional_char("long", 100), None);
        assert_eq!(reader.optional_char("obj", 100), None);

        let errors = reader.finish().unwrap_err();
        assert_eq!(errors.get("blank"), Some(&[MSG_BLANK.to_string()][..]));
        assert_eq!(errors.get("obj"), Some(&[MSG_INVALID_STRING.to_string()][..]));
        assert!(errors.get("long").unwrap()[0].contains("100 characters"));
    }

    #[test]
    fn test_non_field_error_serializes_as_map() {
        let errors = FieldErrors::non_field("No data provided");
        assert_eq!(
            serde_json::to_value(&errors).unwrap(),
            json!({"non_field_errors": ["No data provided"]})
        );
    }
}
