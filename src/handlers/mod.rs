//! HTTP handlers

pub mod health;
pub mod heart;
pub mod car_price;
pub mod cars;

use axum::extract::rejection::JsonRejection;
use axum::Json;
use serde_json::{Map, Value};

use crate::error::{AppError, AppResult};
use crate::models::car::json_type_name;
use crate::validation::FieldErrors;

/// Unwrap a JSON body, reporting parse failures as 400
pub(crate) fn json_body(payload: Result<Json<Value>, JsonRejection>) -> AppResult<Value> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(rejection) => Err(AppError::BadRequest(format!(
            "JSON parse error - {}",
            rejection.body_text()
        ))),
    }
}

/// The `data` object of a prediction request
pub(crate) fn request_data(payload: Result<Json<Value>, JsonRejection>) -> AppResult<Map<String, Value>> {
    let mut body = json_body(payload)?;

    match body.get_mut("data").map(Value::take) {
        Some(Value::Object(data)) => Ok(data),
        None | Some(Value::Null) => Err(FieldErrors::non_field("No data provided").into()),
        Some(other) => Err(FieldErrors::non_field(format!(
            "Invalid data. Expected a dictionary, but got {}.",
            json_type_name(&other)
        ))
        .into()),
    }
}
