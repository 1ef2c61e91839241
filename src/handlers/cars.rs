//! Car record handlers

use axum::extract::{rejection::JsonRejection, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::Value;

use super::json_body;
use crate::models::car::json_type_name;
use crate::models::{distinct_brand_models, BrandModel, CarRecord};
use crate::validation::FieldErrors;
use crate::{AppError, AppResult, AppState};

/// Store one car record
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<(StatusCode, Json<CarRecord>)> {
    let body = json_body(payload)?;
    let record = CarRecord::from_json(&body)?;

    let stored = state.cars.insert(record).await?;
    tracing::info!("Car record stored: {}", stored.name.as_deref().unwrap_or("<unnamed>"));

    Ok((StatusCode::CREATED, Json(stored)))
}

/// Store a list of car records; any invalid item rejects the whole batch
pub async fn create_bulk(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Vec<CarRecord>>)> {
    let body = json_body(payload)?;
    let items = match body {
        Value::Array(items) => items,
        other => {
            return Err(FieldErrors::non_field(format!(
                "Expected a list of items but got type \"{}\".",
                json_type_name(&other)
            ))
            .into());
        }
    };

    let mut records = Vec::with_capacity(items.len());
    let mut errors = Vec::with_capacity(items.len());
    let mut failed = false;
    for item in &items {
        match CarRecord::from_json(item) {
            Ok(record) => {
                records.push(record);
                errors.push(FieldErrors::new());
            }
            Err(e) => {
                failed = true;
                errors.push(e);
            }
        }
    }
    if failed {
        return Err(AppError::BulkValidationError(errors));
    }

    let stored = state.cars.insert_many(records).await?;
    tracing::info!("{} car records stored", stored.len());

    Ok((StatusCode::CREATED, Json(stored)))
}

/// Distinct brand/model pairs across stored records
pub async fn names(State(state): State<AppState>) -> AppResult<Json<Vec<BrandModel>>> {
    let names = state.cars.names().await?;
    Ok(Json(distinct_brand_models(names)))
}
