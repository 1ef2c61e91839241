//! Car price prediction handler

use axum::extract::{rejection::JsonRejection, State};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use super::request_data;
use crate::models::CarPriceInput;
use crate::{AppError, AppResult, AppState};

#[derive(Debug, Serialize)]
pub struct PricePredictionResponse {
    pub predicted_price: f64,
}

/// Estimate a price; missing numeric features count as 0
pub async fn predict_price(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<PricePredictionResponse>> {
    let data = request_data(payload)?;
    let input = CarPriceInput::from_json(&data)?;

    let predictor = state.car_price.as_deref().ok_or(AppError::ModelUnavailable)?;
    let predicted_price = predictor.predict(&input)?;

    tracing::debug!(predicted_price, "Car price prediction served");

    Ok(Json(PricePredictionResponse { predicted_price }))
}
