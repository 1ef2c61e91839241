//! Heart disease prediction handler

use std::sync::Arc;

use axum::extract::{
    rejection::{JsonRejection, QueryRejection},
    Query, State,
};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use super::request_data;
use crate::inference::{Attribution, HeartDiseasePredictor};
use crate::models::HeartInput;
use crate::recommendations::RecommendationSet;
use crate::{AppError, AppResult, AppState};

#[derive(Debug, Serialize)]
pub struct HeartPredictionResponse {
    pub prediction: u8,
    pub explanation: Option<Vec<Attribution>>,
    pub recommendations: RecommendationSet,
}

/// First `lang` in the query string; repeated keys are not an error
fn requested_lang(params: &[(String, String)]) -> Option<&str> {
    params
        .iter()
        .find(|(key, _)| key == "lang")
        .map(|(_, value)| value.as_str())
}

/// TreeSHAP on the blocking pool; a failure leaves the prediction usable
async fn explain(predictor: Arc<HeartDiseasePredictor>, input: HeartInput) -> Option<Vec<Attribution>> {
    match tokio::task::spawn_blocking(move || predictor.explain(&input)).await {
        Ok(Ok(attributions)) => Some(attributions),
        Ok(Err(e)) => {
            tracing::warn!("Explanation unavailable: {}", e);
            None
        }
        Err(e) => {
            tracing::warn!("Explanation task failed: {}", e);
            None
        }
    }
}

/// Validate, predict, explain and recommend for one patient record
pub async fn predict(
    State(state): State<AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<HeartPredictionResponse>> {
    let Query(params) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let data = request_data(payload)?;
    let input = HeartInput::from_json(&data)?;

    let predictor = state.heart.clone().ok_or(AppError::ModelUnavailable)?;
    let prediction = predictor.predict(&input)?;
    let explanation = explain(predictor, input.clone()).await;

    let lang = requested_lang(&params).unwrap_or_else(|| state.recommendations.default_lang());
    let recommendations = state.recommendations.recommend(&input, prediction, lang);

    tracing::debug!(prediction, lang, "Heart disease prediction served");

    Ok(Json(HeartPredictionResponse {
        prediction,
        explanation,
        recommendations,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_requested_lang() {
        assert_eq!(requested_lang(&pairs(&[("lang", "fr")])), Some("fr"));
        assert_eq!(requested_lang(&pairs(&[("lang", "fr"), ("lang", "en")])), Some("fr"));
        assert_eq!(requested_lang(&pairs(&[("format", "json")])), None);
        assert_eq!(requested_lang(&[]), None);
    }
}
