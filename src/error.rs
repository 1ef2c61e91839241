//! Error handling

use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};
use serde_json::json;

use crate::inference::PredictionError;
use crate::store::StoreError;
use crate::validation::FieldErrors;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    // Validation errors
    ValidationError(FieldErrors),
    BulkValidationError(Vec<FieldErrors>),
    BadRequest(String),

    // Model errors
    ModelUnavailable,
    PredictionFailed(PredictionError),

    // Database errors
    DatabaseError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            AppError::ValidationError(errors) => {
                return (StatusCode::BAD_REQUEST, Json(errors)).into_response();
            }
            AppError::BulkValidationError(errors) => {
                return (StatusCode::BAD_REQUEST, Json(errors)).into_response();
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::ModelUnavailable => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error: model loading failed.".to_string(),
            ),
            AppError::PredictionFailed(err) => {
                tracing::error!("Prediction error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Error processing request.".to_string())
            }
            AppError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error occurred".to_string())
            }
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

impl From<FieldErrors> for AppError {
    fn from(errors: FieldErrors) -> Self {
        AppError::ValidationError(errors)
    }
}

impl From<PredictionError> for AppError {
    fn from(err: PredictionError) -> Self {
        AppError::PredictionFailed(err)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn render(err: AppError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_store_error_hides_cause() {
        let err = AppError::from(StoreError::Database(sqlx::Error::PoolTimedOut));
        let (status, body) = render(err).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"detail": "Database error occurred"}));
    }

    #[tokio::test]
    async fn test_prediction_error_is_generic() {
        let (status, body) = render(PredictionError::NonFiniteOutput.into()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"detail": "Error processing request."}));
    }

    #[tokio::test]
    async fn test_validation_errors_keep_field_map() {
        let mut errors = FieldErrors::new();
        errors.add("age", "A valid integer is required.");

        let (status, body) = render(errors.clone().into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"age": ["A valid integer is required."]}));

        let (status, body) = render(AppError::BulkValidationError(vec![FieldErrors::new(), errors])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!([{}, {"age": ["A valid integer is required."]}]));
    }
}
