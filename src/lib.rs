//! Predictor Server
//!
//! HTTP front for two pre-trained models: a heart-disease risk classifier
//! (with TreeSHAP explanations and advisory text) and a car-price
//! regressor (with a small car listing store).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     PREDICTOR SERVER                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌─────────────┐  ┌───────────────────────┐ │
//! │  │  Router   │─▶│ Validation  │─▶│ Predictors            │ │
//! │  │  (Axum)   │  │ (validator) │  │ (tree ensembles)      │ │
//! │  └─────┬─────┘  └─────────────┘  └───────────┬───────────┘ │
//! │        │                                     ▼             │
//! │        │                         ┌───────────────────────┐ │
//! │        │                         │ Recommendation rules  │ │
//! │        ▼                         └───────────────────────┘ │
//! │  ┌─────────────────────┐                                   │
//! │  │ Car store           │                                   │
//! │  │ (PostgreSQL/memory) │                                   │
//! │  └─────────────────────┘                                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod inference;
pub mod models;
pub mod recommendations;
pub mod store;
pub mod validation;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
};

pub use error::{AppError, AppResult};

use inference::{CarPricePredictor, HeartDiseasePredictor};
use recommendations::RecommendationCatalog;
use store::CarStore;

/// Shared application state
///
/// Predictors are `None` when their artifacts failed to load; the matching
/// endpoint then answers with a server error.
#[derive(Clone)]
pub struct AppState {
    pub heart: Option<Arc<HeartDiseasePredictor>>,
    pub car_price: Option<Arc<CarPricePredictor>>,
    pub recommendations: Arc<RecommendationCatalog>,
    pub cars: Arc<dyn CarStore>,
}

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    let prediction_routes = Router::new()
        .route("/predict/", post(handlers::heart::predict))
        .route("/predict_price/", post(handlers::car_price::predict_price));

    let car_routes = Router::new()
        .route("/car_data/", post(handlers::cars::create))
        .route("/car_data_bulk/", post(handlers::cars::create_bulk))
        .route("/car_names/", get(handlers::cars::names));

    Router::new()
        .route("/health", get(handlers::health::check))
        .merge(prediction_routes)
        .merge(car_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
