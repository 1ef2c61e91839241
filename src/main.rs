//! Predictor Server binary

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use predictor_server::config::{Config, LogFormat};
use predictor_server::inference::{CarPricePredictor, HeartDiseasePredictor};
use predictor_server::recommendations::RecommendationCatalog;
use predictor_server::store::{CarStore, MemoryCarStore, PgCarStore};
use predictor_server::{create_router, db, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    // Initialize logging
    init_tracing(config.log_format);

    tracing::info!("Predictor server starting ({})...", config.environment);

    // Models load once; a failure disables only the affected endpoint
    let heart = match HeartDiseasePredictor::load(&config.heart_model_path, &config.heart_scaler_path) {
        Ok(predictor) => Some(Arc::new(predictor)),
        Err(e) => {
            tracing::error!("Error loading heart disease model or scaler: {}", e);
            None
        }
    };

    let car_price = match CarPricePredictor::load(&config.car_price_model_path) {
        Ok(predictor) => Some(Arc::new(predictor)),
        Err(e) => {
            tracing::error!("Error loading car price model: {}", e);
            None
        }
    };

    let recommendations = RecommendationCatalog::load_dir(&config.recommendations_dir, &config.default_lang)
        .context("Failed to load recommendation messages")?;

    let cars: Arc<dyn CarStore> = match &config.database_url {
        Some(url) => {
            tracing::info!("Database: {}", url.split('@').last().unwrap_or("***"));
            let pool = db::create_pool(url).await
                .context("Failed to create database pool")?;

            tracing::info!("Running database migrations...");
            db::run_migrations(&pool).await
                .context("Failed to run migrations")?;

            Arc::new(PgCarStore::new(pool))
        }
        None => {
            if config.is_production() {
                tracing::warn!("DATABASE_URL is not set; car records will not survive a restart");
            } else {
                tracing::info!("No DATABASE_URL, keeping car records in memory");
            }
            Arc::new(MemoryCarStore::new())
        }
    };

    // Build application state
    let state = AppState {
        heart,
        car_price,
        recommendations: Arc::new(recommendations),
        cars,
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "predictor_server=debug,tower_http=debug".into());

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
    }
}
