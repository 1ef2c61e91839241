//! Database module - PostgreSQL connection and migrations

use sqlx::{postgres::PgPoolOptions, PgPool};

/// Create database connection pool
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA_SQL).execute(pool).await?;

    tracing::info!("Database schema applied successfully");
    Ok(())
}

/// Database schema SQL
const SCHEMA_SQL: &str = r#"
-- Car listings, stored verbatim as submitted
CREATE TABLE IF NOT EXISTS cars (
    id BIGSERIAL PRIMARY KEY,
    name VARCHAR(100),
    price VARCHAR(100),
    year VARCHAR(100),
    origin VARCHAR(100),
    registration_date VARCHAR(100),
    technical_inspection VARCHAR(100),
    first_hand VARCHAR(100),
    mileage VARCHAR(100),
    fuel_type VARCHAR(100),
    transmission VARCHAR(100),
    num_doors VARCHAR(100),
    num_seats VARCHAR(100),
    power VARCHAR(100),
    co2_emission VARCHAR(100),
    trunk_volume VARCHAR(100),
    length VARCHAR(100),
    critair_rating VARCHAR(100),
    combined_consumption VARCHAR(100),
    created_at TIMESTAMPTZ DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_cars_name ON cars(name);
"#;
