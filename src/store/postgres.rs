//! PostgreSQL-backed car store

use async_trait::async_trait;
use sqlx::postgres::PgArguments;
use sqlx::query::QueryAs;
use sqlx::{PgPool, Postgres};

use super::{CarStore, StoreError};
use crate::models::CarRecord;

const INSERT_SQL: &str = r#"
    INSERT INTO cars (
        name, price, year, origin, registration_date, technical_inspection,
        first_hand, mileage, fuel_type, transmission, num_doors, num_seats,
        power, co2_emission, trunk_volume, length, critair_rating, combined_consumption
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
    RETURNING
        name, price, year, origin, registration_date, technical_inspection,
        first_hand, mileage, fuel_type, transmission, num_doors, num_seats,
        power, co2_emission, trunk_volume, length, critair_rating, combined_consumption
"#;

#[derive(Debug, Clone)]
pub struct PgCarStore {
    pool: PgPool,
}

impl PgCarStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn insert_query(record: &CarRecord) -> QueryAs<'_, Postgres, CarRecord, PgArguments> {
    sqlx::query_as::<_, CarRecord>(INSERT_SQL)
        .bind(&record.name)
        .bind(&record.price)
        .bind(&record.year)
        .bind(&record.origin)
        .bind(&record.registration_date)
        .bind(&record.technical_inspection)
        .bind(&record.first_hand)
        .bind(&record.mileage)
        .bind(&record.fuel_type)
        .bind(&record.transmission)
        .bind(&record.num_doors)
        .bind(&record.num_seats)
        .bind(&record.power)
        .bind(&record.co2_emission)
        .bind(&record.trunk_volume)
        .bind(&record.length)
        .bind(&record.critair_rating)
        .bind(&record.combined_consumption)
}

#[async_trait]
impl CarStore for PgCarStore {
    async fn insert(&self, record: CarRecord) -> Result<CarRecord, StoreError> {
        Ok(insert_query(&record).fetch_one(&self.pool).await?)
    }

    async fn insert_many(&self, records: Vec<CarRecord>) -> Result<Vec<CarRecord>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut stored = Vec::with_capacity(records.len());
        for record in &records {
            stored.push(insert_query(record).fetch_one(&mut *tx).await?);
        }
        tx.commit().await?;
        Ok(stored)
    }

    async fn names(&self) -> Result<Vec<String>, StoreError> {
        let names = sqlx::query_scalar::<_, String>(
            "SELECT name FROM cars WHERE name IS NOT NULL AND name <> '' ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(names)
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}
