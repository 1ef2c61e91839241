//! Car record storage
//!
//! Handlers talk to a [`CarStore`]; the server picks PostgreSQL when a
//! `DATABASE_URL` is configured and the in-process store otherwise.

pub mod postgres;

use async_trait::async_trait;
use parking_lot::RwLock;
use thiserror::Error;

use crate::models::CarRecord;

pub use postgres::PgCarStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait CarStore: Send + Sync {
    /// Persist one record as submitted
    async fn insert(&self, record: CarRecord) -> Result<CarRecord, StoreError>;

    /// Persist all records or none of them
    async fn insert_many(&self, records: Vec<CarRecord>) -> Result<Vec<CarRecord>, StoreError>;

    /// Non-empty stored names, oldest first
    async fn names(&self) -> Result<Vec<String>, StoreError>;

    /// Backend label for health reporting
    fn backend(&self) -> &'static str;
}

/// Records kept in process memory; lost on restart
#[derive(Debug, Default)]
pub struct MemoryCarStore {
    records: RwLock<Vec<CarRecord>>,
}

impl MemoryCarStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CarStore for MemoryCarStore {
    async fn insert(&self, record: CarRecord) -> Result<CarRecord, StoreError> {
        self.records.write().push(record.clone());
        Ok(record)
    }

    async fn insert_many(&self, records: Vec<CarRecord>) -> Result<Vec<CarRecord>, StoreError> {
        self.records.write().extend(records.iter().cloned());
        Ok(records)
    }

    async fn names(&self) -> Result<Vec<String>, StoreError> {
        Ok(self
            .records
            .read()
            .iter()
            .filter_map(|r| r.name.clone())
            .filter(|name| !name.is_empty())
            .collect())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
