//! Storage abstraction for the replace-on-upload tables
//!
//! Every upload runs inside one [`StoreTransaction`]: truncate, insert each
//! row, then commit. Dropping a transaction without committing discards it.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::DatabaseConfig;
use crate::{
    CountryRef, DestinationTemplate, RateBag, RateRecord, Result, Snapshot, StoredRate, Table,
    TableRow,
};

/// Trait for ratesheet storage backends
#[async_trait]
pub trait RateStore: Send + Sync {
    /// Start a transaction for a table replace
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>>;

    /// All rate records in identity order
    async fn list_rates(&self) -> Result<Vec<StoredRate>>;

    /// Rate record by identity
    async fn get_rate(&self, id: i64) -> Result<Option<StoredRate>>;

    /// Overwrite a rate record; `RecordNotFound` when `id` is absent
    async fn update_rate(&self, id: i64, record: &RateRecord) -> Result<()>;

    /// All country rows in insertion order
    async fn list_countries(&self) -> Result<Vec<CountryRef>>;

    /// All template rows in insertion order
    async fn list_templates(&self) -> Result<Vec<DestinationTemplate>>;

    /// All schema-less ratesheet rows in insertion order
    async fn list_rate_bags(&self) -> Result<Vec<RateBag>>;

    /// Number of rows in a table
    async fn count(&self, table: Table) -> Result<u64>;

    /// Load everything the ratecard export reads
    async fn snapshot(&self) -> Result<Snapshot> {
        Ok(Snapshot {
            rates: self.list_rates().await?,
            countries: self.list_countries().await?,
            templates: self.list_templates().await?,
        })
    }
}

/// An open write transaction
#[async_trait]
pub trait StoreTransaction: Send {
    /// Remove every row and restart the identity sequence
    async fn truncate(&mut self, table: Table) -> Result<()>;

    /// Insert one row into the table it belongs to
    async fn insert(&mut self, row: &TableRow) -> Result<()>;

    /// Make all changes visible atomically
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Discard all changes
    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Open the store named by the database configuration
pub async fn open(config: &DatabaseConfig) -> Result<Arc<dyn RateStore>> {
    if config.is_memory() {
        tracing::info!("Using in-memory store");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let store = PgStore::connect(&config.url, config.pool_size).await?;
    if config.ensure_schema {
        store.ensure_schema().await?;
    }
    tracing::info!("Connected to PostgreSQL store");
    Ok(Arc::new(store))
}
