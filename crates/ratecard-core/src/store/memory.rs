//! In-process store with the same transaction and constraint semantics as
//! the PostgreSQL backend.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{RateStore, StoreTransaction};
use crate::schema::check_row;
use crate::{
    CountryRef, DestinationTemplate, RateBag, RateRecord, RatecardError, Result, Snapshot,
    StoredRate, Table, TableRow,
};

#[derive(Debug, Clone)]
struct Tables {
    rates: Vec<StoredRate>,
    next_rate_id: i64,
    countries: Vec<CountryRef>,
    templates: Vec<DestinationTemplate>,
    bags: Vec<RateBag>,
}

impl Default for Tables {
    fn default() -> Self {
        Self {
            rates: Vec::new(),
            next_rate_id: 1,
            countries: Vec::new(),
            templates: Vec::new(),
            bags: Vec::new(),
        }
    }
}

/// In-memory store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        let staged = self.tables.read().await.clone();
        Ok(Box::new(MemoryTransaction {
            target: Arc::clone(&self.tables),
            staged,
            touched: Vec::new(),
        }))
    }

    async fn list_rates(&self) -> Result<Vec<StoredRate>> {
        Ok(self.tables.read().await.rates.clone())
    }

    async fn get_rate(&self, id: i64) -> Result<Option<StoredRate>> {
        Ok(self
            .tables
            .read()
            .await
            .rates
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn update_rate(&self, id: i64, record: &RateRecord) -> Result<()> {
        check_row(&TableRow::Rate(record.clone()))?;

        let mut tables = self.tables.write().await;
        let stored = tables
            .rates
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| RatecardError::RecordNotFound(format!("ratesheet record {id}")))?;
        stored.record = record.clone();
        Ok(())
    }

    async fn list_countries(&self) -> Result<Vec<CountryRef>> {
        Ok(self.tables.read().await.countries.clone())
    }

    async fn list_templates(&self) -> Result<Vec<DestinationTemplate>> {
        Ok(self.tables.read().await.templates.clone())
    }

    async fn list_rate_bags(&self) -> Result<Vec<RateBag>> {
        Ok(self.tables.read().await.bags.clone())
    }

    async fn count(&self, table: Table) -> Result<u64> {
        let tables = self.tables.read().await;
        let n = match table {
            Table::Rates => tables.rates.len(),
            Table::Countries => tables.countries.len(),
            Table::Templates => tables.templates.len(),
            Table::RateBags => tables.bags.len(),
        };
        Ok(n as u64)
    }

    async fn snapshot(&self) -> Result<Snapshot> {
        let tables = self.tables.read().await;
        Ok(Snapshot {
            rates: tables.rates.clone(),
            countries: tables.countries.clone(),
            templates: tables.templates.clone(),
        })
    }
}

/// Works on a private copy; commit swaps in only the tables it wrote to
/// (last commit wins per table)
struct MemoryTransaction {
    target: Arc<RwLock<Tables>>,
    staged: Tables,
    touched: Vec<Table>,
}

impl MemoryTransaction {
    fn touch(&mut self, table: Table) {
        if !self.touched.contains(&table) {
            self.touched.push(table);
        }
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn truncate(&mut self, table: Table) -> Result<()> {
        self.touch(table);
        match table {
            Table::Rates => {
                self.staged.rates.clear();
                self.staged.next_rate_id = 1;
            }
            Table::Countries => self.staged.countries.clear(),
            Table::Templates => self.staged.templates.clear(),
            Table::RateBags => self.staged.bags.clear(),
        }
        Ok(())
    }

    async fn insert(&mut self, row: &TableRow) -> Result<()> {
        check_row(row)?;
        self.touch(row.table());

        match row {
            TableRow::Rate(record) => {
                let id = self.staged.next_rate_id;
                self.staged.next_rate_id += 1;
                self.staged.rates.push(StoredRate {
                    id,
                    record: record.clone(),
                });
            }
            TableRow::Country(country) => self.staged.countries.push(country.clone()),
            TableRow::Template(template) => self.staged.templates.push(template.clone()),
            TableRow::Bag(bag) => self.staged.bags.push(bag.clone()),
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryTransaction {
            target,
            mut staged,
            touched,
        } = *self;

        let mut tables = target.write().await;
        for table in touched {
            match table {
                Table::Rates => {
                    tables.rates = std::mem::take(&mut staged.rates);
                    tables.next_rate_id = staged.next_rate_id;
                }
                Table::Countries => tables.countries = std::mem::take(&mut staged.countries),
                Table::Templates => tables.templates = std::mem::take(&mut staged.templates),
                Table::RateBags => tables.bags = std::mem::take(&mut staged.bags),
            }
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
