//! Persistence gateway consumed by the reading and dashboard services.
//!
//! Writes are conditional: each carries a [`WriteGuard`] naming the reading the
//! caller validated against, and the store refuses the write with
//! [`StoreError::Conflict`] if another writer got there first.

use std::{fmt, sync::Arc};

use billing_client::{
    db::dashboard_queries::CountedTable,
    domain::{BillTotals, ItemView, Meter, NewReading, Reading, Subscriber},
};
use time::OffsetDateTime;

use crate::config::{StoreConfig, StoreKind};

pub mod memory;
pub mod postgres;

pub use memory::{MemoryStore, Snapshot};
pub use postgres::PgStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Meter,
    Subscriber,
    Reading,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordKind::Meter => "Meter",
            RecordKind::Subscriber => "Subscriber",
            RecordKind::Reading => "Reading",
        };
        f.write_str(name)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("concurrent reading write on meter {meter_id}")]
    Conflict { meter_id: i32 },
    #[error("{0} disappeared before the write")]
    Missing(RecordKind),
}

impl From<anyhow::Error> for StoreError {
    fn from(e: anyhow::Error) -> Self {
        StoreError::Unavailable(format!("{e:#}"))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

/// Selects readings of one meter, always ordered newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadingQuery {
    pub meter_id: i32,
    pub exclude_id: Option<i32>,
    pub limit: Option<usize>,
}

impl ReadingQuery {
    pub fn for_meter(meter_id: i32) -> Self {
        Self {
            meter_id,
            exclude_id: None,
            limit: None,
        }
    }

    pub fn excluding(mut self, reading_id: i32) -> Self {
        self.exclude_id = Some(reading_id);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// The reading a write was validated against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriorReading {
    pub id: i32,
    pub current_read: f64,
}

/// Precondition for a reading write: the newest competing reading of the
/// meter must still be `prior` (or there must still be none).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WriteGuard {
    pub prior: Option<PriorReading>,
}

impl WriteGuard {
    pub fn after(prior: Option<&Reading>) -> Self {
        Self {
            prior: prior.map(|r| PriorReading {
                id: r.id,
                current_read: r.current_read,
            }),
        }
    }

    /// Whether `latest` is still the reading this guard was taken on.
    pub fn holds(&self, latest: Option<&Reading>) -> bool {
        match (self.prior, latest) {
            (None, None) => true,
            (Some(p), Some(r)) => p.id == r.id && p.current_read == r.current_read,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReadingUpdate {
    pub id: i32,
    pub meter_id: i32,
    pub current_read: f64,
    pub read_at: OffsetDateTime,
}

#[async_trait::async_trait]
pub trait ReadingStore: Send + Sync {
    async fn find_meter_by_id(&self, meter_id: i32) -> Result<Option<Meter>, StoreError>;

    async fn find_meter_by_number(&self, meter_number: i32) -> Result<Option<Meter>, StoreError>;

    async fn find_subscriber_by_meter_id(&self, meter_id: i32) -> Result<Option<Subscriber>, StoreError>;

    async fn find_reading_by_id(&self, reading_id: i32) -> Result<Option<Reading>, StoreError>;

    async fn query_readings(&self, query: ReadingQuery) -> Result<Vec<Reading>, StoreError>;

    /// Insert and commit a new reading if `guard` still holds for its meter.
    async fn insert_reading(&self, reading: NewReading, guard: WriteGuard) -> Result<Reading, StoreError>;

    /// Overwrite value and timestamp of a reading if `guard` still holds for
    /// the meter's other readings.
    async fn update_reading(&self, update: ReadingUpdate, guard: WriteGuard) -> Result<(), StoreError>;
}

#[async_trait::async_trait]
pub trait DashboardStore: Send + Sync {
    async fn count(&self, table: CountedTable) -> Result<i64, StoreError>;

    async fn bill_totals(&self) -> Result<BillTotals, StoreError>;

    async fn list_items(&self) -> Result<Vec<ItemView>, StoreError>;
}

/// Everything the HTTP surface needs from one backend.
pub trait BillingStore: ReadingStore + DashboardStore {}

impl<T: ReadingStore + DashboardStore> BillingStore for T {}

/// Build the backend selected by configuration.
pub async fn open_store(cfg: &StoreConfig) -> anyhow::Result<Arc<dyn BillingStore>> {
    let store: Arc<dyn BillingStore> = match cfg.kind {
        StoreKind::Postgres => Arc::new(PgStore::connect(&cfg.uri, cfg.max_connections).await?),
        StoreKind::Memory => match &cfg.seed_path {
            Some(path) => Arc::new(MemoryStore::load_seed(path)?),
            None => Arc::new(MemoryStore::new()),
        },
    };
    tracing::info!(kind = ?cfg.kind, "store ready");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn reading(id: i32, value: f64) -> Reading {
        Reading {
            id,
            meter_id: 1,
            item_id: 1,
            current_read: value,
            read_at: datetime!(2024-01-01 00:00:00 UTC),
        }
    }

    #[test]
    fn guard_on_empty_history() {
        let guard = WriteGuard::after(None);
        assert!(guard.holds(None));
        assert!(!guard.holds(Some(&reading(1, 1.0))));
    }

    #[test]
    fn guard_detects_new_or_changed_prior() {
        let prior = reading(3, 10.0);
        let guard = WriteGuard::after(Some(&prior));
        assert!(guard.holds(Some(&prior)));
        assert!(!guard.holds(Some(&reading(4, 12.0))));
        assert!(!guard.holds(Some(&reading(3, 11.0))));
        assert!(!guard.holds(None));
    }
}
