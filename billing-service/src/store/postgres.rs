use billing_client::{
    db::{
        dashboard_queries::{self, CountedTable},
        reading_queries,
    },
    domain::{BillTotals, ItemView, Meter, NewReading, Reading, Subscriber},
};
use sqlx::postgres::{PgPool, PgPoolOptions};

use super::{DashboardStore, ReadingQuery, ReadingStore, ReadingUpdate, RecordKind, StoreError, WriteGuard};

/// Postgres-backed store.
///
/// Reading writes run in a transaction that first locks the meter row, so two
/// submissions for the same meter serialize and the guard check sees the
/// other's committed row.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(uri: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(uri)
            .await?;
        Ok(Self::new(pool))
    }
}

fn to_sql_limit(limit: Option<usize>) -> Option<i64> {
    limit.map(|l| i64::try_from(l).unwrap_or(i64::MAX))
}

#[async_trait::async_trait]
impl ReadingStore for PgStore {
    async fn find_meter_by_id(&self, meter_id: i32) -> Result<Option<Meter>, StoreError> {
        Ok(reading_queries::find_meter_by_id(&self.pool, meter_id).await?)
    }

    async fn find_meter_by_number(&self, meter_number: i32) -> Result<Option<Meter>, StoreError> {
        Ok(reading_queries::find_meter_by_number(&self.pool, meter_number).await?)
    }

    async fn find_subscriber_by_meter_id(&self, meter_id: i32) -> Result<Option<Subscriber>, StoreError> {
        Ok(reading_queries::find_subscriber_by_meter_id(&self.pool, meter_id).await?)
    }

    async fn find_reading_by_id(&self, reading_id: i32) -> Result<Option<Reading>, StoreError> {
        Ok(reading_queries::find_reading_by_id(&self.pool, reading_id).await?)
    }

    async fn query_readings(&self, query: ReadingQuery) -> Result<Vec<Reading>, StoreError> {
        let rows = reading_queries::readings_by_meter(
            &self.pool,
            query.meter_id,
            query.exclude_id,
            to_sql_limit(query.limit),
        )
        .await?;
        Ok(rows)
    }

    async fn insert_reading(&self, reading: NewReading, guard: WriteGuard) -> Result<Reading, StoreError> {
        let meter_id = reading.meter_id;
        let mut tx = self.pool.begin().await?;

        if !reading_queries::lock_meter(&mut *tx, meter_id).await? {
            return Err(StoreError::Missing(RecordKind::Meter));
        }

        let latest = reading_queries::readings_by_meter(&mut *tx, meter_id, None, Some(1)).await?;
        if !guard.holds(latest.first()) {
            // Dropping `tx` rolls back and releases the lock.
            return Err(StoreError::Conflict { meter_id });
        }

        let row = reading_queries::insert_reading(&mut *tx, &reading).await?;
        tx.commit().await?;

        Ok(row)
    }

    async fn update_reading(&self, update: ReadingUpdate, guard: WriteGuard) -> Result<(), StoreError> {
        let meter_id = update.meter_id;
        let mut tx = self.pool.begin().await?;

        if !reading_queries::lock_meter(&mut *tx, meter_id).await? {
            return Err(StoreError::Missing(RecordKind::Meter));
        }

        let latest =
            reading_queries::readings_by_meter(&mut *tx, meter_id, Some(update.id), Some(1)).await?;
        if !guard.holds(latest.first()) {
            return Err(StoreError::Conflict { meter_id });
        }

        let touched =
            reading_queries::update_reading(&mut *tx, update.id, update.current_read, update.read_at)
                .await?;
        if touched == 0 {
            return Err(StoreError::Missing(RecordKind::Reading));
        }
        tx.commit().await?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl DashboardStore for PgStore {
    async fn count(&self, table: CountedTable) -> Result<i64, StoreError> {
        Ok(dashboard_queries::count_rows(&self.pool, table).await?)
    }

    async fn bill_totals(&self) -> Result<BillTotals, StoreError> {
        Ok(dashboard_queries::bill_totals(&self.pool).await?)
    }

    async fn list_items(&self) -> Result<Vec<ItemView>, StoreError> {
        Ok(dashboard_queries::list_items(&self.pool).await?)
    }
}
