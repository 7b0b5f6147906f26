use std::{
    cmp::Reverse,
    path::Path,
    sync::atomic::{AtomicBool, Ordering},
};

use billing_client::{
    db::dashboard_queries::CountedTable,
    domain::{Bill, BillTotals, Item, ItemView, Meter, NewReading, Point, Reading, Subscriber, Subscription},
};
use serde::Deserialize;
use tokio::sync::Mutex;

use super::{DashboardStore, ReadingQuery, ReadingStore, ReadingUpdate, RecordKind, StoreError, WriteGuard};

/// Full contents of a [`MemoryStore`]. Also the format of the JSON seed file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub meters: Vec<Meter>,
    pub subscribers: Vec<Subscriber>,
    pub readings: Vec<Reading>,
    pub bills: Vec<Bill>,
    pub items: Vec<Item>,
    pub points: Vec<Point>,
    pub subscriptions: Vec<Subscription>,
}

impl Snapshot {
    fn readings_newest_first(&self, query: ReadingQuery) -> Vec<Reading> {
        let mut rows: Vec<Reading> = self
            .readings
            .iter()
            .filter(|r| r.meter_id == query.meter_id && Some(r.id) != query.exclude_id)
            .cloned()
            .collect();
        rows.sort_by_key(|r| Reverse((r.read_at, r.id)));
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        rows
    }

    fn next_reading_id(&self) -> i32 {
        self.readings.iter().map(|r| r.id).max().unwrap_or(0) + 1
    }

    fn has_meter(&self, meter_id: i32) -> bool {
        self.meters.iter().any(|m| m.id == meter_id)
    }
}

/// Store kept entirely in process memory, behind one lock. Used by tests and
/// by the `memory` store kind for local runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<Snapshot>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            state: Mutex::new(snapshot),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn load_seed(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let snapshot: Snapshot = serde_json::from_str(&contents)?;
        tracing::info!(
            path = %path.display(),
            meters = snapshot.meters.len(),
            readings = snapshot.readings.len(),
            "memory store seeded"
        );
        Ok(Self::from_snapshot(snapshot))
    }

    /// Make every subsequent write fail as if the backend were down.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.state.lock().await.clone()
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is refusing writes".to_string()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ReadingStore for MemoryStore {
    async fn find_meter_by_id(&self, meter_id: i32) -> Result<Option<Meter>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.meters.iter().find(|m| m.id == meter_id).cloned())
    }

    async fn find_meter_by_number(&self, meter_number: i32) -> Result<Option<Meter>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.meters.iter().find(|m| m.meter_number == meter_number).cloned())
    }

    async fn find_subscriber_by_meter_id(&self, meter_id: i32) -> Result<Option<Subscriber>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .subscribers
            .iter()
            .filter(|s| s.meter_id == meter_id)
            .min_by_key(|s| s.id)
            .cloned())
    }

    async fn find_reading_by_id(&self, reading_id: i32) -> Result<Option<Reading>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.readings.iter().find(|r| r.id == reading_id).cloned())
    }

    async fn query_readings(&self, query: ReadingQuery) -> Result<Vec<Reading>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.readings_newest_first(query))
    }

    async fn insert_reading(&self, reading: NewReading, guard: WriteGuard) -> Result<Reading, StoreError> {
        self.check_writable()?;
        let mut state = self.state.lock().await;

        if !state.has_meter(reading.meter_id) {
            return Err(StoreError::Missing(RecordKind::Meter));
        }
        let latest = state.readings_newest_first(ReadingQuery::for_meter(reading.meter_id).limit(1));
        if !guard.holds(latest.first()) {
            return Err(StoreError::Conflict {
                meter_id: reading.meter_id,
            });
        }

        let row = reading.with_id(state.next_reading_id());
        state.readings.push(row.clone());
        Ok(row)
    }

    async fn update_reading(&self, update: ReadingUpdate, guard: WriteGuard) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut state = self.state.lock().await;

        let others = state.readings_newest_first(
            ReadingQuery::for_meter(update.meter_id)
                .excluding(update.id)
                .limit(1),
        );
        if !guard.holds(others.first()) {
            return Err(StoreError::Conflict {
                meter_id: update.meter_id,
            });
        }

        let row = state
            .readings
            .iter_mut()
            .find(|r| r.id == update.id)
            .ok_or(StoreError::Missing(RecordKind::Reading))?;
        row.current_read = update.current_read;
        row.read_at = update.read_at;
        Ok(())
    }
}

#[async_trait::async_trait]
impl DashboardStore for MemoryStore {
    async fn count(&self, table: CountedTable) -> Result<i64, StoreError> {
        let state = self.state.lock().await;
        let n = match table {
            CountedTable::Subscribers => state.subscribers.len(),
            CountedTable::Items => state.items.len(),
            CountedTable::Subscriptions => state.subscriptions.len(),
            CountedTable::Meters => state.meters.len(),
            CountedTable::Points => state.points.len(),
        };
        Ok(n as i64)
    }

    async fn bill_totals(&self) -> Result<BillTotals, StoreError> {
        let state = self.state.lock().await;
        Ok(BillTotals::from_bills(&state.bills))
    }

    async fn list_items(&self) -> Result<Vec<ItemView>, StoreError> {
        let state = self.state.lock().await;
        let mut items: Vec<ItemView> = state
            .items
            .iter()
            .map(|item| ItemView {
                item_id: item.id,
                subscriber_name: state
                    .subscribers
                    .iter()
                    .find(|s| s.id == item.subscriber_id)
                    .map(|s| s.full_name.clone()),
                meter_number: state
                    .meters
                    .iter()
                    .find(|m| m.id == item.meter_id)
                    .map(|m| m.meter_number),
                point_name: state
                    .points
                    .iter()
                    .find(|p| p.id == item.point_id)
                    .map(|p| p.name.clone()),
            })
            .collect();
        items.sort_by_key(|i| i.item_id);
        Ok(items)
    }
}
