// Shared fixtures for the HTTP tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use billing_client::{
    db::dashboard_queries::CountedTable,
    domain::{Bill, BillTotals, Item, ItemView, Meter, NewReading, Point, Reading, Subscriber, Subscription},
};
use billing_service::{
    auth::{token_digest, Authenticator, Role},
    config::{AuthConfig, PrincipalConfig},
    router,
    store::{
        DashboardStore, MemoryStore, ReadingQuery, ReadingStore, ReadingUpdate, Snapshot, StoreError, WriteGuard,
    },
    AppState,
};
use time::{macros::datetime, OffsetDateTime};
use tokio::sync::Mutex;
use tower::ServiceExt;

pub const READER_TOKEN: &str = "reader-token";
pub const ADMIN_TOKEN: &str = "admin-token";

/// Meter 1 (#1001, "Amal Haddad") has readings 10 (id 1) then 15 (id 2).
/// Meter 2 (#1002, "Omar Saleh") has none. Meter 3 (#1003) has no subscriber.
pub fn snapshot() -> Snapshot {
    Snapshot {
        meters: vec![
            Meter {
                id: 1,
                meter_number: 1001,
                point_id: 1,
            },
            Meter {
                id: 2,
                meter_number: 1002,
                point_id: 1,
            },
            Meter {
                id: 3,
                meter_number: 1003,
                point_id: 2,
            },
        ],
        subscribers: vec![
            Subscriber {
                id: 1,
                full_name: "Amal Haddad".to_string(),
                meter_id: 1,
            },
            Subscriber {
                id: 2,
                full_name: "Omar Saleh".to_string(),
                meter_id: 2,
            },
        ],
        readings: vec![
            Reading {
                id: 1,
                meter_id: 1,
                item_id: 1,
                current_read: 10.0,
                read_at: datetime!(2024-01-01 00:00:00 UTC),
            },
            Reading {
                id: 2,
                meter_id: 1,
                item_id: 1,
                current_read: 15.0,
                read_at: datetime!(2024-02-01 00:00:00 UTC),
            },
        ],
        points: vec![
            Point {
                id: 1,
                name: "North".to_string(),
            },
            Point {
                id: 2,
                name: "South".to_string(),
            },
        ],
        items: vec![
            Item {
                id: 1,
                subscriber_id: 1,
                meter_id: 1,
                point_id: 1,
            },
            Item {
                id: 2,
                subscriber_id: 2,
                meter_id: 2,
                point_id: 1,
            },
        ],
        subscriptions: vec![Subscription { id: 1, subscriber_id: 1 }],
        bills: vec![
            Bill {
                id: 1,
                subscriber_id: 1,
                consumption_cost: 120.4,
                is_paid: true,
            },
            Bill {
                id: 2,
                subscriber_id: 2,
                consumption_cost: 33.9,
                is_paid: false,
            },
        ],
    }
}

pub fn authenticator() -> Authenticator {
    Authenticator::from_config(&AuthConfig {
        principals: vec![
            PrincipalConfig {
                name: "field-reader".to_string(),
                token_blake3: token_digest(READER_TOKEN),
                roles: vec![Role::User],
            },
            PrincipalConfig {
                name: "office-admin".to_string(),
                token_blake3: token_digest(ADMIN_TOKEN),
                roles: vec![Role::Admin],
            },
        ],
    })
    .unwrap()
}

pub fn app() -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::from_snapshot(snapshot()));
    let app = router(AppState::new(store.clone(), authenticator()));
    (app, store)
}

/// Wraps a [`MemoryStore`] so that one competing reading of `competing` lands
/// on the meter right after the next history read.
pub struct RacingStore {
    pub inner: Arc<MemoryStore>,
    competing: Mutex<Option<f64>>,
}

#[async_trait::async_trait]
impl ReadingStore for RacingStore {
    async fn find_meter_by_id(&self, meter_id: i32) -> Result<Option<Meter>, StoreError> {
        self.inner.find_meter_by_id(meter_id).await
    }

    async fn find_meter_by_number(&self, meter_number: i32) -> Result<Option<Meter>, StoreError> {
        self.inner.find_meter_by_number(meter_number).await
    }

    async fn find_subscriber_by_meter_id(&self, meter_id: i32) -> Result<Option<Subscriber>, StoreError> {
        self.inner.find_subscriber_by_meter_id(meter_id).await
    }

    async fn find_reading_by_id(&self, reading_id: i32) -> Result<Option<Reading>, StoreError> {
        self.inner.find_reading_by_id(reading_id).await
    }

    async fn query_readings(&self, query: ReadingQuery) -> Result<Vec<Reading>, StoreError> {
        let rows = self.inner.query_readings(query).await?;
        if let Some(value) = self.competing.lock().await.take() {
            let latest = self
                .inner
                .query_readings(ReadingQuery::for_meter(query.meter_id).limit(1))
                .await?;
            self.inner
                .insert_reading(
                    NewReading {
                        meter_id: query.meter_id,
                        item_id: 1,
                        current_read: value,
                        read_at: OffsetDateTime::now_utc(),
                    },
                    WriteGuard::after(latest.first()),
                )
                .await?;
        }
        Ok(rows)
    }

    async fn insert_reading(&self, reading: NewReading, guard: WriteGuard) -> Result<Reading, StoreError> {
        self.inner.insert_reading(reading, guard).await
    }

    async fn update_reading(&self, update: ReadingUpdate, guard: WriteGuard) -> Result<(), StoreError> {
        self.inner.update_reading(update, guard).await
    }
}

#[async_trait::async_trait]
impl DashboardStore for RacingStore {
    async fn count(&self, table: CountedTable) -> Result<i64, StoreError> {
        self.inner.count(table).await
    }

    async fn bill_totals(&self) -> Result<BillTotals, StoreError> {
        self.inner.bill_totals().await
    }

    async fn list_items(&self) -> Result<Vec<ItemView>, StoreError> {
        self.inner.list_items().await
    }
}

/// Like [`app`], but the next reading write on any meter loses a race
/// against a competing reading of `competing`.
pub fn racing_app(competing: f64) -> (Router, Arc<MemoryStore>) {
    let inner = Arc::new(MemoryStore::from_snapshot(snapshot()));
    let store = Arc::new(RacingStore {
        inner: inner.clone(),
        competing: Mutex::new(Some(competing)),
    });
    let app = router(AppState::new(store, authenticator()));
    (app, inner)
}

pub fn request(method: &str, uri: &str, token: Option<&str>, body: Option<serde_json::Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn send(app: &Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            serde_json::Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, json)
}
