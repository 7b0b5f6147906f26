use serde::{Deserialize, Serialize};

/// Ties a subscriber to the meter and point they are billed on.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct Item {
    pub id: i32,
    pub subscriber_id: i32,
    pub meter_id: i32,
    pub point_id: i32,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct Point {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct Subscription {
    pub id: i32,
    pub subscriber_id: i32,
}

/// An item with its related names resolved, as listed on the dashboard.
/// Related columns are optional because the joins are outer joins.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemView {
    pub item_id: i32,
    pub subscriber_name: Option<String>,
    pub meter_number: Option<i32>,
    pub point_name: Option<String>,
}
