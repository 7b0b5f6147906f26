use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct Meter {
    pub id: i32,
    /// Number printed on the meter; unique across the fleet.
    pub meter_number: i32,
    pub point_id: i32,
}
