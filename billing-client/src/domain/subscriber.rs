use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: i32,
    pub full_name: String,
    pub meter_id: i32,
}
