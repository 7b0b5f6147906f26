use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A stored consumption reading. `current_read` is the cumulative register
/// value shown on the meter at `read_at`.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct Reading {
    pub id: i32,
    pub meter_id: i32,
    pub item_id: i32,
    pub current_read: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub read_at: OffsetDateTime,
}

/// A reading that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReading {
    pub meter_id: i32,
    pub item_id: i32,
    pub current_read: f64,
    pub read_at: OffsetDateTime,
}

impl NewReading {
    pub fn with_id(self, id: i32) -> Reading {
        Reading {
            id,
            meter_id: self.meter_id,
            item_id: self.item_id,
            current_read: self.current_read,
            read_at: self.read_at,
        }
    }
}
