use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct Bill {
    pub id: i32,
    pub subscriber_id: i32,
    pub consumption_cost: f64,
    pub is_paid: bool,
}

/// Paid/unpaid split over every bill in the store.
#[derive(Debug, Clone, Default, PartialEq, sqlx::FromRow, Serialize)]
pub struct BillTotals {
    pub paid_cost: f64,
    pub unpaid_cost: f64,
    pub paid_count: i64,
    pub unpaid_count: i64,
}

impl BillTotals {
    pub fn from_bills<'a>(bills: impl IntoIterator<Item = &'a Bill>) -> Self {
        bills.into_iter().fold(Self::default(), |mut acc, b| {
            if b.is_paid {
                acc.paid_cost += b.consumption_cost;
                acc.paid_count += 1;
            } else {
                acc.unpaid_cost += b.consumption_cost;
                acc.unpaid_count += 1;
            }
            acc
        })
    }
}
