use billing_client::db::dashboard_queries::CountedTable;
use serde::Serialize;

use crate::{error::ServiceError, store::DashboardStore};

/// Row counts shown on the table page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityCounts {
    pub subscriber_count: i64,
    pub item_count: i64,
    pub subscription_count: i64,
    pub meter_count: i64,
    pub point_count: i64,
}

/// Landing page summary. Amounts are whole currency units, truncated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    #[serde(flatten)]
    pub counts: EntityCounts,
    pub total_amount_collected: i64,
    pub total_amount_uncollected: i64,
    pub total_bills_paid: i64,
    pub total_bills_unpaid: i64,
}

pub async fn entity_counts<S: DashboardStore + ?Sized>(store: &S) -> Result<EntityCounts, ServiceError> {
    Ok(EntityCounts {
        subscriber_count: store.count(CountedTable::Subscribers).await?,
        item_count: store.count(CountedTable::Items).await?,
        subscription_count: store.count(CountedTable::Subscriptions).await?,
        meter_count: store.count(CountedTable::Meters).await?,
        point_count: store.count(CountedTable::Points).await?,
    })
}

pub async fn summary<S: DashboardStore + ?Sized>(store: &S) -> Result<DashboardSummary, ServiceError> {
    let counts = entity_counts(store).await?;
    let bills = store.bill_totals().await?;

    Ok(DashboardSummary {
        counts,
        total_amount_collected: bills.paid_cost.trunc() as i64,
        total_amount_uncollected: bills.unpaid_cost.trunc() as i64,
        total_bills_paid: bills.paid_count,
        total_bills_unpaid: bills.unpaid_count,
    })
}
