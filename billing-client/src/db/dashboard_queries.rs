use anyhow::Result;
use sqlx::PgPool;

use crate::domain::{BillTotals, ItemView};

/// Tables that the dashboard counts rows of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountedTable {
    Subscribers,
    Items,
    Subscriptions,
    Meters,
    Points,
}

impl CountedTable {
    fn count_sql(self) -> &'static str {
        match self {
            Self::Subscribers => "SELECT COUNT(*) FROM subscribers",
            Self::Items => "SELECT COUNT(*) FROM items",
            Self::Subscriptions => "SELECT COUNT(*) FROM subscriptions",
            Self::Meters => "SELECT COUNT(*) FROM meters",
            Self::Points => "SELECT COUNT(*) FROM points",
        }
    }
}

pub async fn count_rows(pool: &PgPool, table: CountedTable) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as(table.count_sql()).fetch_one(pool).await?;
    Ok(count)
}

pub async fn bill_totals(pool: &PgPool) -> Result<BillTotals> {
    let totals = sqlx::query_as::<_, BillTotals>(
        r#"
        SELECT
            COALESCE(SUM(consumption_cost) FILTER (WHERE is_paid), 0)::FLOAT8     AS paid_cost,
            COALESCE(SUM(consumption_cost) FILTER (WHERE NOT is_paid), 0)::FLOAT8 AS unpaid_cost,
            COUNT(*) FILTER (WHERE is_paid)                                      AS paid_count,
            COUNT(*) FILTER (WHERE NOT is_paid)                                  AS unpaid_count
        FROM bills
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(totals)
}

/// Every item with its subscriber, meter and point resolved.
pub async fn list_items(pool: &PgPool) -> Result<Vec<ItemView>> {
    let rows = sqlx::query_as::<_, ItemView>(
        r#"
        SELECT
            i.id           AS item_id,
            s.full_name    AS subscriber_name,
            m.meter_number AS meter_number,
            p.name         AS point_name
        FROM items i
        LEFT JOIN subscribers s ON s.id = i.subscriber_id
        LEFT JOIN meters m ON m.id = i.meter_id
        LEFT JOIN points p ON p.id = i.point_id
        ORDER BY i.id
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
