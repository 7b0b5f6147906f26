use anyhow::Result;
use sqlx::PgExecutor;
use time::OffsetDateTime;

use crate::domain::{Meter, NewReading, Reading, Subscriber};

pub async fn find_meter_by_id<'e>(executor: impl PgExecutor<'e>, meter_id: i32) -> Result<Option<Meter>> {
    let meter = sqlx::query_as::<_, Meter>(
        r#"
        SELECT id, meter_number, point_id
        FROM meters
        WHERE id = $1
        "#,
    )
    .bind(meter_id)
    .fetch_optional(executor)
    .await?;

    Ok(meter)
}

pub async fn find_meter_by_number<'e>(
    executor: impl PgExecutor<'e>,
    meter_number: i32,
) -> Result<Option<Meter>> {
    let meter = sqlx::query_as::<_, Meter>(
        r#"
        SELECT id, meter_number, point_id
        FROM meters
        WHERE meter_number = $1
        "#,
    )
    .bind(meter_number)
    .fetch_optional(executor)
    .await?;

    Ok(meter)
}

/// Take a row lock on the meter for the rest of the enclosing transaction.
///
/// Returns `false` when the meter does not exist.
pub async fn lock_meter<'e>(executor: impl PgExecutor<'e>, meter_id: i32) -> Result<bool> {
    let row: Option<(i32,)> = sqlx::query_as("SELECT id FROM meters WHERE id = $1 FOR UPDATE")
        .bind(meter_id)
        .fetch_optional(executor)
        .await?;

    Ok(row.is_some())
}

pub async fn find_subscriber_by_meter_id<'e>(
    executor: impl PgExecutor<'e>,
    meter_id: i32,
) -> Result<Option<Subscriber>> {
    let subscriber = sqlx::query_as::<_, Subscriber>(
        r#"
        SELECT id, full_name, meter_id
        FROM subscribers
        WHERE meter_id = $1
        ORDER BY id
        LIMIT 1
        "#,
    )
    .bind(meter_id)
    .fetch_optional(executor)
    .await?;

    Ok(subscriber)
}

pub async fn find_reading_by_id<'e>(executor: impl PgExecutor<'e>, reading_id: i32) -> Result<Option<Reading>> {
    let reading = sqlx::query_as::<_, Reading>(
        r#"
        SELECT id, meter_id, item_id, current_read, read_at
        FROM readings
        WHERE id = $1
        "#,
    )
    .bind(reading_id)
    .fetch_optional(executor)
    .await?;

    Ok(reading)
}

/// Readings of one meter, newest first.
///
/// Ties on `read_at` are broken by id so the order is total. A `None` limit
/// binds SQL `NULL`, which Postgres treats as no limit.
pub async fn readings_by_meter<'e>(
    executor: impl PgExecutor<'e>,
    meter_id: i32,
    exclude_id: Option<i32>,
    limit: Option<i64>,
) -> Result<Vec<Reading>> {
    let rows = sqlx::query_as::<_, Reading>(
        r#"
        SELECT id, meter_id, item_id, current_read, read_at
        FROM readings
        WHERE meter_id = $1
          AND ($2::INT4 IS NULL OR id <> $2)
        ORDER BY read_at DESC, id DESC
        LIMIT $3
        "#,
    )
    .bind(meter_id)
    .bind(exclude_id)
    .bind(limit)
    .fetch_all(executor)
    .await?;

    Ok(rows)
}

pub async fn insert_reading<'e>(executor: impl PgExecutor<'e>, reading: &NewReading) -> Result<Reading> {
    let row = sqlx::query_as::<_, Reading>(
        r#"
        INSERT INTO readings (meter_id, item_id, current_read, read_at)
        VALUES ($1, $2, $3, $4)
        RETURNING id, meter_id, item_id, current_read, read_at
        "#,
    )
    .bind(reading.meter_id)
    .bind(reading.item_id)
    .bind(reading.current_read)
    .bind(reading.read_at)
    .fetch_one(executor)
    .await?;

    Ok(row)
}

/// Overwrite the value and timestamp of an existing reading. Returns the
/// number of rows touched (0 when the id no longer exists).
pub async fn update_reading<'e>(
    executor: impl PgExecutor<'e>,
    reading_id: i32,
    current_read: f64,
    read_at: OffsetDateTime,
) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE readings
        SET current_read = $2,
            read_at = $3
        WHERE id = $1
        "#,
    )
    .bind(reading_id)
    .bind(current_read)
    .bind(read_at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}
