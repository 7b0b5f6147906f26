//! Reading ingestion: look up the meter, check the candidate against the
//! meter's latest reading, then write.

use billing_client::domain::NewReading;
use serde::Serialize;
use time::OffsetDateTime;

use crate::{
    auth::Principal,
    error::ServiceError,
    store::{ReadingQuery, ReadingStore, ReadingUpdate, RecordKind, StoreError, WriteGuard},
    validation::{validate_reading, Verdict},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadingCreated {
    pub reading_id: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadingUpdated {
    pub reading_id: i32,
}

/// The two most recent readings of a meter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestPair {
    pub meter_number: i32,
    pub subscriber_name: String,
    pub current_reading: Option<f64>,
    #[serde(rename = "previousReadings")]
    pub previous_reading: Option<f64>,
}

/// Reading operations over a borrowed store handle, built per request.
pub struct ReadingService<'a, S: ReadingStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: ReadingStore + ?Sized> ReadingService<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub async fn create_reading(
        &self,
        caller: &Principal,
        meter_id: i32,
        item_id: i32,
        value: f64,
    ) -> Result<ReadingCreated, ServiceError> {
        let meter = self
            .store
            .find_meter_by_id(meter_id)
            .await?
            .ok_or(ServiceError::NotFound(RecordKind::Meter))?;

        self.store
            .find_subscriber_by_meter_id(meter.id)
            .await?
            .ok_or(ServiceError::NotFound(RecordKind::Subscriber))?;

        let prior = self
            .store
            .query_readings(ReadingQuery::for_meter(meter.id).limit(1))
            .await?
            .into_iter()
            .next();

        check(meter.id, value, prior.as_ref().map(|r| r.current_read))?;

        let new_reading = NewReading {
            meter_id: meter.id,
            item_id,
            current_read: value,
            read_at: OffsetDateTime::now_utc(),
        };
        let row = self
            .store
            .insert_reading(new_reading, WriteGuard::after(prior.as_ref()))
            .await
            .inspect_err(|e| record_write_failure(meter.id, e))?;

        metrics::counter!("reading_created_total").increment(1);
        tracing::info!(
            caller = %caller.name,
            meter_id = meter.id,
            reading_id = row.id,
            value,
            "reading created"
        );

        Ok(ReadingCreated { reading_id: row.id })
    }

    pub async fn update_reading(
        &self,
        caller: &Principal,
        reading_id: i32,
        new_value: f64,
    ) -> Result<ReadingUpdated, ServiceError> {
        let reading = self
            .store
            .find_reading_by_id(reading_id)
            .await?
            .ok_or(ServiceError::NotFound(RecordKind::Reading))?;

        let prior = self
            .store
            .query_readings(
                ReadingQuery::for_meter(reading.meter_id)
                    .excluding(reading.id)
                    .limit(1),
            )
            .await?
            .into_iter()
            .next();

        check(reading.meter_id, new_value, prior.as_ref().map(|r| r.current_read))?;

        let update = ReadingUpdate {
            id: reading.id,
            meter_id: reading.meter_id,
            current_read: new_value,
            read_at: OffsetDateTime::now_utc(),
        };
        self.store
            .update_reading(update, WriteGuard::after(prior.as_ref()))
            .await
            .inspect_err(|e| record_write_failure(reading.meter_id, e))?;

        metrics::counter!("reading_updated_total").increment(1);
        tracing::info!(
            caller = %caller.name,
            meter_id = reading.meter_id,
            reading_id = reading.id,
            previous_value = reading.current_read,
            value = new_value,
            "reading updated"
        );

        Ok(ReadingUpdated { reading_id: reading.id })
    }

    /// Latest and second-latest readings of the meter with this number.
    /// A meter without readings is a valid answer, with both values absent.
    pub async fn latest_pair(&self, meter_number: i32) -> Result<LatestPair, ServiceError> {
        let meter = self
            .store
            .find_meter_by_number(meter_number)
            .await?
            .ok_or(ServiceError::NotFound(RecordKind::Meter))?;

        let subscriber = self
            .store
            .find_subscriber_by_meter_id(meter.id)
            .await?
            .ok_or(ServiceError::NotFound(RecordKind::Subscriber))?;

        let mut readings = self
            .store
            .query_readings(ReadingQuery::for_meter(meter.id).limit(2))
            .await?
            .into_iter();

        let current = readings.next();
        let previous = readings.next();

        Ok(LatestPair {
            meter_number: meter.meter_number,
            subscriber_name: subscriber.full_name,
            current_reading: current.map(|r| r.current_read),
            previous_reading: previous.map(|r| r.current_read),
        })
    }
}

fn check(meter_id: i32, candidate: f64, prior: Option<f64>) -> Result<(), ServiceError> {
    match validate_reading(candidate, prior) {
        Verdict::Accept => Ok(()),
        Verdict::Reject(reason) => {
            metrics::counter!("reading_rejected_total").increment(1);
            tracing::debug!(meter_id, candidate, ?prior, reason, "reading rejected");
            Err(ServiceError::InvalidReading(reason))
        }
    }
}

fn record_write_failure(meter_id: i32, e: &StoreError) {
    match e {
        StoreError::Conflict { .. } => {
            metrics::counter!("reading_conflict_total").increment(1);
            tracing::warn!(meter_id, "reading write lost a race with another submission");
        }
        other => {
            tracing::warn!(meter_id, error = %other, "reading write failed");
        }
    }
}
