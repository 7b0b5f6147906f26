//! Bulk reading import from CSV.
//!
//! Expected header columns (by name):
//! - meter_id
//! - item_id
//! - readcurrent
//!
//! Rows go through the same ingestion path as `POST /api/reader`, in file
//! order, so a file can carry several successive readings of one meter.

use std::{fs::File, path::PathBuf};

use futures::{Stream, StreamExt};
use serde::Deserialize;

use crate::{
    auth::Principal,
    error::ServiceError,
    ingestion::ReadingService,
    store::ReadingStore,
    validation::{check_id, check_register_value, FieldErrors},
};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReadingRow {
    pub meter_id: i32,
    pub item_id: i32,
    pub readcurrent: f64,
}

#[derive(thiserror::Error, Debug)]
pub enum ImportError {
    #[error("failed to open CSV file: {0}")]
    Open(#[from] std::io::Error),
    #[error("line {line}: {message}")]
    Row { line: u64, message: String },
    #[error("store failed during import: {0}")]
    Store(ServiceError),
}

/// Counts reported once the file has been consumed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub accepted: u64,
    pub rejected: u64,
    pub malformed: u64,
}

/// Stream the rows of a CSV file. A malformed row yields an error item and
/// the stream carries on; failing to open the file ends it.
pub fn csv_rows(path: PathBuf) -> impl Stream<Item = Result<ReadingRow, ImportError>> + Send {
    async_stream::stream! {
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) => {
                yield Err(ImportError::Open(e));
                return;
            }
        };
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(file);

        for result in rdr.deserialize::<ReadingRow>() {
            yield result.map_err(|e| ImportError::Row {
                line: e.position().map(|p| p.line()).unwrap_or(0),
                message: e.to_string(),
            });
        }
    }
}

fn check_row(row: &ReadingRow) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    check_id("meter_id", row.meter_id, &mut errors);
    check_id("item_id", row.item_id, &mut errors);
    check_register_value("readcurrent", row.readcurrent, &mut errors);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Feed every row through reading creation.
///
/// Business rejections are counted and skipped. A store failure aborts the
/// import, since later rows would fail the same way.
pub async fn import_readings<S, R>(store: &S, caller: &Principal, rows: R) -> Result<ImportSummary, ImportError>
where
    S: ReadingStore + ?Sized,
    R: Stream<Item = Result<ReadingRow, ImportError>> + Send,
{
    let service = ReadingService::new(store);
    let mut summary = ImportSummary::default();
    let mut rows = std::pin::pin!(rows);

    while let Some(item) = rows.next().await {
        let row = match item {
            Ok(row) => row,
            Err(ImportError::Row { line, message }) => {
                metrics::counter!("reading_import_malformed_total").increment(1);
                tracing::warn!(line, error = %message, "skipping malformed CSV row");
                summary.malformed += 1;
                continue;
            }
            Err(e) => return Err(e),
        };

        if let Err(errors) = check_row(&row) {
            tracing::warn!(meter_id = row.meter_id, ?errors, "skipping invalid CSV row");
            summary.malformed += 1;
            continue;
        }

        match service
            .create_reading(caller, row.meter_id, row.item_id, row.readcurrent)
            .await
        {
            Ok(_) => summary.accepted += 1,
            Err(ServiceError::Persistence(msg)) => {
                return Err(ImportError::Store(ServiceError::Persistence(msg)));
            }
            Err(e) => {
                tracing::warn!(meter_id = row.meter_id, value = row.readcurrent, error = %e, "reading rejected");
                summary.rejected += 1;
            }
        }
    }

    tracing::info!(
        accepted = summary.accepted,
        rejected = summary.rejected,
        malformed = summary.malformed,
        "reading import finished"
    );
    Ok(summary)
}
