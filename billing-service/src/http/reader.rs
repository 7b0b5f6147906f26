use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::{
    auth::Principal,
    error::ServiceError,
    ingestion::{LatestPair, ReadingService},
    validation::{check_id, check_register_value, FieldErrors},
};

#[derive(Debug, Deserialize)]
pub struct UpdateReadingRequest {
    pub readcurrent: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReadingRequest {
    pub meter_id: Option<i32>,
    pub point_id: Option<i32>,
    pub readcurrent: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub message: &'static str,
    pub reading_id: i32,
}

fn required<T: Copy>(field: &str, value: Option<T>, errors: &mut FieldErrors) -> Option<T> {
    if value.is_none() {
        errors
            .entry(field.to_string())
            .or_default()
            .push(format!("The {field} field is required."));
    }
    value
}

fn body_error(rejection: JsonRejection) -> ServiceError {
    let mut errors = FieldErrors::new();
    errors.insert("body".to_string(), vec![rejection.body_text()]);
    ServiceError::InvalidInput(errors)
}

fn path_error(field: &str, rejection: PathRejection) -> ServiceError {
    let mut errors = FieldErrors::new();
    errors.insert(field.to_string(), vec![rejection.body_text()]);
    ServiceError::InvalidInput(errors)
}

/// `POST /api/reader`
pub async fn create_reading(
    State(state): State<AppState>,
    Extension(caller): Extension<Principal>,
    payload: Result<Json<CreateReadingRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ServiceError> {
    let Json(req) = payload.map_err(body_error)?;

    let mut errors = FieldErrors::new();
    let meter_id = required("meterId", req.meter_id, &mut errors);
    let point_id = required("pointId", req.point_id, &mut errors);
    let value = required("readcurrent", req.readcurrent, &mut errors);
    if let Some(id) = meter_id {
        check_id("meterId", id, &mut errors);
    }
    if let Some(id) = point_id {
        check_id("pointId", id, &mut errors);
    }
    if let Some(v) = value {
        check_register_value("readcurrent", v, &mut errors);
    }
    let (Some(meter_id), Some(point_id), Some(value), true) = (meter_id, point_id, value, errors.is_empty()) else {
        return Err(ServiceError::InvalidInput(errors));
    };

    let created = ReadingService::new(state.store.as_ref())
        .create_reading(&caller, meter_id, point_id, value)
        .await?;

    Ok(Json(MessageResponse {
        message: "Reading added successfully",
        reading_id: created.reading_id,
    }))
}

/// `PUT /api/reader/{id}`
pub async fn update_reading(
    State(state): State<AppState>,
    Extension(caller): Extension<Principal>,
    id: Result<Path<i32>, PathRejection>,
    payload: Result<Json<UpdateReadingRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ServiceError> {
    let Path(id) = id.map_err(|e| path_error("id", e))?;
    let Json(req) = payload.map_err(body_error)?;

    let mut errors = FieldErrors::new();
    let value = required("readcurrent", req.readcurrent, &mut errors);
    if let Some(v) = value {
        check_register_value("readcurrent", v, &mut errors);
    }
    let (Some(value), true) = (value, errors.is_empty()) else {
        return Err(ServiceError::InvalidInput(errors));
    };

    let updated = ReadingService::new(state.store.as_ref())
        .update_reading(&caller, id, value)
        .await?;

    Ok(Json(MessageResponse {
        message: "Reading updated successfully",
        reading_id: updated.reading_id,
    }))
}

/// `GET /api/reader/Get/{meterNumber}`
pub async fn latest_pair(
    State(state): State<AppState>,
    meter_number: Result<Path<i32>, PathRejection>,
) -> Result<Json<LatestPair>, ServiceError> {
    let Path(meter_number) = meter_number.map_err(|e| path_error("meterNumber", e))?;

    let pair = ReadingService::new(state.store.as_ref())
        .latest_pair(meter_number)
        .await?;

    Ok(Json(pair))
}
