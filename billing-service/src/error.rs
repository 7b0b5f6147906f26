use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::{
    store::{RecordKind, StoreError},
    validation::FieldErrors,
};

#[derive(thiserror::Error, Debug)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(RecordKind),

    #[error("One or more validation errors occurred")]
    InvalidInput(FieldErrors),

    #[error("{0}")]
    InvalidReading(&'static str),

    #[error("Another reading was recorded for this meter at the same time; reload and retry")]
    Conflict,

    #[error("persistence error: {0}")]
    Persistence(String),
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Unavailable(msg) => ServiceError::Persistence(msg),
            StoreError::Conflict { .. } => ServiceError::Conflict,
            StoreError::Missing(kind) => ServiceError::NotFound(kind),
        }
    }
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::InvalidInput(_) | ServiceError::InvalidReading(_) => StatusCode::BAD_REQUEST,
            ServiceError::Conflict => StatusCode::CONFLICT,
            ServiceError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ServiceError::InvalidInput(errors) => json!({
                "message": self.to_string(),
                "errors": errors,
            }),
            ServiceError::Persistence(detail) => {
                tracing::error!(error = %detail, "request failed on the store");
                json!({ "message": "The data store is unavailable, please try again later" })
            }
            _ => json!({ "message": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_errors_to_status_codes() {
        assert_eq!(ServiceError::NotFound(RecordKind::Meter).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ServiceError::InvalidInput(FieldErrors::new()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ServiceError::InvalidReading("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ServiceError::Conflict.status(), StatusCode::CONFLICT);
        assert_eq!(
            ServiceError::Persistence("down".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn not_found_message_names_the_record() {
        assert_eq!(ServiceError::NotFound(RecordKind::Reading).to_string(), "Reading not found");
        assert_eq!(ServiceError::NotFound(RecordKind::Subscriber).to_string(), "Subscriber not found");
    }

    #[test]
    fn store_errors_convert() {
        assert!(matches!(
            ServiceError::from(StoreError::Conflict { meter_id: 3 }),
            ServiceError::Conflict
        ));
        assert!(matches!(
            ServiceError::from(StoreError::Missing(RecordKind::Reading)),
            ServiceError::NotFound(RecordKind::Reading)
        ));
        assert!(matches!(
            ServiceError::from(StoreError::Unavailable("io".into())),
            ServiceError::Persistence(_)
        ));
    }
}
