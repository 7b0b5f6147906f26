pub mod auth;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod http;
pub mod import;
pub mod ingestion;
pub mod metrics_server;
pub mod observability;
pub mod store;
pub mod validation;

pub use error::ServiceError;
pub use http::{router, AppState};
