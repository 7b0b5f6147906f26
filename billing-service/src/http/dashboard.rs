use axum::{extract::State, Extension, Json};
use billing_client::domain::ItemView;

use super::AppState;
use crate::{
    auth::Principal,
    dashboard::{self, DashboardSummary, EntityCounts},
    error::ServiceError,
};

/// `GET /home/index`
pub async fn index(
    State(state): State<AppState>,
    Extension(caller): Extension<Principal>,
) -> Result<Json<DashboardSummary>, ServiceError> {
    metrics::counter!("dashboard_requests_total", "page" => "index").increment(1);
    tracing::debug!(caller = %caller.name, "dashboard summary requested");

    Ok(Json(dashboard::summary(state.store.as_ref()).await?))
}

/// `GET /home/table`
pub async fn table(State(state): State<AppState>) -> Result<Json<EntityCounts>, ServiceError> {
    metrics::counter!("dashboard_requests_total", "page" => "table").increment(1);

    Ok(Json(dashboard::entity_counts(state.store.as_ref()).await?))
}

/// `GET /home/items`
pub async fn items(State(state): State<AppState>) -> Result<Json<Vec<ItemView>>, ServiceError> {
    metrics::counter!("dashboard_requests_total", "page" => "items").increment(1);

    Ok(Json(state.store.list_items().await?))
}
