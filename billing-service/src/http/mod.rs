//! HTTP surface: the reading API and the dashboard, each behind a role guard.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    auth::{authorize, AuthError, Authenticator, Role, RoleSet},
    store::BillingStore,
};

pub mod dashboard;
pub mod reader;

/// Roles admitted to the reading API.
pub const READER_ROLES: RoleSet = RoleSet::of(&[Role::User]);
/// Roles admitted to the dashboard.
pub const DASHBOARD_ROLES: RoleSet = RoleSet::of(&[Role::User, Role::Admin]);

/// Shared handles passed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn BillingStore>,
    pub auth: Arc<Authenticator>,
}

impl AppState {
    pub fn new(store: Arc<dyn BillingStore>, auth: Authenticator) -> Self {
        Self {
            store,
            auth: Arc::new(auth),
        }
    }
}

#[derive(Clone)]
struct Guard {
    auth: Arc<Authenticator>,
    required: RoleSet,
}

/// Resolve the caller and check their roles; the [`Principal`] is handed to
/// the handler as a request extension.
///
/// [`Principal`]: crate::auth::Principal
async fn require_roles(State(guard): State<Guard>, mut req: Request, next: Next) -> Result<Response, AuthError> {
    let principal = guard
        .auth
        .authenticate(req.headers())
        .and_then(|p| authorize(&p, guard.required).map(|()| p))
        .inspect_err(|e| {
            metrics::counter!("http_auth_denied_total").increment(1);
            tracing::debug!(error = %e, path = %req.uri().path(), "request denied");
        })?;

    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

fn guarded(router: Router<AppState>, state: &AppState, required: RoleSet) -> Router<AppState> {
    let guard = Guard {
        auth: state.auth.clone(),
        required,
    };
    router.route_layer(middleware::from_fn_with_state(guard, require_roles))
}

pub fn router(state: AppState) -> Router {
    let reader_api = Router::new()
        .route("/api/reader", post(reader::create_reading))
        .route("/api/reader/:id", put(reader::update_reading))
        .route("/api/reader/Get/:meter_number", get(reader::latest_pair));

    let dashboard = Router::new()
        .route("/home", get(dashboard::index))
        .route("/home/index", get(dashboard::index))
        .route("/home/table", get(dashboard::table))
        .route("/home/items", get(dashboard::items));

    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    Router::new()
        .merge(guarded(reader_api, &state, READER_ROLES))
        .merge(guarded(dashboard, &state, DASHBOARD_ROLES))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
