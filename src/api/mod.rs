use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::UserRepository;
use crate::state::SharedState;

mod activation;
mod error;
mod observability;
mod status;
mod users;

pub use error::ApiError;

use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn user_repo(&self) -> UserRepository {
        self.shared.store.user_repo(&self.shared.config.security)
    }
}

pub async fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared, prometheus_handle).await)
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.shared.config.server.cors_allowed_origins.clone();

    let api_router = Router::new()
        .route("/users", post(users::create_user))
        .route(
            "/users/{username}",
            get(users::get_user).patch(users::update_user),
        )
        .route("/activation/{token_id}", post(activation::activate))
        .route("/status", get(status::get_status))
        .method_not_allowed_fallback(method_not_allowed);

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api/v1", api_router)
        .route("/metrics", get(observability::get_metrics))
        .with_state(state)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::track_requests))
}

/// Known path, disallowed method: answered with the same JSON error shape
/// as everything else.
async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
