pub mod middleware;
pub mod rest;
pub mod state;

pub use middleware::require_user;
pub use rest::{global_log_handler, list_history_handler, record_diagnosis_handler, resolve_diagnosis_handler};

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use state::AppState;
use std::sync::Arc;

/// Builds the API router over the shared state.
pub fn router(app_state: Arc<AppState>) -> Router {
    // Public routes (no identity required)
    let public_routes = Router::new().route("/global-log", get(global_log_handler));

    // Protected routes (identity required)
    let protected_routes = Router::new()
        .route("/diagnoses", post(record_diagnosis_handler).get(list_history_handler))
        .route("/diagnoses/{id}", delete(resolve_diagnosis_handler))
        .layer(axum_middleware::from_fn(require_user));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(app_state)
}
