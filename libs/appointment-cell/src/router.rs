use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
    middleware,
};

use shared_utils::extractor::auth_middleware;
use shared_utils::state::AppState;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppState>) -> Router {
    // All staff operations require authentication
    let protected_routes = Router::new()
        .route("/", get(handlers::index))
        .route("/call_in_patient/", post(handlers::call_in_patient))
        .route("/appointment_completed/", post(handlers::appointment_completed))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
