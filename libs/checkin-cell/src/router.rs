use std::sync::Arc;

use axum::{
    Router,
    routing::get,
    middleware,
};

use shared_utils::extractor::auth_middleware;
use shared_utils::state::AppState;

use crate::handlers;

pub fn checkin_routes(state: Arc<AppState>) -> Router {
    // The kiosk runs inside a signed-in clinician session
    let protected_routes = Router::new()
        .route("/checkin/", get(handlers::checkin_form).post(handlers::checkin_patient))
        .route("/walkin/", get(handlers::walkin_form).post(handlers::register_walkin_patient))
        .route("/demographics/", get(handlers::checkin_form).post(handlers::update_demographics))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
