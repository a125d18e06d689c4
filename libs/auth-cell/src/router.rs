use std::sync::Arc;

use axum::{
    Router,
    routing::get,
    middleware,
};

use shared_utils::extractor::auth_middleware;
use shared_utils::state::AppState;

use crate::handlers;

pub fn auth_routes(state: Arc<AppState>) -> Router {
    let public_routes = Router::new()
        .route("/login_page/", get(handlers::login_page))
        .route("/login/drchrono/", get(handlers::login_drchrono))
        .route("/complete/drchrono/", get(handlers::complete_drchrono));

    let protected_routes = Router::new()
        .route("/logout/", get(handlers::logout))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
