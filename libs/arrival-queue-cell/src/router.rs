use std::sync::Arc;

use axum::{routing::post, Router};

use shared_utils::state::AppState;

use crate::handlers::poll_for_updates;

pub fn arrival_queue_routes(state: Arc<AppState>) -> Router {
    // Resolves the session itself so an anonymous poll still gets the JSON fail body.
    Router::new()
        .route("/poll_for_updates/", post(poll_for_updates))
        .with_state(state)
}
