use std::sync::Arc;

use axum::Router;

use appointment_cell::router::appointment_routes;
use arrival_queue_cell::router::arrival_queue_routes;
use auth_cell::router::auth_routes;
use checkin_cell::router::checkin_routes;
use shared_utils::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(appointment_routes(state.clone()))
        .merge(checkin_routes(state.clone()))
        .merge(arrival_queue_routes(state.clone()))
        .merge(auth_routes(state))
}
