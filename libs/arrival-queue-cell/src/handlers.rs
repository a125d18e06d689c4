use std::sync::Arc;

use axum::{extract::State, http::HeaderMap, Json};
use tracing::{error, info};

use shared_utils::extractor::session_user;
use shared_utils::state::AppState;

use crate::error::ArrivalQueueError;
use crate::models::PollResponse;
use crate::services::ArrivalPollService;

async fn poll(state: &AppState, headers: &HeaderMap) -> Result<Vec<String>, ArrivalQueueError> {
    let user = session_user(headers, &state.config.session_secret).map_err(ArrivalQueueError::Session)?;
    let session = state.doctor_session(&user).await.map_err(ArrivalQueueError::Session)?;
    ArrivalPollService::new(&state.store).poll(session.doctor.doctor_id)
}

/// Every failure, a missing session included, is answered with the fail body.
#[axum::debug_handler]
pub async fn poll_for_updates(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Json<PollResponse> {
    info!("Polling for updates...");

    match poll(&state, &headers).await {
        Ok(updates) => Json(PollResponse::Success { updates }),
        Err(e) => {
            error!("Poll failed: {}", e);
            Json(PollResponse::failed())
        }
    }
}
