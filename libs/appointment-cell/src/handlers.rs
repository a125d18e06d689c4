use std::sync::Arc;

use axum::{
    extract::{Extension, Form, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;
use tracing::debug;

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::clock;
use shared_utils::state::AppState;

use crate::models::{CallInRequest, CallInResponse, CompletionRequest, DashboardView, VisitError};
use crate::services::{DashboardService, VisitService};

#[axum::debug_handler]
pub async fn index(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    headers: HeaderMap,
) -> Result<Json<DashboardView>, AppError> {
    let session = state.doctor_session(&user).await?;
    let today = clock::local_today(clock::zone_from_headers(&headers), Utc::now());

    let view = DashboardService::new(state.scheduler.as_ref(), &state.store)
        .load(&session.access_token, session.doctor.doctor_id, today)
        .await?;

    Ok(Json(view))
}

#[axum::debug_handler]
pub async fn call_in_patient(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    headers: HeaderMap,
    Form(request): Form<CallInRequest>,
) -> Result<Json<CallInResponse>, AppError> {
    let session = state.doctor_session(&user).await?;
    let called_in = clock::parse_local_datetime(&request.current_date_time, clock::zone_from_headers(&headers))
        .map_err(VisitError::InvalidTime)?;
    debug!("Calling in appointment {} at {}", request.appointment_id, called_in);

    let avg_wait_time = VisitService::new(state.scheduler.as_ref(), &state.store)
        .call_in(&session.access_token, session.doctor.doctor_id, &request.appointment_id, called_in)
        .await?;

    Ok(Json(CallInResponse { status: "success", avg_wait_time }))
}

#[axum::debug_handler]
pub async fn appointment_completed(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Form(request): Form<CompletionRequest>,
) -> Result<&'static str, AppError> {
    let session = state.doctor_session(&user).await?;

    VisitService::new(state.scheduler.as_ref(), &state.store)
        .complete(&session.access_token, session.doctor.doctor_id, &request.appointment_id)
        .await?;

    Ok("ok")
}
