use std::sync::Arc;

use axum::{
    extract::{Extension, Form, State},
    http::HeaderMap,
    Json,
};
use chrono::{NaiveDate, Utc};
use tracing::{debug, warn};

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::clock;
use shared_utils::seal;
use shared_utils::state::AppState;

use crate::forms::FormValidator;
use crate::models::{
    form_error, CheckinInput, DemographicsError, DemographicsInput, DemographicsSnapshot, FormErrors,
    IntakeError, KioskPage, WalkinInput,
};
use crate::services::intake::WalkinOutcome;
use crate::services::{DemographicsService, IntakeService};

pub const WALKIN_REGISTERED: &str = "You have been registered as a new patient; please see the front desk";

fn validator() -> Result<FormValidator, AppError> {
    FormValidator::new().map_err(|e| AppError::Internal(e.to_string()))
}

fn today(headers: &HeaderMap) -> NaiveDate {
    clock::local_today(clock::zone_from_headers(headers), Utc::now())
}

fn demographics_page(state: &AppState, snapshot: &DemographicsSnapshot) -> Result<Json<KioskPage>, AppError> {
    let sealed = seal::seal(snapshot, &state.config.session_secret).map_err(IntakeError::from)?;
    Ok(Json(KioskPage::Demographics { form: snapshot.prefill(sealed), errors: FormErrors::new() }))
}

fn checkin_page(form: CheckinInput, errors: FormErrors) -> Json<KioskPage> {
    Json(KioskPage::Checkin { form, errors })
}

pub async fn checkin_form() -> Json<KioskPage> {
    checkin_page(CheckinInput::default(), FormErrors::new())
}

#[axum::debug_handler]
pub async fn checkin_patient(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    headers: HeaderMap,
    Form(input): Form<CheckinInput>,
) -> Result<Json<KioskPage>, AppError> {
    let validator = validator()?;
    let intake = match validator.validate_checkin(&input) {
        Ok(intake) => intake,
        Err(errors) => return Ok(checkin_page(input, errors)),
    };

    let session = state.doctor_session(&user).await?;
    let result = IntakeService::new(state.scheduler.as_ref(), &state.store, &validator, state.config.match_on_ssn)
        .check_in(&session.access_token, session.doctor.doctor_id, &intake, today(&headers))
        .await;

    match result {
        Ok(snapshot) => demographics_page(&state, &snapshot),
        Err(e @ (IntakeError::NoPatient | IntakeError::NoAppointmentToday)) => {
            debug!("Check-in not completed: {}", e);
            Ok(checkin_page(input, form_error(e.to_string())))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn walkin_form() -> Json<KioskPage> {
    Json(KioskPage::Walkin { form: WalkinInput::default(), errors: FormErrors::new(), notice: None })
}

#[axum::debug_handler]
pub async fn register_walkin_patient(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    headers: HeaderMap,
    Form(input): Form<WalkinInput>,
) -> Result<Json<KioskPage>, AppError> {
    let validator = validator()?;
    let walkin = match validator.validate_walkin(&input) {
        Ok(walkin) => walkin,
        Err(errors) => return Ok(Json(KioskPage::Walkin { form: input, errors, notice: None })),
    };

    let session = state.doctor_session(&user).await?;
    let result = IntakeService::new(state.scheduler.as_ref(), &state.store, &validator, state.config.match_on_ssn)
        .walk_in(&session.access_token, session.doctor.doctor_id, &walkin, today(&headers))
        .await;

    match result {
        Ok(WalkinOutcome::Matched(snapshot)) => demographics_page(&state, &snapshot),
        Ok(WalkinOutcome::Registered { .. }) => Ok(Json(KioskPage::Walkin {
            form: input,
            errors: FormErrors::new(),
            notice: Some(WALKIN_REGISTERED.to_string()),
        })),
        Err(e @ IntakeError::NoAppointmentToday) => Ok(Json(KioskPage::Walkin {
            form: input,
            errors: form_error(e.to_string()),
            notice: None,
        })),
        Err(e) => Err(e.into()),
    }
}

#[axum::debug_handler]
pub async fn update_demographics(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Form(input): Form<DemographicsInput>,
) -> Result<Json<KioskPage>, AppError> {
    let snapshot: DemographicsSnapshot = match seal::open(&input.initial_form_data, &state.config.session_secret) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!("Rejected demographics snapshot: {}", e);
            let message = DemographicsError::InvalidSnapshot(e).to_string();
            return Ok(Json(KioskPage::Demographics { form: input, errors: form_error(message) }));
        }
    };

    let submitted = match validator()?.validate_demographics(&input) {
        Ok(submitted) => submitted,
        Err(errors) => return Ok(Json(KioskPage::Demographics { form: input, errors })),
    };

    let session = state.doctor_session(&user).await?;
    let result = DemographicsService::new(state.scheduler.as_ref(), &state.store)
        .submit(&session.access_token, &snapshot, &submitted, Utc::now())
        .await;

    match result {
        Ok(patient_queue) => Ok(Json(KioskPage::Completed { patient_queue })),
        Err(e) => match e.form_message() {
            Some(message) => Ok(Json(KioskPage::Demographics { form: input, errors: form_error(message) })),
            None => Err(e.into()),
        },
    }
}
