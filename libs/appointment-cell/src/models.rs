use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_database::cache::Appointment;
use shared_database::sync::SyncError;
use shared_database::DbError;
use shared_models::error::AppError;
use shared_models::scheduling::SchedulingError;
use shared_models::status::AppointmentStatus;

// ==============================================================================
// REQUEST / RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CallInRequest {
    pub appointment_id: String,
    pub current_date_time: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionRequest {
    pub appointment_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CallInResponse {
    pub status: &'static str,
    pub avg_wait_time: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AppointmentView {
    pub appointment_id: String,
    pub patient_id: i64,
    pub patient_name: Option<String>,
    pub scheduled_time: Option<NaiveDateTime>,
    pub arrival_time: Option<DateTime<Utc>>,
    pub time_waited: Option<String>,
    /// Remote status text as last synced, or the kiosk's own state after a local change.
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub doctor_id: i64,
    pub date: NaiveDate,
    pub curr_appointments: Vec<AppointmentView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_wait_time: Option<String>,
}

impl AppointmentView {
    pub fn new(appointment: &Appointment, patient_name: Option<String>) -> Self {
        Self {
            appointment_id: appointment.appointment_id.clone(),
            patient_id: appointment.patient_id,
            patient_name,
            scheduled_time: appointment.scheduled_time,
            arrival_time: appointment.arrival_time,
            time_waited: appointment.time_waited.map(crate::services::format_wait),
            status: appointment.status_text.clone(),
        }
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum VisitError {
    #[error("Appointment not found: {0}")]
    NotFound(String),

    #[error("Appointment cannot move from {from} to {to}")]
    InvalidStatusTransition { from: AppointmentStatus, to: AppointmentStatus },

    #[error("Appointment {0} has no recorded arrival")]
    NotArrived(String),

    #[error("Called-in time {called_in} is before arrival at {arrival}")]
    CalledInBeforeArrival { arrival: DateTime<Utc>, called_in: DateTime<Utc> },

    #[error("Invalid appointment time: {0}")]
    InvalidTime(String),

    #[error("Remote status update rejected with HTTP {0}")]
    RemoteRejected(u16),

    #[error(transparent)]
    Scheduling(#[from] SchedulingError),

    #[error(transparent)]
    Store(#[from] DbError),

    #[error(transparent)]
    Sync(#[from] SyncError),
}

impl From<VisitError> for AppError {
    fn from(err: VisitError) -> Self {
        match err {
            VisitError::NotFound(id) => AppError::NotFound(format!("Appointment {}", id)),
            e @ VisitError::InvalidStatusTransition { .. } => AppError::Conflict(e.to_string()),
            e @ VisitError::NotArrived(_) => AppError::Conflict(e.to_string()),
            e @ VisitError::CalledInBeforeArrival { .. } => AppError::BadRequest(e.to_string()),
            VisitError::InvalidTime(msg) => AppError::BadRequest(msg),
            e @ VisitError::RemoteRejected(_) => AppError::ExternalService(e.to_string()),
            VisitError::Scheduling(e) => e.into(),
            VisitError::Store(e) => e.into(),
            VisitError::Sync(e) => e.into(),
        }
    }
}
