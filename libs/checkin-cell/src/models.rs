use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use appointment_cell::models::VisitError;
use shared_database::sync::SyncError;
use shared_database::DbError;
use shared_models::error::AppError;
use shared_models::scheduling::{RemotePatient, SchedulingError};
use shared_utils::seal::SealError;

/// Field name to messages. Errors not tied to a field go under [`NON_FIELD_ERRORS`].
pub type FormErrors = BTreeMap<String, Vec<String>>;

pub const NON_FIELD_ERRORS: &str = "__all__";

pub const NO_PATIENT_FOUND: &str =
    "No patient found; please check that your name and social security number have been entered correctly";
pub const NO_APPOINTMENT_TODAY: &str = "You have no appointments scheduled for today";
pub const DEMOGRAPHICS_UPDATE_FAILED: &str =
    "Sorry, we are unable to update your demographics data right now - please try again";
pub const STATUS_UPDATE_FAILED: &str =
    "Sorry, we are unable to update your appointment status right now - please try again";

pub fn form_error(message: impl Into<String>) -> FormErrors {
    let mut errors = FormErrors::new();
    errors.insert(NON_FIELD_ERRORS.to_string(), vec![message.into()]);
    errors
}

// ==============================================================================
// SUBMITTED FORMS
// ==============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckinInput {
    pub first_name: String,
    pub last_name: String,
    pub social_security_number: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkinInput {
    pub first_name: String,
    pub last_name: String,
    pub social_security_number: String,
    pub gender: String,
}

impl WalkinInput {
    pub fn identity(&self) -> CheckinInput {
        CheckinInput {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            social_security_number: self.social_security_number.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DemographicsInput {
    pub patient_id: String,
    pub appointment_id: String,
    pub cell_phone: String,
    pub email: String,
    pub zip_code: String,
    pub address: String,
    pub emergency_contact_phone: String,
    pub emergency_contact_name: String,
    pub initial_form_data: String,
}

// ==============================================================================
// CLEANED DATA
// ==============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Intake {
    pub first_name: String,
    pub last_name: String,
    /// Normalized to `XXX-XX-XXXX`.
    pub social_security_number: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WalkinIntake {
    pub intake: Intake,
    pub gender: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Demographics {
    pub cell_phone: String,
    pub email: String,
    pub zip_code: String,
    pub address: String,
    pub emergency_contact_phone: String,
    pub emergency_contact_name: String,
}

impl Demographics {
    pub const FIELDS: [&'static str; 6] = [
        "cell_phone",
        "email",
        "zip_code",
        "address",
        "emergency_contact_phone",
        "emergency_contact_name",
    ];

    pub fn get(&self, field: &str) -> Option<&str> {
        let value = match field {
            "cell_phone" => &self.cell_phone,
            "email" => &self.email,
            "zip_code" => &self.zip_code,
            "address" => &self.address,
            "emergency_contact_phone" => &self.emergency_contact_phone,
            "emergency_contact_name" => &self.emergency_contact_name,
            _ => return None,
        };
        Some(value.as_str())
    }

    pub fn from_remote(patient: &RemotePatient) -> Self {
        let text = |value: &Option<String>| value.clone().unwrap_or_default();
        Self {
            cell_phone: text(&patient.cell_phone),
            email: text(&patient.email),
            zip_code: text(&patient.zip_code),
            address: text(&patient.address),
            emergency_contact_phone: text(&patient.emergency_contact_phone),
            emergency_contact_name: text(&patient.emergency_contact_name),
        }
    }
}

/// Values shown when the demographics form was first rendered. Carried through the
/// browser sealed in `initial_form_data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemographicsSnapshot {
    pub patient_id: i64,
    pub appointment_id: String,
    #[serde(flatten)]
    pub values: Demographics,
}

impl DemographicsSnapshot {
    pub fn prefill(&self, initial_form_data: String) -> DemographicsInput {
        DemographicsInput {
            patient_id: self.patient_id.to_string(),
            appointment_id: self.appointment_id.clone(),
            cell_phone: self.values.cell_phone.clone(),
            email: self.values.email.clone(),
            zip_code: self.values.zip_code.clone(),
            address: self.values.address.clone(),
            emergency_contact_phone: self.values.emergency_contact_phone.clone(),
            emergency_contact_name: self.values.emergency_contact_name.clone(),
            initial_form_data,
        }
    }
}

// ==============================================================================
// PAGES
// ==============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "page", rename_all = "lowercase")]
pub enum KioskPage {
    Checkin {
        form: CheckinInput,
        errors: FormErrors,
    },
    Walkin {
        form: WalkinInput,
        errors: FormErrors,
        #[serde(skip_serializing_if = "Option::is_none")]
        notice: Option<String>,
    },
    Demographics {
        form: DemographicsInput,
        errors: FormErrors,
    },
    Completed {
        patient_queue: i64,
    },
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("{}", NO_PATIENT_FOUND)]
    NoPatient,

    #[error("{}", NO_APPOINTMENT_TODAY)]
    NoAppointmentToday,

    #[error(transparent)]
    Scheduling(#[from] SchedulingError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Seal(#[from] SealError),
}

#[derive(Error, Debug)]
pub enum DemographicsError {
    #[error("Check-in form has expired; please start again")]
    InvalidSnapshot(#[from] SealError),

    #[error("Appointment {0} is not known to this kiosk")]
    UnknownAppointment(String),

    #[error("This appointment has already been checked in")]
    AlreadyCheckedIn(#[source] VisitError),

    #[error("{}", DEMOGRAPHICS_UPDATE_FAILED)]
    PatientUpdateRejected(u16),

    #[error("{}", STATUS_UPDATE_FAILED)]
    StatusUpdateRejected(u16),

    #[error(transparent)]
    Scheduling(#[from] SchedulingError),

    #[error(transparent)]
    Store(#[from] DbError),
}

impl DemographicsError {
    /// Failures reported back on the demographics form rather than as an error response.
    pub fn form_message(&self) -> Option<String> {
        match self {
            DemographicsError::InvalidSnapshot(_)
            | DemographicsError::UnknownAppointment(_)
            | DemographicsError::AlreadyCheckedIn(_)
            | DemographicsError::PatientUpdateRejected(_)
            | DemographicsError::StatusUpdateRejected(_) => Some(self.to_string()),
            DemographicsError::Scheduling(_) | DemographicsError::Store(_) => None,
        }
    }
}

impl From<IntakeError> for AppError {
    fn from(err: IntakeError) -> Self {
        match err {
            IntakeError::NoPatient | IntakeError::NoAppointmentToday => AppError::NotFound(err.to_string()),
            IntakeError::Scheduling(e) => e.into(),
            IntakeError::Sync(e) => e.into(),
            IntakeError::Seal(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<DemographicsError> for AppError {
    fn from(err: DemographicsError) -> Self {
        match err {
            DemographicsError::Scheduling(e) => e.into(),
            DemographicsError::Store(e) => e.into(),
            other => AppError::BadRequest(other.to_string()),
        }
    }
}
