use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use shared_models::scheduling::RemotePatient;
use shared_models::status::AppointmentStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    pub user_ref: String,
    pub doctor_id: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Credential {
    pub user_ref: String,
    pub provider: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub patient_id: i64,
    pub doctor_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub gender: String,
    pub social_security_number: String,
    pub cell_phone: String,
}

impl Patient {
    pub fn from_remote(remote: &RemotePatient) -> Self {
        Self {
            patient_id: remote.id,
            doctor_id: remote.doctor,
            first_name: remote.first_name.clone(),
            last_name: remote.last_name.clone(),
            email: remote.email.clone().unwrap_or_default(),
            gender: remote.gender.clone().unwrap_or_else(|| "Other".to_string()),
            social_security_number: remote.social_security_number.clone().unwrap_or_default(),
            cell_phone: remote.cell_phone.clone().unwrap_or_default(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Appointment {
    pub appointment_id: String,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub scheduled_time: Option<NaiveDateTime>,
    pub arrival_time: Option<DateTime<Utc>>,
    pub time_waited: Option<Duration>,
    pub status: AppointmentStatus,
    /// Status as last written, verbatim from the remote record or set locally.
    pub status_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrivalNotice {
    pub appointment_id: String,
    pub doctor_id: i64,
}
