//! Records and capability trait for the remote practice-management API.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::auth::OAuthToken;

#[derive(Error, Debug)]
pub enum SchedulingError {
    #[error("Authentication error: {0}")]
    Unauthorized(String),

    #[error("API error ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid response payload: {0}")]
    Decode(String),
}

/// Result of a PATCH call. Only HTTP 204 counts as applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    Applied,
    Rejected(u16),
}

impl PatchOutcome {
    pub fn from_status(status: u16) -> Self {
        if status == 204 {
            PatchOutcome::Applied
        } else {
            PatchOutcome::Rejected(status)
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, PatchOutcome::Applied)
    }
}

/// One page of a cursor-paginated list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    pub results: Vec<T>,
    pub next: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteUser {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
    pub doctor: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RemotePatient {
    pub id: i64,
    pub doctor: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub social_security_number: Option<String>,
    #[serde(default)]
    pub cell_phone: Option<String>,
    #[serde(default)]
    pub zip_code: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub emergency_contact_phone: Option<String>,
    #[serde(default)]
    pub emergency_contact_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteAppointment {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub patient: i64,
    pub doctor: i64,
    #[serde(deserialize_with = "scheduled_time")]
    pub scheduled_time: NaiveDateTime,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub duration: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct PatientQuery {
    pub doctor: Option<i64>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl PatientQuery {
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(doctor) = self.doctor {
            params.push(("doctor", doctor.to_string()));
        }
        if let Some(first_name) = &self.first_name {
            params.push(("first_name", first_name.clone()));
        }
        if let Some(last_name) = &self.last_name {
            params.push(("last_name", last_name.clone()));
        }
        params
    }
}

#[derive(Debug, Clone)]
pub struct AppointmentQuery {
    pub date: NaiveDate,
    pub doctor: Option<i64>,
    pub patient: Option<i64>,
}

impl AppointmentQuery {
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("date", self.date.format("%Y-%m-%d").to_string())];
        if let Some(doctor) = self.doctor {
            params.push(("doctor", doctor.to_string()));
        }
        if let Some(patient) = self.patient {
            params.push(("patient", patient.to_string()));
        }
        params
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewPatient {
    pub doctor: i64,
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub social_security_number: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewAppointment {
    pub doctor: i64,
    pub patient: i64,
    pub office: i64,
    pub exam_room: i64,
    pub scheduled_time: NaiveDateTime,
    pub duration: i64,
}

/// Created object as echoed back by a POST.
#[derive(Debug, Clone, Deserialize)]
pub struct Created {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
}

/// Field name to new value, as sent in a patient PATCH body.
pub type PatientChanges = BTreeMap<String, String>;

/// Capabilities the kiosk needs from the practice-management service.
#[async_trait]
pub trait SchedulingProvider: Send + Sync {
    /// Trades an OAuth authorization code for an access token.
    async fn exchange_code(&self, code: &str) -> Result<OAuthToken, SchedulingError>;

    async fn current_user(&self, token: &str) -> Result<RemoteUser, SchedulingError>;

    /// Follows pagination to the last page.
    async fn list_patients(
        &self,
        token: &str,
        query: &PatientQuery,
    ) -> Result<Vec<RemotePatient>, SchedulingError>;

    /// Follows pagination to the last page.
    async fn list_appointments(
        &self,
        token: &str,
        query: &AppointmentQuery,
    ) -> Result<Vec<RemoteAppointment>, SchedulingError>;

    async fn patch_patient(
        &self,
        token: &str,
        patient_id: i64,
        changes: &PatientChanges,
    ) -> Result<PatchOutcome, SchedulingError>;

    async fn patch_appointment(
        &self,
        token: &str,
        appointment_id: &str,
        status: &str,
    ) -> Result<PatchOutcome, SchedulingError>;

    async fn create_patient(
        &self,
        token: &str,
        patient: &NewPatient,
    ) -> Result<Created, SchedulingError>;

    async fn create_appointment(
        &self,
        token: &str,
        appointment: &NewAppointment,
    ) -> Result<Created, SchedulingError>;
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(text) => text,
        Id::Number(number) => number.to_string(),
    })
}

// The API sends naive wall-clock times; tolerate an offset suffix by keeping its local reading.
fn scheduled_time<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(with_offset.naive_local());
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S%.f"))
        .map_err(serde::de::Error::custom)
}
