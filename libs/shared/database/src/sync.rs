//! Fetch-from-remote, upsert-into-cache glue shared by the kiosk and staff cells.

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, info};

use shared_models::error::AppError;
use shared_models::scheduling::{
    AppointmentQuery, PatientQuery, RemoteAppointment, RemotePatient, SchedulingError, SchedulingProvider,
};

use crate::cache::{Appointment, Database, DbError, Doctor, Patient};

#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Scheduling(#[from] SchedulingError),

    #[error(transparent)]
    Store(#[from] DbError),
}

impl From<SyncError> for AppError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Scheduling(e) => e.into(),
            SyncError::Store(e) => e.into(),
        }
    }
}

/// Returns the cached doctor for this account, asking the remote API on first use.
pub async fn resolve_doctor(
    provider: &dyn SchedulingProvider,
    store: &Database,
    token: &str,
    user_ref: &str,
) -> Result<Doctor, SyncError> {
    if let Some(doctor) = store.get_doctor(user_ref)? {
        debug!("Found doctor {} for user {}", doctor.doctor_id, user_ref);
        return Ok(doctor);
    }

    info!("Doctor for user {} not cached, calling API", user_ref);
    let current = provider.current_user(token).await?;
    Ok(store.get_or_create_doctor(user_ref, current.doctor)?)
}

pub fn cache_patient(store: &Database, remote: &RemotePatient) -> Result<Patient, SyncError> {
    let (patient, created) = store.get_or_create_patient(&Patient::from_remote(remote))?;
    if created {
        debug!("Cached new patient {}", patient.patient_id);
    }
    Ok(patient)
}

pub fn cache_appointment(store: &Database, remote: &RemoteAppointment) -> Result<Appointment, SyncError> {
    let (appointment, created) = store.upsert_remote_appointment(remote)?;
    if created {
        debug!("Cached new appointment {}", appointment.appointment_id);
    }
    Ok(appointment)
}

/// Fetches every patient visible to the account and caches the ones not seen before.
pub async fn cache_all_patients(
    provider: &dyn SchedulingProvider,
    store: &Database,
    token: &str,
) -> Result<Vec<Patient>, SyncError> {
    let remote = provider.list_patients(token, &PatientQuery::default()).await?;
    remote.iter().map(|p| cache_patient(store, p)).collect()
}

/// Fetches the doctor's appointments on `date` and upserts them in fetch order.
pub async fn cache_appointments_for_doctor(
    provider: &dyn SchedulingProvider,
    store: &Database,
    token: &str,
    doctor_id: i64,
    date: NaiveDate,
) -> Result<Vec<Appointment>, SyncError> {
    let query = AppointmentQuery { date, doctor: Some(doctor_id), patient: None };
    let remote = provider.list_appointments(token, &query).await?;
    remote.iter().map(|a| cache_appointment(store, a)).collect()
}
