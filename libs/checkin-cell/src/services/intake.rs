use chrono::NaiveDate;
use tracing::{debug, info};

use shared_database::cache::Patient;
use shared_database::sync::{cache_appointment, cache_patient, SyncError};
use shared_database::Database;
use shared_models::scheduling::{
    AppointmentQuery, NewPatient, PatientQuery, RemoteAppointment, RemotePatient, SchedulingError,
    SchedulingProvider,
};

use crate::forms::FormValidator;
use crate::models::{Demographics, DemographicsSnapshot, Intake, IntakeError, WalkinIntake};

#[derive(Debug)]
pub enum WalkinOutcome {
    /// Already a patient with an appointment today; continue to demographics.
    Matched(DemographicsSnapshot),
    /// Registered as a new remote patient.
    Registered { patient_id: i64 },
}

/// Matches a patient at the kiosk against the remote patient list.
pub struct IntakeService<'a> {
    scheduler: &'a dyn SchedulingProvider,
    store: &'a Database,
    validator: &'a FormValidator,
    match_on_ssn: bool,
}

impl<'a> IntakeService<'a> {
    pub fn new(
        scheduler: &'a dyn SchedulingProvider,
        store: &'a Database,
        validator: &'a FormValidator,
        match_on_ssn: bool,
    ) -> Self {
        Self { scheduler, store, validator, match_on_ssn }
    }

    /// First remote patient of the doctor whose names match exactly. With SSN matching
    /// enabled the normalized SSN must match as well.
    pub async fn find_patient(
        &self,
        token: &str,
        doctor_id: i64,
        intake: &Intake,
    ) -> Result<Option<RemotePatient>, IntakeError> {
        let query = PatientQuery {
            doctor: Some(doctor_id),
            first_name: Some(intake.first_name.clone()),
            last_name: Some(intake.last_name.clone()),
        };
        let candidates = self.scheduler.list_patients(token, &query).await?;
        debug!("{} candidate patients for intake", candidates.len());

        Ok(candidates.into_iter().find(|patient| {
            let names_match = patient.first_name == intake.first_name && patient.last_name == intake.last_name;
            let ssn_matches = !self.match_on_ssn
                || patient
                    .social_security_number
                    .as_deref()
                    .and_then(|ssn| self.validator.normalize_ssn(ssn))
                    .is_some_and(|ssn| ssn == intake.social_security_number);
            names_match && ssn_matches
        }))
    }

    pub async fn todays_appointment(
        &self,
        token: &str,
        patient_id: i64,
        today: NaiveDate,
    ) -> Result<Option<RemoteAppointment>, IntakeError> {
        let query = AppointmentQuery { date: today, doctor: None, patient: Some(patient_id) };
        let appointments = self.scheduler.list_appointments(token, &query).await?;
        Ok(appointments.into_iter().next())
    }

    /// Resolves the patient's appointment today and caches both, returning the
    /// demographics snapshot to render.
    async fn snapshot_for(
        &self,
        token: &str,
        patient: &RemotePatient,
        today: NaiveDate,
    ) -> Result<DemographicsSnapshot, IntakeError> {
        let appointment = self
            .todays_appointment(token, patient.id, today)
            .await?
            .ok_or(IntakeError::NoAppointmentToday)?;

        cache_patient(self.store, patient)?;
        cache_appointment(self.store, &appointment)?;
        info!("Patient {} matched appointment {}", patient.id, appointment.id);

        Ok(DemographicsSnapshot {
            patient_id: patient.id,
            appointment_id: appointment.id,
            values: Demographics::from_remote(patient),
        })
    }

    pub async fn check_in(
        &self,
        token: &str,
        doctor_id: i64,
        intake: &Intake,
        today: NaiveDate,
    ) -> Result<DemographicsSnapshot, IntakeError> {
        let patient = self
            .find_patient(token, doctor_id, intake)
            .await?
            .ok_or(IntakeError::NoPatient)?;

        self.snapshot_for(token, &patient, today).await
    }

    pub async fn walk_in(
        &self,
        token: &str,
        doctor_id: i64,
        walkin: &WalkinIntake,
        today: NaiveDate,
    ) -> Result<WalkinOutcome, IntakeError> {
        if let Some(patient) = self.find_patient(token, doctor_id, &walkin.intake).await? {
            return Ok(WalkinOutcome::Matched(self.snapshot_for(token, &patient, today).await?));
        }

        let new_patient = NewPatient {
            doctor: doctor_id,
            first_name: walkin.intake.first_name.clone(),
            last_name: walkin.intake.last_name.clone(),
            gender: walkin.gender.clone(),
            social_security_number: walkin.intake.social_security_number.clone(),
        };
        let created = self.scheduler.create_patient(token, &new_patient).await?;
        let patient_id = created
            .id
            .parse::<i64>()
            .map_err(|_| SchedulingError::Decode(format!("non-numeric patient id {}", created.id)))?;

        self.store
            .get_or_create_patient(&Patient {
                patient_id,
                doctor_id,
                first_name: new_patient.first_name,
                last_name: new_patient.last_name,
                email: String::new(),
                gender: new_patient.gender,
                social_security_number: new_patient.social_security_number,
                cell_phone: String::new(),
            })
            .map_err(SyncError::from)?;
        info!("Registered walk-in patient {}", patient_id);

        Ok(WalkinOutcome::Registered { patient_id })
    }
}
