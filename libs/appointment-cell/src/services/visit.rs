use chrono::{DateTime, Utc};
use tracing::{debug, info};

use shared_database::cache::Appointment;
use shared_database::Database;
use shared_models::scheduling::{PatchOutcome, SchedulingProvider};
use shared_models::status::AppointmentStatus;

use crate::models::VisitError;
use crate::services::{AppointmentLifecycleService, WaitTimeService};

/// Staff-side actions on an arrived patient: calling them in and finishing the visit.
pub struct VisitService<'a> {
    scheduler: &'a dyn SchedulingProvider,
    store: &'a Database,
    lifecycle: AppointmentLifecycleService,
}

impl<'a> VisitService<'a> {
    pub fn new(scheduler: &'a dyn SchedulingProvider, store: &'a Database) -> Self {
        Self { scheduler, store, lifecycle: AppointmentLifecycleService::new() }
    }

    fn load(&self, appointment_id: &str, doctor_id: i64) -> Result<Appointment, VisitError> {
        self.store
            .get_appointment(appointment_id)?
            .filter(|appointment| appointment.doctor_id == doctor_id)
            .ok_or_else(|| VisitError::NotFound(appointment_id.to_string()))
    }

    async fn push_status(&self, token: &str, appointment_id: &str, status: AppointmentStatus) -> Result<(), VisitError> {
        match self.scheduler.patch_appointment(token, appointment_id, status.as_str()).await? {
            PatchOutcome::Applied => Ok(()),
            PatchOutcome::Rejected(code) => Err(VisitError::RemoteRejected(code)),
        }
    }

    /// Stops the wait timer and returns the doctor's refreshed average wait.
    pub async fn call_in(
        &self,
        token: &str,
        doctor_id: i64,
        appointment_id: &str,
        called_in: DateTime<Utc>,
    ) -> Result<Option<String>, VisitError> {
        let appointment = self.load(appointment_id, doctor_id)?;
        self.lifecycle.validate_status_transition(appointment.status, AppointmentStatus::InSession)?;

        let arrival = appointment
            .arrival_time
            .ok_or_else(|| VisitError::NotArrived(appointment_id.to_string()))?;
        if called_in < arrival {
            return Err(VisitError::CalledInBeforeArrival { arrival, called_in });
        }
        let waited = called_in - arrival;

        self.push_status(token, appointment_id, AppointmentStatus::InSession).await?;
        self.store.record_call_in(appointment_id, waited)?;
        info!("Patient for appointment {} called in after {}s", appointment_id, waited.num_seconds());

        WaitTimeService::new(self.store).average_wait_time(appointment.doctor_id)
    }

    pub async fn complete(&self, token: &str, doctor_id: i64, appointment_id: &str) -> Result<(), VisitError> {
        let appointment = self.load(appointment_id, doctor_id)?;
        self.lifecycle.validate_status_transition(appointment.status, AppointmentStatus::Complete)?;

        self.push_status(token, appointment_id, AppointmentStatus::Complete).await?;
        self.store.set_status(appointment_id, AppointmentStatus::Complete)?;
        debug!("Appointment {} completed", appointment_id);

        Ok(())
    }
}
