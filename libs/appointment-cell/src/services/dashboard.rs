use chrono::NaiveDate;
use tracing::debug;

use shared_database::sync::{cache_all_patients, cache_appointments_for_doctor};
use shared_database::Database;
use shared_models::scheduling::SchedulingProvider;

use crate::models::{AppointmentView, DashboardView, VisitError};
use crate::services::WaitTimeService;

pub struct DashboardService<'a> {
    scheduler: &'a dyn SchedulingProvider,
    store: &'a Database,
}

impl<'a> DashboardService<'a> {
    pub fn new(scheduler: &'a dyn SchedulingProvider, store: &'a Database) -> Self {
        Self { scheduler, store }
    }

    /// Refreshes the patient cache and the doctor's appointments for `date`, then
    /// builds the staff view in fetch order.
    pub async fn load(&self, token: &str, doctor_id: i64, date: NaiveDate) -> Result<DashboardView, VisitError> {
        let patients = cache_all_patients(self.scheduler, self.store, token).await?;
        debug!("Patient cache holds {} patients after refresh", patients.len());

        let appointments = cache_appointments_for_doctor(self.scheduler, self.store, token, doctor_id, date).await?;

        let mut curr_appointments = Vec::with_capacity(appointments.len());
        for appointment in &appointments {
            let patient_name = self.store.get_patient(appointment.patient_id)?.map(|p| p.full_name());
            curr_appointments.push(AppointmentView::new(appointment, patient_name));
        }

        Ok(DashboardView {
            doctor_id,
            date,
            curr_appointments,
            average_wait_time: WaitTimeService::new(self.store).average_wait_time(doctor_id)?,
        })
    }
}
