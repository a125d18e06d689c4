use tracing::debug;

use shared_database::Database;

use crate::error::ArrivalQueueError;

pub struct ArrivalPollService<'a> {
    store: &'a Database,
}

impl<'a> ArrivalPollService<'a> {
    pub fn new(store: &'a Database) -> Self {
        Self { store }
    }

    /// Appointment ids that arrived since the doctor's last poll, oldest first.
    /// Returned notices are consumed.
    pub fn poll(&self, doctor_id: i64) -> Result<Vec<String>, ArrivalQueueError> {
        let updates = self.store.drain_arrivals(doctor_id)?;
        if !updates.is_empty() {
            debug!("Doctor {} picked up {} arrivals", doctor_id, updates.len());
        }
        Ok(updates)
    }
}
