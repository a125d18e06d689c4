use chrono::{DateTime, Utc};
use tracing::info;

use appointment_cell::services::AppointmentLifecycleService;
use shared_database::cache::ArrivalNotice;
use shared_database::Database;
use shared_models::scheduling::{PatchOutcome, PatientChanges, SchedulingProvider};
use shared_models::status::AppointmentStatus;

use crate::models::{Demographics, DemographicsError, DemographicsSnapshot};

/// Fields whose submitted value differs from the snapshot.
pub fn changed_fields(snapshot: &Demographics, submitted: &Demographics) -> PatientChanges {
    Demographics::FIELDS
        .iter()
        .filter_map(|field| {
            let before = snapshot.get(field).unwrap_or_default().trim();
            let after = submitted.get(field).unwrap_or_default();
            (before != after).then(|| (field.to_string(), after.to_string()))
        })
        .collect()
}

pub struct DemographicsService<'a> {
    scheduler: &'a dyn SchedulingProvider,
    store: &'a Database,
    lifecycle: AppointmentLifecycleService,
}

impl<'a> DemographicsService<'a> {
    pub fn new(scheduler: &'a dyn SchedulingProvider, store: &'a Database) -> Self {
        Self { scheduler, store, lifecycle: AppointmentLifecycleService::new() }
    }

    /// Pushes changed demographics, marks the appointment arrived and queues the arrival
    /// notice. Returns how many of the doctor's patients were already waiting or in session.
    pub async fn submit(
        &self,
        token: &str,
        snapshot: &DemographicsSnapshot,
        submitted: &Demographics,
        now: DateTime<Utc>,
    ) -> Result<i64, DemographicsError> {
        let appointment = self
            .store
            .get_appointment(&snapshot.appointment_id)?
            .ok_or_else(|| DemographicsError::UnknownAppointment(snapshot.appointment_id.clone()))?;

        self.lifecycle
            .validate_status_transition(appointment.status, AppointmentStatus::Arrived)
            .map_err(DemographicsError::AlreadyCheckedIn)?;

        let changes = changed_fields(&snapshot.values, submitted);
        if !changes.is_empty() {
            let fields: Vec<&str> = changes.keys().map(String::as_str).collect();
            info!("The following fields changed: {}", fields.join(", "));

            if let PatchOutcome::Rejected(code) = self.scheduler.patch_patient(token, snapshot.patient_id, &changes).await? {
                return Err(DemographicsError::PatientUpdateRejected(code));
            }
        }

        let outcome = self
            .scheduler
            .patch_appointment(token, &appointment.appointment_id, AppointmentStatus::Arrived.as_str())
            .await?;
        if let PatchOutcome::Rejected(code) = outcome {
            return Err(DemographicsError::StatusUpdateRejected(code));
        }

        let patient_queue = self.store.count_queued(appointment.doctor_id)?;

        self.store.mark_arrived(&appointment.appointment_id, now)?;
        info!("New arrival time: {}", now);

        self.store.add_arrival(&ArrivalNotice {
            appointment_id: appointment.appointment_id.clone(),
            doctor_id: appointment.doctor_id,
        })?;

        Ok(patient_queue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{NaiveDate, TimeZone};

    use shared_database::sync::{cache_appointment, cache_patient};
    use shared_models::scheduling::RemotePatient;
    use shared_utils::test_utils::{FakeScheduling, MockDrChronoResponses};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 14, 14, 0, 0).unwrap()
    }

    fn jane() -> RemotePatient {
        MockDrChronoResponses::remote_patient(11, 7, "Jane", "Doe")
    }

    fn seeded() -> Database {
        let store = Database::open_in_memory().unwrap();
        let scheduled = NaiveDate::from_ymd_opt(2026, 10, 14).unwrap().and_hms_opt(9, 0, 0).unwrap();
        cache_patient(&store, &jane()).unwrap();
        cache_appointment(&store, &MockDrChronoResponses::remote_appointment("a-1", 11, 7, scheduled)).unwrap();
        store
    }

    fn snapshot() -> DemographicsSnapshot {
        DemographicsSnapshot {
            patient_id: 11,
            appointment_id: "a-1".to_string(),
            values: Demographics::from_remote(&jane()),
        }
    }

    #[test]
    fn test_changed_fields_only_lists_differences() {
        let before = Demographics::from_remote(&jane());
        let after = Demographics { zip_code: "10001".to_string(), ..before.clone() };

        let changes = changed_fields(&before, &after);

        assert_eq!(changes.len(), 1);
        assert_eq!(changes["zip_code"], "10001");
        assert!(changed_fields(&before, &before).is_empty());
    }

    #[tokio::test]
    async fn test_unchanged_form_skips_patient_patch_but_arrives() {
        let fake = FakeScheduling::new(7);
        let store = seeded();

        let queue = DemographicsService::new(&fake, &store)
            .submit("t", &snapshot(), &snapshot().values, now())
            .await
            .unwrap();

        assert_eq!(queue, 0);
        assert!(fake.patient_patches().is_empty());
        assert_eq!(fake.appointment_patches(), vec![("a-1".to_string(), "Arrived".to_string())]);

        let stored = store.get_appointment("a-1").unwrap().unwrap();
        assert_eq!(stored.status, AppointmentStatus::Arrived);
        assert_eq!(stored.arrival_time, Some(now()));
        assert_eq!(store.drain_arrivals(7).unwrap(), vec!["a-1"]);
    }

    #[tokio::test]
    async fn test_changed_fields_are_patched() {
        let fake = FakeScheduling::new(7);
        let store = seeded();
        let submitted = Demographics { email: "new@example.com".to_string(), ..snapshot().values };

        DemographicsService::new(&fake, &store)
            .submit("t", &snapshot(), &submitted, now())
            .await
            .unwrap();

        let patches = fake.patient_patches();
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].0, 11);
        assert_eq!(patches[0].1.keys().collect::<Vec<_>>(), vec!["email"]);
    }

    #[tokio::test]
    async fn test_rejected_patient_patch_mutates_nothing() {
        for status in [200, 400] {
            let fake = FakeScheduling::new(7);
            fake.respond_to_patches_with(status);
            let store = seeded();
            let submitted = Demographics { zip_code: "10001".to_string(), ..snapshot().values };

            let result = DemographicsService::new(&fake, &store)
                .submit("t", &snapshot(), &submitted, now())
                .await;

            assert_matches!(result, Err(DemographicsError::PatientUpdateRejected(code)) if code == status);
            assert!(fake.appointment_patches().is_empty());
            let stored = store.get_appointment("a-1").unwrap().unwrap();
            assert_eq!(stored.status, AppointmentStatus::Scheduled);
            assert_eq!(stored.arrival_time, None);
            assert!(store.drain_arrivals(7).unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_rejected_status_patch_leaves_appointment_scheduled() {
        let fake = FakeScheduling::new(7);
        fake.respond_to_patches_with(400);
        let store = seeded();

        let result = DemographicsService::new(&fake, &store)
            .submit("t", &snapshot(), &snapshot().values, now())
            .await;

        assert_matches!(result, Err(DemographicsError::StatusUpdateRejected(400)));
        assert_eq!(store.get_appointment("a-1").unwrap().unwrap().status, AppointmentStatus::Scheduled);
    }

    #[tokio::test]
    async fn test_queue_counts_only_this_doctors_patients() {
        let fake = FakeScheduling::new(7);
        let store = seeded();
        let scheduled = NaiveDate::from_ymd_opt(2026, 10, 14).unwrap().and_hms_opt(8, 0, 0).unwrap();
        cache_patient(&store, &MockDrChronoResponses::remote_patient(12, 8, "Ann", "Other")).unwrap();
        let mut ahead = MockDrChronoResponses::remote_appointment("a-0", 11, 7, scheduled);
        ahead.status = Some("Arrived".to_string());
        let mut other_doctor = MockDrChronoResponses::remote_appointment("b-0", 12, 8, scheduled);
        other_doctor.status = Some("In Session".to_string());
        let mut other_arrival = MockDrChronoResponses::remote_appointment("b-1", 12, 8, scheduled);
        other_arrival.status = Some("Arrived".to_string());
        cache_appointment(&store, &ahead).unwrap();
        cache_appointment(&store, &other_doctor).unwrap();
        cache_appointment(&store, &other_arrival).unwrap();

        let queue = DemographicsService::new(&fake, &store)
            .submit("t", &snapshot(), &snapshot().values, now())
            .await
            .unwrap();

        assert_eq!(queue, 1);
    }

    #[tokio::test]
    async fn test_second_check_in_is_refused() {
        let fake = FakeScheduling::new(7);
        let store = seeded();
        let service = DemographicsService::new(&fake, &store);
        service.submit("t", &snapshot(), &snapshot().values, now()).await.unwrap();

        let result = service.submit("t", &snapshot(), &snapshot().values, now()).await;

        assert_matches!(result, Err(DemographicsError::AlreadyCheckedIn(_)));
        assert_eq!(fake.appointment_patches().len(), 1);
    }
}
