use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, OptionalExtension, Row};

use shared_models::scheduling::RemoteAppointment;
use shared_models::status::AppointmentStatus;

use super::{Appointment, Database, DbError, DbResult};

const APPOINTMENT_COLUMNS: &str = "appointment_id, patient_id, doctor_id, scheduled_time, \
                                   arrival_time, time_waited_us, status, status_text";

fn appointment_from_row(row: &Row<'_>) -> rusqlite::Result<Appointment> {
    let waited: Option<i64> = row.get(5)?;
    let status: String = row.get(6)?;

    Ok(Appointment {
        appointment_id: row.get(0)?,
        patient_id: row.get(1)?,
        doctor_id: row.get(2)?,
        scheduled_time: row.get(3)?,
        arrival_time: row.get(4)?,
        time_waited: waited.map(Duration::microseconds),
        status: AppointmentStatus::from_remote(&status),
        status_text: row.get(7)?,
    })
}

impl Database {
    pub fn get_appointment(&self, appointment_id: &str) -> DbResult<Option<Appointment>> {
        self.conn()?
            .query_row(
                &format!("SELECT {} FROM appointments WHERE appointment_id = ?", APPOINTMENT_COLUMNS),
                [appointment_id],
                appointment_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Creates the row on first sight, then refreshes status and scheduled time from the
    /// remote record. The remote status text is kept verbatim next to its normalized form. Arrival and wait columns are never touched here. The owning patient
    /// must already be cached.
    pub fn upsert_remote_appointment(&self, remote: &RemoteAppointment) -> DbResult<(Appointment, bool)> {
        let status_text = remote.status.as_deref().unwrap_or("").trim();
        let status = AppointmentStatus::from_remote(status_text);

        let created = {
            let mut conn = self.conn()?;
            let tx = conn.transaction()?;

            let patient_cached: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM patients WHERE patient_id = ?)",
                [remote.patient],
                |row| row.get(0),
            )?;
            if !patient_cached {
                return Err(DbError::NotFound(format!(
                    "patient {} for appointment {}", remote.patient, remote.id
                )));
            }

            let inserted = tx.execute(
                r#"
                INSERT INTO appointments (appointment_id, patient_id, doctor_id)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(appointment_id) DO NOTHING
                "#,
                params![remote.id, remote.patient, remote.doctor],
            )?;

            tx.execute(
                r#"
                UPDATE appointments
                SET status = ?2, status_text = ?3, scheduled_time = ?4
                WHERE appointment_id = ?1
                "#,
                params![remote.id, status.as_str(), status_text, remote.scheduled_time],
            )?;

            tx.commit()?;
            inserted > 0
        };

        let stored = self
            .get_appointment(&remote.id)?
            .ok_or_else(|| DbError::NotFound(format!("appointment {}", remote.id)))?;

        Ok((stored, created))
    }

    pub fn mark_arrived(&self, appointment_id: &str, arrival_time: DateTime<Utc>) -> DbResult<()> {
        let rows = self.conn()?.execute(
            "UPDATE appointments SET status = ?2, status_text = ?2, arrival_time = ?3 WHERE appointment_id = ?1",
            params![appointment_id, AppointmentStatus::Arrived.as_str(), arrival_time],
        )?;
        ensure_updated(rows, appointment_id)
    }

    pub fn record_call_in(&self, appointment_id: &str, waited: Duration) -> DbResult<()> {
        let micros = waited
            .num_microseconds()
            .ok_or_else(|| DbError::Constraint(format!("wait for {} out of range", appointment_id)))?;

        let rows = self.conn()?.execute(
            "UPDATE appointments SET status = ?2, status_text = ?2, time_waited_us = ?3 WHERE appointment_id = ?1",
            params![appointment_id, AppointmentStatus::InSession.as_str(), micros],
        )?;
        ensure_updated(rows, appointment_id)
    }

    pub fn set_status(&self, appointment_id: &str, status: AppointmentStatus) -> DbResult<()> {
        let rows = self.conn()?.execute(
            "UPDATE appointments SET status = ?2, status_text = ?2 WHERE appointment_id = ?1",
            params![appointment_id, status.as_str()],
        )?;
        ensure_updated(rows, appointment_id)
    }

    /// Appointments of this doctor currently arrived or in session.
    pub fn count_queued(&self, doctor_id: i64) -> DbResult<i64> {
        let count = self.conn()?.query_row(
            "SELECT COUNT(*) FROM appointments WHERE doctor_id = ?1 AND status IN (?2, ?3)",
            params![
                doctor_id,
                AppointmentStatus::Arrived.as_str(),
                AppointmentStatus::InSession.as_str(),
            ],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Mean waited duration over the doctor's in-session and completed appointments,
    /// or `None` when none has a recorded wait.
    pub fn average_wait(&self, doctor_id: i64) -> DbResult<Option<Duration>> {
        let average: Option<f64> = self.conn()?.query_row(
            r#"
            SELECT AVG(time_waited_us)
            FROM appointments
            WHERE doctor_id = ?1
              AND status IN (?2, ?3)
              AND time_waited_us IS NOT NULL
            "#,
            params![
                doctor_id,
                AppointmentStatus::Complete.as_str(),
                AppointmentStatus::InSession.as_str(),
            ],
            |row| row.get(0),
        )?;

        Ok(average.map(|micros| Duration::microseconds(micros.round() as i64)))
    }
}

fn ensure_updated(rows: usize, appointment_id: &str) -> DbResult<()> {
    if rows == 0 {
        return Err(DbError::NotFound(format!("appointment {}", appointment_id)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{NaiveDate, TimeZone};

    use crate::cache::Patient;

    fn seed_patient(db: &Database, patient_id: i64, doctor_id: i64) {
        db.get_or_create_patient(&Patient {
            patient_id,
            doctor_id,
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            email: String::new(),
            gender: "Female".to_string(),
            social_security_number: String::new(),
            cell_phone: String::new(),
        }).unwrap();
    }

    fn remote(id: &str, patient: i64, doctor: i64, status: &str, hour: u32) -> RemoteAppointment {
        RemoteAppointment {
            id: id.to_string(),
            patient,
            doctor,
            scheduled_time: NaiveDate::from_ymd_opt(2026, 10, 14).unwrap().and_hms_opt(hour, 0, 0).unwrap(),
            status: Some(status.to_string()),
            duration: Some(30),
        }
    }

    fn seed_waited(db: &Database, id: &str, doctor: i64, status: &str, seconds: i64) {
        db.upsert_remote_appointment(&remote(id, 1, doctor, status, 9)).unwrap();
        db.record_call_in(id, Duration::seconds(seconds)).unwrap();
        db.set_status(id, AppointmentStatus::from_remote(status)).unwrap();
    }

    #[test]
    fn test_upsert_refreshes_status_but_not_arrival() {
        let db = Database::open_in_memory().unwrap();
        seed_patient(&db, 1, 7);

        let (_, created) = db.upsert_remote_appointment(&remote("a-1", 1, 7, "", 9)).unwrap();
        assert!(created);

        let arrival = Utc.with_ymd_and_hms(2026, 10, 14, 13, 5, 0).unwrap();
        db.mark_arrived("a-1", arrival).unwrap();

        let (refreshed, created) = db.upsert_remote_appointment(&remote("a-1", 1, 7, "In Room", 10)).unwrap();
        assert!(!created);
        assert_eq!(refreshed.status, AppointmentStatus::InSession);
        assert_eq!(refreshed.arrival_time, Some(arrival));
        assert_eq!(refreshed.scheduled_time.unwrap().format("%H").to_string(), "10");
    }

    #[test]
    fn test_unmapped_remote_status_text_is_kept() {
        let db = Database::open_in_memory().unwrap();
        seed_patient(&db, 1, 7);

        let (stored, _) = db.upsert_remote_appointment(&remote("a-1", 1, 7, "Rescheduled", 9)).unwrap();
        assert_eq!(stored.status, AppointmentStatus::Scheduled);
        assert_eq!(stored.status_text, "Rescheduled");

        db.mark_arrived("a-1", Utc::now()).unwrap();
        let arrived = db.get_appointment("a-1").unwrap().unwrap();
        assert_eq!(arrived.status, AppointmentStatus::Arrived);
        assert_eq!(arrived.status_text, "Arrived");
    }

    #[test]
    fn test_upsert_requires_cached_patient() {
        let db = Database::open_in_memory().unwrap();

        let result = db.upsert_remote_appointment(&remote("a-1", 404, 7, "", 9));
        assert_matches!(result, Err(DbError::NotFound(_)));
    }

    #[test]
    fn test_average_wait_over_ten_twenty_thirty_seconds() {
        let db = Database::open_in_memory().unwrap();
        seed_patient(&db, 1, 7);

        seed_waited(&db, "a-1", 7, "Complete", 10);
        seed_waited(&db, "a-2", 7, "In Session", 20);
        seed_waited(&db, "a-3", 7, "Complete", 30);

        assert_eq!(db.average_wait(7).unwrap(), Some(Duration::seconds(20)));
    }

    #[test]
    fn test_average_wait_ignores_other_doctors_and_statuses() {
        let db = Database::open_in_memory().unwrap();
        seed_patient(&db, 1, 7);

        seed_waited(&db, "a-1", 8, "Complete", 500);
        seed_waited(&db, "a-2", 7, "Arrived", 500);
        db.upsert_remote_appointment(&remote("a-3", 1, 7, "Complete", 9)).unwrap();

        assert_eq!(db.average_wait(7).unwrap(), None);
    }

    #[test]
    fn test_count_queued_is_scoped_to_doctor() {
        let db = Database::open_in_memory().unwrap();
        seed_patient(&db, 1, 7);

        db.upsert_remote_appointment(&remote("a-1", 1, 7, "Arrived", 9)).unwrap();
        db.upsert_remote_appointment(&remote("a-2", 1, 7, "In Session", 9)).unwrap();
        db.upsert_remote_appointment(&remote("a-3", 1, 7, "Complete", 9)).unwrap();
        db.upsert_remote_appointment(&remote("b-1", 1, 8, "Arrived", 9)).unwrap();

        assert_eq!(db.count_queued(7).unwrap(), 2);
        assert_eq!(db.count_queued(8).unwrap(), 1);
    }

    #[test]
    fn test_updates_on_unknown_appointment_fail() {
        let db = Database::open_in_memory().unwrap();

        assert_matches!(db.set_status("missing", AppointmentStatus::Complete), Err(DbError::NotFound(_)));
        assert_matches!(db.mark_arrived("missing", Utc::now()), Err(DbError::NotFound(_)));
    }
}
