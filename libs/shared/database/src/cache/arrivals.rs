use rusqlite::params;

use super::{ArrivalNotice, Database, DbResult};

impl Database {
    /// Queues an arrival notice; a second notice for the same appointment is a no-op.
    pub fn add_arrival(&self, notice: &ArrivalNotice) -> DbResult<bool> {
        let inserted = self.conn()?.execute(
            r#"
            INSERT INTO arrivals (appointment_id, doctor_id) VALUES (?1, ?2)
            ON CONFLICT(appointment_id) DO NOTHING
            "#,
            params![notice.appointment_id, notice.doctor_id],
        )?;
        Ok(inserted > 0)
    }

    #[cfg(test)]
    pub fn pending_arrivals(&self, doctor_id: i64) -> DbResult<Vec<ArrivalNotice>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT appointment_id, doctor_id FROM arrivals WHERE doctor_id = ? ORDER BY rowid",
        )?;

        let rows = stmt.query_map([doctor_id], |row| {
            Ok(ArrivalNotice { appointment_id: row.get(0)?, doctor_id: row.get(1)? })
        })?;

        let notices = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(notices)
    }

    /// Reads and deletes this doctor's notices in one transaction. Other doctors'
    /// notices are left in place.
    pub fn drain_arrivals(&self, doctor_id: i64) -> DbResult<Vec<String>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let ids = {
            let mut stmt = tx.prepare(
                "SELECT appointment_id FROM arrivals WHERE doctor_id = ? ORDER BY rowid",
            )?;
            let rows = stmt.query_map([doctor_id], |row| row.get::<_, String>(0))?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        tx.execute("DELETE FROM arrivals WHERE doctor_id = ?", [doctor_id])?;
        tx.commit()?;

        Ok(ids)
    }
}
