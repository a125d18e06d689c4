use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbError, DbResult, Patient};

const PATIENT_COLUMNS: &str = "patient_id, doctor_id, first_name, last_name, email, gender, \
                               social_security_number, cell_phone";

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        patient_id: row.get(0)?,
        doctor_id: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        email: row.get(4)?,
        gender: row.get(5)?,
        social_security_number: row.get(6)?,
        cell_phone: row.get(7)?,
    })
}

impl Database {
    pub fn get_patient(&self, patient_id: i64) -> DbResult<Option<Patient>> {
        self.conn()?
            .query_row(
                &format!("SELECT {} FROM patients WHERE patient_id = ?", PATIENT_COLUMNS),
                [patient_id],
                patient_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Get-or-create keyed on the remote patient id. Fields are only written when the row
    /// is created; an existing row is returned untouched. The flag reports creation.
    pub fn get_or_create_patient(&self, patient: &Patient) -> DbResult<(Patient, bool)> {
        let inserted = self.conn()?.execute(
            r#"
            INSERT INTO patients (
                patient_id, doctor_id, first_name, last_name, email, gender,
                social_security_number, cell_phone
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(patient_id) DO NOTHING
            "#,
            params![
                patient.patient_id,
                patient.doctor_id,
                patient.first_name,
                patient.last_name,
                patient.email,
                patient.gender,
                patient.social_security_number,
                patient.cell_phone,
            ],
        )?;

        let stored = self
            .get_patient(patient.patient_id)?
            .ok_or_else(|| DbError::NotFound(format!("patient {}", patient.patient_id)))?;

        Ok((stored, inserted > 0))
    }

    #[cfg(test)]
    pub fn count_patients(&self) -> DbResult<i64> {
        let count = self.conn()?.query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))?;
        Ok(count)
    }
}
