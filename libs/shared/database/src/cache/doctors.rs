use rusqlite::{params, OptionalExtension};

use super::{Database, DbError, DbResult, Doctor};

impl Database {
    pub fn get_doctor(&self, user_ref: &str) -> DbResult<Option<Doctor>> {
        self.conn()?
            .query_row(
                "SELECT user_ref, doctor_id FROM doctors WHERE user_ref = ?",
                [user_ref],
                |row| Ok(Doctor { user_ref: row.get(0)?, doctor_id: row.get(1)? }),
            )
            .optional()
            .map_err(Into::into)
    }

    /// Inserts the account's doctor row unless one exists; an existing row is never changed.
    pub fn get_or_create_doctor(&self, user_ref: &str, doctor_id: i64) -> DbResult<Doctor> {
        self.conn()?.execute(
            "INSERT INTO doctors (user_ref, doctor_id) VALUES (?1, ?2) ON CONFLICT(user_ref) DO NOTHING",
            params![user_ref, doctor_id],
        )?;

        self.get_doctor(user_ref)?
            .ok_or_else(|| DbError::NotFound(format!("doctor for user {}", user_ref)))
    }
}
