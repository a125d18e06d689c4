use rusqlite::{params, OptionalExtension};

use super::{Credential, Database, DbResult};

impl Database {
    /// Stores the account's OAuth credential, replacing any previous one.
    pub fn save_credential(&self, credential: &Credential) -> DbResult<()> {
        self.conn()?.execute(
            r#"
            INSERT INTO credentials (user_ref, provider, access_token, refresh_token, expires_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(user_ref) DO UPDATE SET
                provider = excluded.provider,
                access_token = excluded.access_token,
                refresh_token = excluded.refresh_token,
                expires_at = excluded.expires_at,
                updated_at = datetime('now')
            "#,
            params![
                credential.user_ref,
                credential.provider,
                credential.access_token,
                credential.refresh_token,
                credential.expires_at,
            ],
        )?;
        Ok(())
    }

    pub fn get_credential(&self, user_ref: &str) -> DbResult<Option<Credential>> {
        self.conn()?
            .query_row(
                r#"
                SELECT user_ref, provider, access_token, refresh_token, expires_at
                FROM credentials
                WHERE user_ref = ?
                "#,
                [user_ref],
                |row| {
                    Ok(Credential {
                        user_ref: row.get(0)?,
                        provider: row.get(1)?,
                        access_token: row.get(2)?,
                        refresh_token: row.get(3)?,
                        expires_at: row.get(4)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn delete_credential(&self, user_ref: &str) -> DbResult<bool> {
        let rows = self.conn()?.execute("DELETE FROM credentials WHERE user_ref = ?", [user_ref])?;
        Ok(rows > 0)
    }
}
