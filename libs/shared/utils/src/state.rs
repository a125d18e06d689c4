use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use shared_config::AppConfig;
use shared_database::cache::{Database, Doctor};
use shared_database::sync::resolve_doctor;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_models::scheduling::SchedulingProvider;

/// Shared request state: configuration, the local cache and the remote scheduling API.
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<Database>,
    pub scheduler: Arc<dyn SchedulingProvider>,
}

/// What an authenticated handler needs to talk to the remote API on a clinician's behalf.
#[derive(Debug, Clone)]
pub struct DoctorSession {
    pub access_token: String,
    pub doctor: Doctor,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<Database>, scheduler: Arc<dyn SchedulingProvider>) -> Self {
        Self { config, store, scheduler }
    }

    /// Bearer token from the stored credential of the signed-in account.
    pub fn access_token(&self, user: &User) -> Result<String, AppError> {
        let credential = self
            .store
            .get_credential(&user.id)?
            .ok_or_else(|| AppError::Auth("No stored credential for this account".to_string()))?;

        if let Some(expires_at) = credential.expires_at {
            if expires_at <= Utc::now() {
                debug!("Credential for user {} expired at {}", user.id, expires_at);
                return Err(AppError::Auth("Stored credential expired".to_string()));
            }
        }

        Ok(credential.access_token)
    }

    pub async fn doctor_session(&self, user: &User) -> Result<DoctorSession, AppError> {
        let access_token = self.access_token(user)?;
        let doctor = resolve_doctor(self.scheduler.as_ref(), &self.store, &access_token, &user.id).await?;
        Ok(DoctorSession { access_token, doctor })
    }
}
