use chrono::{DateTime, Duration, Utc};
use tracing::info;

use shared_config::AppConfig;
use shared_database::cache::Credential;
use shared_utils::jwt::issue_session_token;
use shared_utils::state::AppState;

use crate::models::LoginError;

pub const PROVIDER: &str = "drchrono";

/// Provider URL that starts the authorization-code grant.
pub fn authorize_url(config: &AppConfig, state: &str) -> String {
    format!(
        "{}?response_type=code&client_id={}&redirect_uri={}&state={}",
        config.api_url("/o/authorize/"),
        urlencoding::encode(&config.drchrono_client_id),
        urlencoding::encode(&config.drchrono_redirect_uri),
        urlencoding::encode(state),
    )
}

pub struct LoginService<'a> {
    state: &'a AppState,
}

impl<'a> LoginService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    /// Exchanges the callback code, stores the credential under the remote user id,
    /// records the doctor and returns a session token for the browser.
    pub async fn complete(&self, code: &str, now: DateTime<Utc>) -> Result<String, LoginError> {
        let config = &self.state.config;
        let token = self.state.scheduler.exchange_code(code).await?;

        let current = self.state.scheduler.current_user(&token.access_token).await?;
        let user_ref = current.id.to_string();

        self.state.store.save_credential(&Credential {
            user_ref: user_ref.clone(),
            provider: PROVIDER.to_string(),
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at: token.expires_in.map(|seconds| now + Duration::seconds(seconds)),
        })?;

        let doctor = self.state.store.get_or_create_doctor(&user_ref, current.doctor)?;
        info!("User {} signed in as doctor {}", user_ref, doctor.doctor_id);

        issue_session_token(
            &user_ref,
            current.username.as_deref(),
            &config.session_secret,
            config.session_ttl_hours,
        )
        .map_err(LoginError::Session)
    }

    /// Forgets the stored credential. Returns whether one existed.
    pub fn logout(&self, user_ref: &str) -> Result<bool, LoginError> {
        Ok(self.state.store.delete_credential(user_ref)?)
    }
}
