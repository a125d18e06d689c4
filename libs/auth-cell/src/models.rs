use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_database::DbError;
use shared_models::error::AppError;
use shared_models::scheduling::SchedulingError;

pub const OAUTH_STATE_COOKIE: &str = "oauth_state";
pub const LOGIN_PATH: &str = "/login/drchrono/";
pub const LOGIN_PAGE_PATH: &str = "/login_page/";

#[derive(Debug, Serialize)]
pub struct LoginPage {
    pub authenticated: bool,
    pub login_url: &'static str,
}

/// Query string the provider sends back to the redirect URI.
#[derive(Debug, Default, Deserialize)]
pub struct OAuthCallback {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Error, Debug)]
pub enum LoginError {
    #[error("Login was denied by the provider: {0}")]
    Denied(String),

    #[error("Login state does not match this browser")]
    StateMismatch,

    #[error("Authorization code missing from callback")]
    MissingCode,

    #[error("Could not issue session: {0}")]
    Session(String),

    #[error(transparent)]
    Scheduling(#[from] SchedulingError),

    #[error(transparent)]
    Store(#[from] DbError),
}

impl From<LoginError> for AppError {
    fn from(err: LoginError) -> Self {
        match err {
            LoginError::Denied(_) | LoginError::StateMismatch => AppError::Auth(err.to_string()),
            LoginError::MissingCode => AppError::BadRequest(err.to_string()),
            LoginError::Session(msg) => AppError::Internal(msg),
            LoginError::Scheduling(e) => e.into(),
            LoginError::Store(e) => e.into(),
        }
    }
}
