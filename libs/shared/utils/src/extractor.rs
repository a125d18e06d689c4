use std::sync::Arc;

use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, Request},
    middleware::Next,
    response::Response,
    body::Body,
};
use axum_extra::extract::cookie::CookieJar;

use shared_models::auth::User;
use shared_models::error::AppError;

use crate::jwt::validate_token;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "session";

/// Session token from `Authorization: Bearer` or, failing that, the session cookie.
pub fn session_token(headers: &HeaderMap) -> Result<String, AppError> {
    if let Some(auth_header) = headers.get(AUTHORIZATION) {
        let auth_value = auth_header
            .to_str()
            .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

        return auth_value
            .strip_prefix("Bearer ")
            .map(str::to_string)
            .ok_or_else(|| AppError::Auth("Invalid authorization header format".to_string()));
    }

    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .ok_or_else(|| AppError::Auth("Missing session".to_string()))
}

/// Verified user behind the request's session token.
pub fn session_user(headers: &HeaderMap, session_secret: &str) -> Result<User, AppError> {
    let token = session_token(headers)?;
    validate_token(&token, session_secret).map_err(AppError::Auth)
}

pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let user = session_user(request.headers(), &state.config.session_secret)?;

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}
