use std::sync::Arc;

use axum::{
    extract::{Extension, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Json, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::{session_token, SESSION_COOKIE};
use shared_utils::jwt::validate_token;
use shared_utils::state::AppState;

use crate::models::{LoginError, LoginPage, OAuthCallback, LOGIN_PAGE_PATH, LOGIN_PATH, OAUTH_STATE_COOKIE};
use crate::services::{authorize_url, LoginService};

fn cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

fn expired(name: &'static str) -> Cookie<'static> {
    Cookie::build(name).path("/").build()
}

pub async fn login_page(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let user = session_token(&headers)
        .ok()
        .and_then(|token| validate_token(&token, &state.config.session_secret).ok());

    if let Some(user) = &user {
        if state.access_token(user).is_ok() {
            debug!("User {} already signed in", user.id);
            return Redirect::to("/").into_response();
        }
    }

    Json(LoginPage { authenticated: user.is_some(), login_url: LOGIN_PATH }).into_response()
}

pub async fn login_drchrono(State(state): State<Arc<AppState>>, jar: CookieJar) -> (CookieJar, Redirect) {
    let oauth_state = Uuid::new_v4().to_string();
    let url = authorize_url(&state.config, &oauth_state);

    (jar.add(cookie(OAUTH_STATE_COOKIE, oauth_state)), Redirect::to(&url))
}

#[axum::debug_handler]
pub async fn complete_drchrono(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(callback): Query<OAuthCallback>,
) -> Result<(CookieJar, Redirect), AppError> {
    if let Some(error) = callback.error {
        warn!("Provider denied login: {}", error);
        return Err(LoginError::Denied(error).into());
    }

    let expected = jar.get(OAUTH_STATE_COOKIE).map(|c| c.value().to_string());
    if expected.is_none() || expected != callback.state {
        return Err(LoginError::StateMismatch.into());
    }
    let code = callback.code.ok_or(LoginError::MissingCode)?;

    let session = LoginService::new(&state).complete(&code, Utc::now()).await?;

    let jar = jar
        .remove(expired(OAUTH_STATE_COOKIE))
        .add(cookie(SESSION_COOKIE, session));
    Ok((jar, Redirect::to("/")))
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), AppError> {
    if !LoginService::new(&state).logout(&user.id)? {
        debug!("No stored credential for user {}", user.id);
    }

    Ok((jar.remove(expired(SESSION_COOKIE)), Redirect::to(LOGIN_PAGE_PATH)))
}
