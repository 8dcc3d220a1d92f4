use crate::domain::user::{CreateAccount, Login, SmsLogin, User};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::session::{self, SessionUser};
use crate::presentation::handlers::{ActionOk, ApiError, AppState};
use actix_web::cookie::Cookie;
use actix_web::{HttpResponse, web};
use tracing::{debug, error, info, instrument};

/// Signs a session for `user` and wraps it in the session cookie. The only
/// failure mode is a signing fault, which surfaces as a server error.
pub(crate) fn issue_session_cookie(
    user: &User,
    config: &AppConfig,
) -> Result<Cookie<'static>, ApiError> {
    let token = session::issue(user, &config.session_secret).map_err(|e| {
        error!(error = %e, "Failed to sign session token");
        ApiError::Internal("Failed to sign session token".to_string())
    })?;
    Ok(session::session_cookie(token, config.secure_cookies))
}

#[instrument(skip(state, input), fields(email = %input.email, username = %input.username))]
pub async fn create_account(
    state: web::Data<AppState>,
    input: web::Json<CreateAccount>,
) -> Result<HttpResponse, ApiError> {
    let user = state
        .accounts
        .create_account(input.into_inner())
        .await
        .map_err(ApiError::from)?;
    let cookie = issue_session_cookie(&user, &state.config)?;
    info!(user_id = user.id, "Account created, session issued");
    Ok(HttpResponse::Created()
        .cookie(cookie)
        .json(ActionOk::new("Account created successfully!").with_user(user.id)))
}

#[instrument(skip(state, input), fields(email = %input.email))]
pub async fn login(
    state: web::Data<AppState>,
    input: web::Json<Login>,
) -> Result<HttpResponse, ApiError> {
    let user = state
        .accounts
        .login(input.into_inner())
        .await
        .map_err(ApiError::from)?;
    let cookie = issue_session_cookie(&user, &state.config)?;
    info!(user_id = user.id, "Login successful, session issued");
    Ok(HttpResponse::Ok()
        .cookie(cookie)
        .json(ActionOk::new("Login successful!").with_user(user.id)))
}

#[instrument(skip(state, input))]
pub async fn sms_login(
    state: web::Data<AppState>,
    input: web::Json<SmsLogin>,
) -> Result<HttpResponse, ApiError> {
    let user = state
        .accounts
        .sms_login(input.into_inner())
        .await
        .map_err(ApiError::from)?;
    let cookie = issue_session_cookie(&user, &state.config)?;
    info!(user_id = user.id, "SMS login successful, session issued");
    Ok(HttpResponse::Ok()
        .cookie(cookie)
        .json(ActionOk::new("SMS Login successful!").with_user(user.id)))
}

/// Clears the session cookie. Idempotent: logging out without a session (or
/// twice in a row) still succeeds.
#[instrument(skip(session))]
pub async fn logout(session: Option<SessionUser>) -> HttpResponse {
    match session {
        Some(session) => info!(user_id = session.user_id, "Session revoked"),
        None => debug!("Logout without an active session"),
    }
    HttpResponse::Ok()
        .cookie(session::removal_cookie())
        .json(ActionOk::new("Logged out successfully!"))
}
