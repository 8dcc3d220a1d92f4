//! Session manager. Issues, reads and revokes the `session` cookie; no other
//! module touches cookie bytes. The payload (`userId`, `email`, `username`)
//! is carried as HS256-signed claims so a tampered cookie reads as
//! "no session".

use crate::domain::user::User;
use actix_web::HttpRequest;
use actix_web::cookie::time::Duration as CookieDuration;
use actix_web::cookie::{Cookie, SameSite};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::trace;

pub const SESSION_COOKIE: &str = "session";
const SESSION_TTL_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    sub: String, // user id
    email: String,
    username: String,
    iat: usize,
    exp: usize,
}

/// Identity asserted by a valid session cookie.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub user_id: u32,
    pub email: String,
    pub username: String,
}

/// Signs a session token for `user`, valid for 24 hours.
pub fn issue(user: &User, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0) as usize;

    let claims = SessionClaims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        username: user.username.clone(),
        iat: now,
        exp: now + SESSION_TTL_SECS as usize,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
}

/// Decodes a session token. Any failure (bad signature, expired, malformed
/// claims, non-numeric subject) reads as `None`; callers treat that exactly
/// like a missing cookie.
pub fn read(token: &str, secret: &str) -> Option<SessionUser> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 60; // 60 seconds leeway

    let token_data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &validation,
    )
    .ok()?;

    let user_id = token_data.claims.sub.parse().ok()?;
    Some(SessionUser {
        user_id,
        email: token_data.claims.email,
        username: token_data.claims.username,
    })
}

/// Reads the session off an incoming request, if present and valid.
pub fn read_request(req: &HttpRequest, secret: &str) -> Option<SessionUser> {
    let cookie = req.cookie(SESSION_COOKIE)?;
    let session = read(cookie.value(), secret);
    if session.is_none() {
        trace!("Session cookie present but unreadable");
    }
    session
}

/// Cookie carrying a freshly issued token: http-only, strict same-site,
/// site-wide, 24h max-age, `Secure` outside development.
pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token)
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(CookieDuration::seconds(SESSION_TTL_SECS as i64))
        .finish()
}

/// Expired cookie that removes the session client-side. Safe to send whether
/// or not a session exists.
pub fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, "");
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.make_removal();
    cookie
}
