use std::env;
use tracing::warn;

const DEV_SESSION_SECRET: &str = "insecure-dev-session-secret";

/// Process configuration, read from the environment once at startup and
/// cloned into the application state. No other module reads env vars.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// HMAC key for session tokens.
    pub session_secret: String,
    /// Marks session cookies `Secure`; enabled when `APP_ENV=production`.
    pub secure_cookies: bool,
    /// Browser origin allowed to send credentialed requests, if any.
    pub cors_origin: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);
        let secure_cookies = env::var("APP_ENV").as_deref() == Ok("production");
        let session_secret = match env::var("SESSION_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ => {
                warn!("SESSION_SECRET not set, falling back to the development secret");
                DEV_SESSION_SECRET.to_string()
            }
        };
        let cors_origin = env::var("CORS_ORIGIN").ok().filter(|o| !o.is_empty());

        AppConfig {
            host,
            port,
            session_secret,
            secure_cookies,
            cors_origin,
        }
    }

    pub fn bind_addr(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}
