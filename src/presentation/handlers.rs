use crate::application::account_service::AccountService;
use crate::application::tweet_service::TweetService;
use crate::data::tweet_repository::InMemoryTweetRepository;
use crate::data::user_repository::InMemoryUserRepository;
use crate::domain::error::{DomainError, FieldErrors, single_field};
use crate::domain::tweet::{CreateTweet, SearchQuery};
use crate::domain::user::{ChangePassword, UpdateProfile};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::session::{self, SessionUser};
use actix_web::error::{JsonPayloadError, QueryPayloadError};
use actix_web::{FromRequest, HttpRequest, HttpResponse, ResponseError, web};
use chrono::Utc;
use serde::Serialize;
use std::future::{Ready, ready};
use thiserror::Error;
use tracing::{error, info, instrument, warn};

pub struct AppState {
    pub accounts: AccountService<InMemoryUserRepository>,
    pub tweets: TweetService<InMemoryTweetRepository, InMemoryUserRepository>,
    pub config: AppConfig,
}

/// Uniform failure body: `{message, errors: {field: [messages]}}`.
#[derive(Serialize)]
struct ErrorBody {
    message: String,
    errors: FieldErrors,
}

/// Uniform success body: `{message, success, userId?, tweetId?}`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionOk {
    pub message: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tweet_id: Option<u32>,
}

impl ActionOk {
    pub fn new(message: &str) -> Self {
        ActionOk {
            message: message.to_string(),
            success: true,
            user_id: None,
            tweet_id: None,
        }
    }

    pub fn with_user(mut self, user_id: u32) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_tweet(mut self, tweet_id: u32) -> Self {
        self.tweet_id = Some(tweet_id);
        self
    }
}

/// HTTP-facing error. `From<anyhow::Error>` recovers the `DomainError` a
/// service buried in the chain; anything unrecognized becomes a 500 with a
/// redacted body.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid input. Please check the fields.")]
    Validation(FieldErrors),
    #[error("Some fields are already in use.")]
    Conflict(FieldErrors),
    #[error("Authentication required.")]
    Unauthenticated,
    #[error("{message}")]
    Rejected {
        message: String,
        errors: FieldErrors,
    },
    #[error("Unauthorized or tweet not found")]
    Forbidden(FieldErrors),
    #[error("{0}")]
    NotFound(String),
    #[error("Server error occurred.")]
    Internal(String),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Rejected { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = self.to_string();

        let errors = match self {
            ApiError::Validation(errors)
            | ApiError::Conflict(errors)
            | ApiError::Rejected { errors, .. }
            | ApiError::Forbidden(errors) => errors.clone(),
            ApiError::Unauthenticated => single_field("server", "You must be logged in."),
            ApiError::NotFound(message) => single_field("server", message),
            // The detail stays in the log; the client sees a generic banner.
            ApiError::Internal(_) => {
                single_field("server", "Server error occurred. Please try again.")
            }
        };

        match self {
            ApiError::Internal(detail) => {
                error!(error = %detail, status = %status, "Request failed with server error")
            }
            _ => warn!(error = %message, status = %status, "Request rejected"),
        }

        HttpResponse::build(status).json(ErrorBody { message, errors })
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<DomainError>() {
            Ok(DomainError::Validation(errors)) => ApiError::Validation(errors),
            Ok(DomainError::Conflict(errors)) => ApiError::Conflict(errors),
            Ok(DomainError::Unauthenticated) => ApiError::Unauthenticated,
            Ok(DomainError::CredentialsRejected { message, errors }) => {
                ApiError::Rejected { message, errors }
            }
            Ok(DomainError::Forbidden(errors)) => ApiError::Forbidden(errors),
            Ok(DomainError::NotFound(message)) => ApiError::NotFound(message),
            Ok(DomainError::Internal(detail)) => ApiError::Internal(detail),
            Err(other) => ApiError::Internal(other.to_string()),
        }
    }
}

/// Renders body-deserialization failures (unparseable JSON, wrong types) in
/// the uniform error shape. Install via `web::JsonConfig::error_handler`.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    warn!(error = %err, "Rejected malformed request body");
    ApiError::Validation(single_field("server", "Malformed request body")).into()
}

/// Same for query-string extraction failures.
pub fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    warn!(error = %err, "Rejected malformed query string");
    ApiError::Validation(single_field("server", "Malformed query string")).into()
}

/// Extracts the session from the cookie. Malformed and missing sessions both
/// fail extraction; handlers that tolerate anonymity take `Option<SessionUser>`.
impl FromRequest for SessionUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        let session = req
            .app_data::<web::Data<AppState>>()
            .and_then(|state| session::read_request(req, &state.config.session_secret));
        ready(session.ok_or(ApiError::Unauthenticated))
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    timestamp: String,
}

#[instrument]
pub async fn health_check() -> HttpResponse {
    let response = HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now().to_rfc3339(),
    };
    HttpResponse::Ok().json(response)
}

#[instrument(skip(state, session, input))]
pub async fn create_tweet(
    state: web::Data<AppState>,
    session: Option<SessionUser>,
    input: web::Json<CreateTweet>,
) -> Result<HttpResponse, ApiError> {
    let tweet = state
        .tweets
        .create_tweet(session.as_ref(), input.into_inner())
        .await
        .map_err(ApiError::from)?;
    Ok(HttpResponse::Created()
        .json(ActionOk::new("Tweet created successfully!").with_tweet(tweet.id)))
}

#[instrument(skip(state, session), fields(tweet_id = %*path))]
pub async fn delete_tweet(
    state: web::Data<AppState>,
    session: Option<SessionUser>,
    path: web::Path<u32>,
) -> Result<HttpResponse, ApiError> {
    state
        .tweets
        .delete_tweet(session.as_ref(), path.into_inner())
        .await
        .map_err(ApiError::from)?;
    Ok(HttpResponse::Ok().json(ActionOk::new("Tweet deleted successfully!")))
}

#[instrument(skip(state))]
pub async fn list_tweets(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let tweets = state.tweets.list_tweets().await.map_err(ApiError::from)?;
    Ok(HttpResponse::Ok().json(tweets))
}

#[instrument(skip(state, query))]
pub async fn search_tweets(
    state: web::Data<AppState>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, ApiError> {
    let tweets = state
        .tweets
        .search_tweets(&query.query)
        .await
        .map_err(ApiError::from)?;
    Ok(HttpResponse::Ok().json(tweets))
}

/// Nullable by design: an anonymous or stale session is `null`, not an error.
#[instrument(skip(state, session))]
pub async fn current_user(
    state: web::Data<AppState>,
    session: Option<SessionUser>,
) -> Result<HttpResponse, ApiError> {
    let profile = state
        .accounts
        .current_user(session.as_ref())
        .await
        .map_err(ApiError::from)?;
    Ok(HttpResponse::Ok().json(profile))
}

#[instrument(skip(state), fields(username = %*path))]
pub async fn user_by_username(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let profile = state
        .accounts
        .user_by_username(&path)
        .await
        .map_err(ApiError::from)?;
    Ok(HttpResponse::Ok().json(profile))
}

#[instrument(skip(state), fields(username = %*path))]
pub async fn tweets_by_username(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let tweets = state
        .tweets
        .tweets_by_username(&path)
        .await
        .map_err(ApiError::from)?;
    Ok(HttpResponse::Ok().json(tweets))
}

#[instrument(skip(state, session, input))]
pub async fn update_profile(
    state: web::Data<AppState>,
    session: Option<SessionUser>,
    input: web::Json<UpdateProfile>,
) -> Result<HttpResponse, ApiError> {
    let user = state
        .accounts
        .update_profile(session.as_ref(), input.into_inner())
        .await
        .map_err(ApiError::from)?;
    // The cookie carries email/username, so a profile edit refreshes it.
    let cookie = crate::presentation::auth::issue_session_cookie(&user, &state.config)?;
    info!(user_id = user.id, "Profile updated, session re-issued");
    Ok(HttpResponse::Ok()
        .cookie(cookie)
        .json(ActionOk::new("Profile updated successfully!")))
}

#[instrument(skip(state, session, input))]
pub async fn change_password(
    state: web::Data<AppState>,
    session: Option<SessionUser>,
    input: web::Json<ChangePassword>,
) -> Result<HttpResponse, ApiError> {
    state
        .accounts
        .change_password(session.as_ref(), input.into_inner())
        .await
        .map_err(ApiError::from)?;
    Ok(HttpResponse::Ok().json(ActionOk::new("Password changed successfully!")))
}
