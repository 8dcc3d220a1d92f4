use actix_web::http::StatusCode;
use actix_web::{App, test, web};
use microblog_api::application::account_service::AccountService;
use microblog_api::application::tweet_service::TweetService;
use microblog_api::data::tweet_repository::InMemoryTweetRepository;
use microblog_api::data::user_repository::InMemoryUserRepository;
use microblog_api::infrastructure::config::AppConfig;
use microblog_api::presentation::auth::{create_account, login, logout};
use microblog_api::presentation::handlers::{
    AppState, create_tweet, delete_tweet, health_check, json_error_handler, list_tweets,
    tweets_by_username,
};
use std::sync::Arc;

macro_rules! setup_api_test {
    () => {{
        let users = Arc::new(InMemoryUserRepository::new());
        let tweets = Arc::new(InMemoryTweetRepository::new());
        let config = AppConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            session_secret: "test-session-secret".to_string(),
            secure_cookies: false,
            cors_origin: None,
        };
        let state = web::Data::new(AppState {
            accounts: AccountService::new(users.clone()),
            tweets: TweetService::new(tweets, users),
            config,
        });

        test::init_service(
            App::new()
                .app_data(state.clone())
                .app_data(web::JsonConfig::default().error_handler(json_error_handler))
                .service(
                web::scope("/api")
                    .route("/health", web::get().to(health_check))
                    .route("/account", web::post().to(create_account))
                    .route("/login", web::post().to(login))
                    .route("/logout", web::post().to(logout))
                    .route("/tweets", web::post().to(create_tweet))
                    .route("/tweets", web::get().to(list_tweets))
                    .route("/tweets/{id}", web::delete().to(delete_tweet))
                    .route("/users/{username}/tweets", web::get().to(tweets_by_username)),
            ),
        )
        .await
    }};
}

fn session_cookie<B>(resp: &actix_web::dev::ServiceResponse<B>) -> actix_web::cookie::Cookie<'static> {
    resp.response()
        .cookies()
        .find(|c| c.name() == "session")
        .expect("session cookie")
        .into_owned()
}

#[actix_web::test]
async fn test_health_check() {
    let app = setup_api_test!();

    let req = test::TestRequest::get().uri("/api/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
}

/// End-to-end: register, log in, tweet, survive a foreign delete attempt,
/// and show up on the author's timeline.
#[actix_web::test]
async fn test_full_account_and_tweet_lifecycle() {
    let app = setup_api_test!();

    // Create account.
    let req = test::TestRequest::post()
        .uri("/api/account")
        .set_json(serde_json::json!({
            "email": "a@b.com",
            "password": "Abc123!",
            "username": "abc",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert!(body["userId"].is_u64());

    // Log in with the same credentials; a session cookie comes back.
    let req = test::TestRequest::post()
        .uri("/api/login")
        .set_json(serde_json::json!({"email": "a@b.com", "password": "Abc123!"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let abc_cookie = session_cookie(&resp);

    // Post a tweet.
    let req = test::TestRequest::post()
        .uri("/api/tweets")
        .cookie(abc_cookie)
        .set_json(serde_json::json!({"content": "hello"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: serde_json::Value = test::read_body_json(resp).await;
    let tweet_id = body["tweetId"].as_u64().expect("numeric tweetId");

    // A different user cannot delete it.
    let req = test::TestRequest::post()
        .uri("/api/account")
        .set_json(serde_json::json!({
            "email": "other@b.com",
            "password": "Abc123!",
            "username": "other",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let other_cookie = session_cookie(&resp);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/tweets/{tweet_id}"))
        .cookie(other_cookie)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // The row survived and shows on the author's timeline.
    let req = test::TestRequest::get()
        .uri("/api/users/abc/tweets")
        .to_request();
    let tweets: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let tweets = tweets.as_array().unwrap();
    assert_eq!(tweets.len(), 1);
    assert_eq!(tweets[0]["content"], "hello");
}

#[actix_web::test]
async fn test_concurrent_registrations_with_same_email() {
    // The store, not the pre-check, is the last line of defense: fire many
    // registrations for one email at once and exactly one account wins.
    let users = Arc::new(InMemoryUserRepository::new());
    let service = AccountService::new(users);
    let service = Arc::new(service);

    let handles: Vec<_> = (0..5)
        .map(|i| {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .create_account(microblog_api::domain::user::CreateAccount {
                        email: "race@b.com".to_string(),
                        password: "Abc123!".to_string(),
                        username: format!("user{i}"),
                        phone: None,
                    })
                    .await
            })
        })
        .collect();

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            successes += 1;
        }
    }
    assert_eq!(successes, 1);
}

#[actix_web::test]
async fn test_stale_session_cannot_act() {
    let app = setup_api_test!();

    // A signed cookie for a user id that never existed: signature checks
    // out, but the referenced row does not.
    let ghost = microblog_api::domain::user::User {
        id: 999,
        email: "ghost@b.com".to_string(),
        username: "ghost".to_string(),
        password_hash: "$argon2id$stub".to_string(),
        bio: None,
        phone: None,
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
    };
    let token =
        microblog_api::infrastructure::session::issue(&ghost, "test-session-secret").unwrap();
    let cookie = actix_web::cookie::Cookie::new("session", token);

    let req = test::TestRequest::post()
        .uri("/api/tweets")
        .cookie(cookie)
        .set_json(serde_json::json!({"content": "boo"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get().uri("/api/tweets").to_request();
    let feed: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert!(feed.as_array().unwrap().is_empty());
}
