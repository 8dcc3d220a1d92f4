use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use microblog_api::application::account_service::AccountService;
use microblog_api::application::tweet_service::TweetService;
use microblog_api::data::tweet_repository::InMemoryTweetRepository;
use microblog_api::data::user_repository::InMemoryUserRepository;
use microblog_api::infrastructure::config::AppConfig;
use microblog_api::infrastructure::logging::init_logging;
use microblog_api::presentation::auth::{create_account, login, logout, sms_login};
use microblog_api::presentation::handlers::{
    AppState, change_password, create_tweet, current_user, delete_tweet, health_check,
    json_error_handler, list_tweets, query_error_handler, search_tweets, tweets_by_username,
    update_profile, user_by_username,
};
use microblog_api::presentation::middleware::RequestTrace;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    init_logging();

    let config = AppConfig::from_env();
    info!(
        host = %config.host,
        port = config.port,
        secure_cookies = config.secure_cookies,
        "Configuration loaded"
    );

    // Repositories are opened once here and shared; no action constructs its
    // own store handle.
    let users = Arc::new(InMemoryUserRepository::new());
    let tweets = Arc::new(InMemoryTweetRepository::new());

    let state = web::Data::new(AppState {
        accounts: AccountService::new(users.clone()),
        tweets: TweetService::new(tweets, users),
        config: config.clone(),
    });

    let bind_addr = config.bind_addr();
    info!(address = %format!("{}:{}", bind_addr.0, bind_addr.1), "Starting HTTP server");

    let cors_origin = config.cors_origin.clone();
    HttpServer::new(move || {
        let cors = match &cors_origin {
            // Cookie auth needs a credentialed CORS grant for the browser
            // origin; anything else stays same-origin only.
            Some(origin) => Cors::default()
                .allowed_origin(origin)
                .allow_any_method()
                .allow_any_header()
                .supports_credentials(),
            None => Cors::default().allow_any_method().allow_any_header(),
        };

        App::new()
            .app_data(state.clone())
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .app_data(web::QueryConfig::default().error_handler(query_error_handler))
            .wrap(cors)
            .wrap(RequestTrace)
            .service(
                web::scope("/api")
                    .route("/health", web::get().to(health_check))
                    .route("/account", web::post().to(create_account))
                    .route("/login", web::post().to(login))
                    .route("/login/sms", web::post().to(sms_login))
                    .route("/logout", web::post().to(logout))
                    .route("/me", web::get().to(current_user))
                    .route("/profile", web::put().to(update_profile))
                    .route("/password", web::put().to(change_password))
                    .route("/tweets", web::post().to(create_tweet))
                    .route("/tweets", web::get().to(list_tweets))
                    .route("/tweets/search", web::get().to(search_tweets))
                    .route("/tweets/{id}", web::delete().to(delete_tweet))
                    .route("/users/{username}", web::get().to(user_by_username))
                    .route("/users/{username}/tweets", web::get().to(tweets_by_username)),
            )
    })
    .bind(bind_addr)?
    .run()
    .await
}
