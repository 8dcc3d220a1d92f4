pub mod tweet_repository;
pub mod user_repository;
