pub mod account_service;
pub mod tweet_service;
