pub mod error;
pub mod repository;
pub mod tweet;
pub mod user;
pub mod validation;
