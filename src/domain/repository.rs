use crate::domain::tweet::Tweet;
use crate::domain::user::{NewUser, User};
use anyhow::Result;
use async_trait::async_trait;

/// Query/mutation surface of the user store. `create_user` and `update_user`
/// enforce the unique constraints on email, username and phone atomically;
/// a violation surfaces as `DomainError::Conflict`.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, new_user: NewUser) -> Result<User>;
    async fn find_by_id(&self, id: u32) -> Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn find_by_phone(&self, phone: &str) -> Result<Option<User>>;
    async fn update_user(&self, user: User) -> Result<()>;
}

/// Query/mutation surface of the tweet store. Listing operations return
/// tweets newest-first.
#[async_trait]
pub trait TweetRepository: Send + Sync {
    async fn create_tweet(&self, content: String, user_id: u32) -> Result<Tweet>;
    async fn find_by_id(&self, id: u32) -> Result<Option<Tweet>>;
    async fn delete_tweet(&self, id: u32) -> Result<()>;
    async fn list_all(&self) -> Result<Vec<Tweet>>;
    async fn list_by_user(&self, user_id: u32) -> Result<Vec<Tweet>>;
    async fn search(&self, query: &str) -> Result<Vec<Tweet>>;
}
