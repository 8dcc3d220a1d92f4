use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tweet {
    pub id: u32,
    pub content: String,
    pub user_id: u32,
    pub created_at: DateTime<Utc>,
}

/// A tweet joined with its author's username, as rendered in feeds.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TweetView {
    pub id: u32,
    pub content: String,
    pub user_id: u32,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl TweetView {
    pub fn new(tweet: Tweet, username: String) -> Self {
        TweetView {
            id: tweet.id,
            content: tweet.content,
            user_id: tweet.user_id,
            username,
            created_at: tweet.created_at,
        }
    }
}

// Missing fields default to empty so they report as field-scoped
// validation errors.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateTweet {
    pub content: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchQuery {
    pub query: String,
}
