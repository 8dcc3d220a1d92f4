use crate::domain::repository::TweetRepository;
use crate::domain::tweet::Tweet;
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, instrument, trace};

/// In-memory tweet store. Listing operations sort newest-first; equal
/// timestamps fall back to the id so ordering stays stable.
#[derive(Clone)]
pub struct InMemoryTweetRepository {
    storage: Arc<RwLock<HashMap<u32, Tweet>>>,
    next_id: Arc<AtomicU32>,
}

impl InMemoryTweetRepository {
    pub fn new() -> Self {
        Self {
            storage: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicU32::new(1)),
        }
    }

    fn newest_first(mut tweets: Vec<Tweet>) -> Vec<Tweet> {
        tweets.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        tweets
    }
}

impl Default for InMemoryTweetRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TweetRepository for InMemoryTweetRepository {
    #[instrument(skip(self, content), fields(user_id = user_id))]
    async fn create_tweet(&self, content: String, user_id: u32) -> Result<Tweet> {
        trace!("Acquiring write lock for tweet storage");
        let mut storage = self.storage.write().await;
        let tweet = Tweet {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            content,
            user_id,
            created_at: Utc::now(),
        };
        storage.insert(tweet.id, tweet.clone());
        debug!(tweet_id = tweet.id, user_id = user_id, "Tweet row created");
        Ok(tweet)
    }

    async fn find_by_id(&self, id: u32) -> Result<Option<Tweet>> {
        let storage = self.storage.read().await;
        Ok(storage.get(&id).cloned())
    }

    #[instrument(skip(self))]
    async fn delete_tweet(&self, id: u32) -> Result<()> {
        let mut storage = self.storage.write().await;
        if storage.remove(&id).is_some() {
            debug!(tweet_id = id, "Tweet row deleted");
        }
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Tweet>> {
        let storage = self.storage.read().await;
        Ok(Self::newest_first(storage.values().cloned().collect()))
    }

    async fn list_by_user(&self, user_id: u32) -> Result<Vec<Tweet>> {
        let storage = self.storage.read().await;
        Ok(Self::newest_first(
            storage
                .values()
                .filter(|t| t.user_id == user_id)
                .cloned()
                .collect(),
        ))
    }

    async fn search(&self, query: &str) -> Result<Vec<Tweet>> {
        let needle = query.to_lowercase();
        let storage = self.storage.read().await;
        Ok(Self::newest_first(
            storage
                .values()
                .filter(|t| t.content.to_lowercase().contains(&needle))
                .cloned()
                .collect(),
        ))
    }
}
