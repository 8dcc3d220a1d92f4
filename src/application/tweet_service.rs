use crate::domain::error::{DomainError, single_field};
use crate::domain::repository::{TweetRepository, UserRepository};
use crate::domain::tweet::{CreateTweet, Tweet, TweetView};
use crate::domain::validation;
use crate::infrastructure::session::SessionUser;
use anyhow::Result;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Tweet actions: posting, deleting own tweets, and the public feed/search
/// queries.
pub struct TweetService<T: TweetRepository, U: UserRepository> {
    tweets: Arc<T>,
    users: Arc<U>,
}

impl<T: TweetRepository, U: UserRepository> TweetService<T, U> {
    pub fn new(tweets: Arc<T>, users: Arc<U>) -> Self {
        Self { tweets, users }
    }

    #[instrument(skip(self, session, input))]
    pub async fn create_tweet(
        &self,
        session: Option<&SessionUser>,
        input: CreateTweet,
    ) -> Result<Tweet> {
        validation::validate_create_tweet(&input).map_err(DomainError::Validation)?;
        let session = session.ok_or(DomainError::Unauthenticated)?;

        // A session over a deleted user must not produce an orphaned row.
        if self.users.find_by_id(session.user_id).await?.is_none() {
            warn!(user_id = session.user_id, "Tweet from a stale session");
            return Err(DomainError::NotFound("User not found.".to_string()).into());
        }

        let tweet = self.tweets.create_tweet(input.content, session.user_id).await?;
        info!(tweet_id = tweet.id, user_id = session.user_id, "Tweet created");
        Ok(tweet)
    }

    /// A missing tweet and someone else's tweet produce the same result on
    /// purpose; callers cannot probe which ids exist.
    #[instrument(skip(self, session))]
    pub async fn delete_tweet(&self, session: Option<&SessionUser>, tweet_id: u32) -> Result<()> {
        let session = session.ok_or(DomainError::Unauthenticated)?;

        let tweet = self.tweets.find_by_id(tweet_id).await?;
        match tweet {
            Some(tweet) if tweet.user_id == session.user_id => {
                self.tweets.delete_tweet(tweet_id).await?;
                info!(tweet_id, user_id = session.user_id, "Tweet deleted");
                Ok(())
            }
            _ => {
                warn!(tweet_id, user_id = session.user_id, "Tweet delete refused");
                Err(DomainError::Forbidden(single_field(
                    "authorization",
                    "You cannot delete this tweet.",
                ))
                .into())
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn list_tweets(&self) -> Result<Vec<TweetView>> {
        let tweets = self.tweets.list_all().await?;
        self.with_authors(tweets).await
    }

    #[instrument(skip(self))]
    pub async fn search_tweets(&self, query: &str) -> Result<Vec<TweetView>> {
        validation::validate_search(query).map_err(DomainError::Validation)?;
        let tweets = self.tweets.search(query).await?;
        self.with_authors(tweets).await
    }

    #[instrument(skip(self))]
    pub async fn tweets_by_username(&self, username: &str) -> Result<Vec<TweetView>> {
        let user = self
            .users
            .find_by_username(username)
            .await?
            .ok_or_else(|| DomainError::NotFound("User not found.".to_string()))?;
        let tweets = self.tweets.list_by_user(user.id).await?;
        self.with_authors(tweets).await
    }

    async fn with_authors(&self, tweets: Vec<Tweet>) -> Result<Vec<TweetView>> {
        let mut views = Vec::with_capacity(tweets.len());
        for tweet in tweets {
            let username = self
                .users
                .find_by_id(tweet.user_id)
                .await?
                .map(|u| u.username)
                .unwrap_or_default();
            views.push(TweetView::new(tweet, username));
        }
        Ok(views)
    }
}
