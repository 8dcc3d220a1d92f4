use crate::domain::error::{DomainError, FieldErrors};
use crate::domain::repository::UserRepository;
use crate::domain::user::{NewUser, User};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, instrument, trace};

/// In-memory user store. Unique constraints on email, username and phone are
/// checked and the row inserted under a single write-lock acquisition, so two
/// racing creates with the same email resolve to exactly one success.
#[derive(Clone)]
pub struct InMemoryUserRepository {
    storage: Arc<RwLock<HashMap<u32, User>>>,
    next_id: Arc<AtomicU32>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self {
            storage: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicU32::new(1)),
        }
    }

    /// Unique-constraint sweep over `storage`, ignoring the row `except`
    /// (so updates do not conflict with themselves).
    fn constraint_violations(
        storage: &HashMap<u32, User>,
        email: &str,
        username: &str,
        phone: Option<&str>,
        except: Option<u32>,
    ) -> FieldErrors {
        let mut errors = FieldErrors::new();
        for user in storage.values() {
            if Some(user.id) == except {
                continue;
            }
            if user.email == email {
                errors
                    .entry("email".to_string())
                    .or_default()
                    .push("Email already in use".to_string());
            }
            if user.username == username {
                errors
                    .entry("username".to_string())
                    .or_default()
                    .push("Username already in use".to_string());
            }
            if phone.is_some() && user.phone.as_deref() == phone {
                errors
                    .entry("phone".to_string())
                    .or_default()
                    .push("Phone number already in use".to_string());
            }
        }
        errors
    }
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    #[instrument(skip(self, new_user), fields(username = %new_user.username))]
    async fn create_user(&self, new_user: NewUser) -> Result<User> {
        trace!("Acquiring write lock for user storage");
        let mut storage = self.storage.write().await;
        let violations = Self::constraint_violations(
            &storage,
            &new_user.email,
            &new_user.username,
            new_user.phone.as_deref(),
            None,
        );
        if !violations.is_empty() {
            return Err(DomainError::Conflict(violations).into());
        }
        let now = Utc::now();
        let user = User {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            email: new_user.email,
            username: new_user.username,
            password_hash: new_user.password_hash,
            bio: None,
            phone: new_user.phone,
            created_at: now,
            updated_at: now,
        };
        storage.insert(user.id, user.clone());
        debug!(user_id = user.id, "User row created");
        Ok(user)
    }

    async fn find_by_id(&self, id: u32) -> Result<Option<User>> {
        let storage = self.storage.read().await;
        Ok(storage.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let storage = self.storage.read().await;
        Ok(storage.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let storage = self.storage.read().await;
        Ok(storage.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_phone(&self, phone: &str) -> Result<Option<User>> {
        let storage = self.storage.read().await;
        Ok(storage
            .values()
            .find(|u| u.phone.as_deref() == Some(phone))
            .cloned())
    }

    #[instrument(skip(self, user), fields(user_id = user.id))]
    async fn update_user(&self, user: User) -> Result<()> {
        trace!("Acquiring write lock for user storage");
        let mut storage = self.storage.write().await;
        if !storage.contains_key(&user.id) {
            return Err(DomainError::NotFound("User not found.".to_string()).into());
        }
        let violations = Self::constraint_violations(
            &storage,
            &user.email,
            &user.username,
            user.phone.as_deref(),
            Some(user.id),
        );
        if !violations.is_empty() {
            return Err(DomainError::Conflict(violations).into());
        }
        debug!(user_id = user.id, "User row updated");
        storage.insert(user.id, user);
        Ok(())
    }
}
