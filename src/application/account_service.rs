use crate::domain::error::{DomainError, FieldErrors};
use crate::domain::repository::UserRepository;
use crate::domain::user::{
    ChangePassword, CreateAccount, Login, NewUser, SmsLogin, UpdateProfile, User, UserProfile,
};
use crate::domain::validation;
use crate::infrastructure::security::{hash_password, verify_password};
use crate::infrastructure::session::SessionUser;
use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Account actions: create account, both login variants, profile editing and
/// password change. Every action validates first, then authorizes, then
/// performs its single store operation; expected failures come back as
/// `DomainError` inside the `anyhow` chain.
pub struct AccountService<U: UserRepository> {
    users: Arc<U>,
}

/// Runs the CPU-bound argon2 hash off the async worker.
async fn hash_blocking(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| DomainError::Internal(format!("Hashing task failed: {e}")))?
        .map_err(|e| {
            error!(error = %e, "Failed to hash password");
            DomainError::Internal(format!("Failed to hash password: {e}")).into()
        })
}

async fn verify_blocking(password: String, hash: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| DomainError::Internal(format!("Hashing task failed: {e}")))?
        .map_err(|e| {
            error!(error = %e, "Failed to verify password");
            DomainError::Internal(format!("Failed to verify password: {e}")).into()
        })
}

fn require_session(session: Option<&SessionUser>) -> Result<&SessionUser> {
    session.ok_or_else(|| DomainError::Unauthenticated.into())
}

impl<U: UserRepository> AccountService<U> {
    pub fn new(users: Arc<U>) -> Self {
        Self { users }
    }

    #[instrument(skip(self, input), fields(email = %input.email, username = %input.username))]
    pub async fn create_account(&self, input: CreateAccount) -> Result<User> {
        validation::validate_create_account(&input).map_err(DomainError::Validation)?;

        // Pre-check uniqueness so each taken field gets its own message; the
        // store re-checks under its write lock for the racing case.
        let mut conflicts = FieldErrors::new();
        if self.users.find_by_email(&input.email).await?.is_some() {
            conflicts.insert("email".to_string(), vec!["Email already in use".to_string()]);
        }
        if self.users.find_by_username(&input.username).await?.is_some() {
            conflicts.insert(
                "username".to_string(),
                vec!["Username already in use".to_string()],
            );
        }
        if let Some(phone) = input.phone.as_deref() {
            if self.users.find_by_phone(phone).await?.is_some() {
                conflicts.insert(
                    "phone".to_string(),
                    vec!["Phone number already in use".to_string()],
                );
            }
        }
        if !conflicts.is_empty() {
            warn!("Account creation hit fields already in use");
            return Err(DomainError::Conflict(conflicts).into());
        }

        let password_hash = hash_blocking(input.password).await?;
        let user = self
            .users
            .create_user(NewUser {
                email: input.email,
                username: input.username,
                password_hash,
                phone: input.phone,
            })
            .await?;

        info!(user_id = user.id, "Account created");
        Ok(user)
    }

    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn login(&self, input: Login) -> Result<User> {
        validation::validate_login(&input).map_err(DomainError::Validation)?;

        let user = self
            .users
            .find_by_email(&input.email)
            .await?
            .ok_or_else(|| {
                warn!("Login attempt for unknown email");
                DomainError::credentials_rejected(
                    "Invalid email or password.",
                    "email",
                    "Email not found",
                )
            })?;

        let valid = verify_blocking(input.password, user.password_hash.clone()).await?;
        if !valid {
            warn!(user_id = user.id, "Login attempt with wrong password");
            return Err(DomainError::credentials_rejected(
                "Invalid email or password.",
                "password",
                "Invalid password",
            )
            .into());
        }

        info!(user_id = user.id, "Login successful");
        Ok(user)
    }

    /// Phone-number login. No SMS code is sent or checked; a registered
    /// phone number is sufficient.
    #[instrument(skip(self, input))]
    pub async fn sms_login(&self, input: SmsLogin) -> Result<User> {
        validation::validate_sms_login(&input).map_err(|errors| {
            DomainError::CredentialsRejected {
                message: "Invalid phone number.".to_string(),
                errors,
            }
        })?;

        let user = self
            .users
            .find_by_phone(&input.phone)
            .await?
            .ok_or_else(|| {
                warn!("SMS login attempt for unregistered phone");
                DomainError::credentials_rejected(
                    "Phone number not registered.",
                    "phone",
                    "Phone number not found",
                )
            })?;

        info!(user_id = user.id, "SMS login successful");
        Ok(user)
    }

    /// Looks the session's user back up; a stale session over a deleted user
    /// reads as logged-out rather than trusting the cookie's fields.
    #[instrument(skip(self, session))]
    pub async fn current_user(&self, session: Option<&SessionUser>) -> Result<Option<UserProfile>> {
        let Some(session) = session else {
            return Ok(None);
        };
        let user = self.users.find_by_id(session.user_id).await?;
        if user.is_none() {
            debug!(user_id = session.user_id, "Session references a missing user");
        }
        Ok(user.map(UserProfile::from))
    }

    #[instrument(skip(self))]
    pub async fn user_by_username(&self, username: &str) -> Result<UserProfile> {
        self.users
            .find_by_username(username)
            .await?
            .map(UserProfile::from)
            .ok_or_else(|| DomainError::NotFound("User not found.".to_string()).into())
    }

    #[instrument(skip(self, session, input))]
    pub async fn update_profile(
        &self,
        session: Option<&SessionUser>,
        input: UpdateProfile,
    ) -> Result<User> {
        validation::validate_update_profile(&input).map_err(DomainError::Validation)?;
        let session = require_session(session)?;

        let mut user = self
            .users
            .find_by_id(session.user_id)
            .await?
            .ok_or_else(|| DomainError::NotFound("User not found.".to_string()))?;

        let mut conflicts = FieldErrors::new();
        if let Some(other) = self.users.find_by_email(&input.email).await? {
            if other.id != user.id {
                conflicts.insert("email".to_string(), vec!["Email already in use".to_string()]);
            }
        }
        if let Some(other) = self.users.find_by_username(&input.username).await? {
            if other.id != user.id {
                conflicts.insert(
                    "username".to_string(),
                    vec!["Username already in use".to_string()],
                );
            }
        }
        if !conflicts.is_empty() {
            warn!(user_id = user.id, "Profile update hit fields already in use");
            return Err(DomainError::Conflict(conflicts).into());
        }

        user.email = input.email;
        user.username = input.username;
        user.bio = input.bio;
        user.updated_at = Utc::now();
        self.users.update_user(user.clone()).await?;

        info!(user_id = user.id, "Profile updated");
        Ok(user)
    }

    #[instrument(skip(self, session, input))]
    pub async fn change_password(
        &self,
        session: Option<&SessionUser>,
        input: ChangePassword,
    ) -> Result<()> {
        validation::validate_change_password(&input).map_err(DomainError::Validation)?;
        let session = require_session(session)?;

        let mut user = self
            .users
            .find_by_id(session.user_id)
            .await?
            .ok_or_else(|| DomainError::NotFound("User not found.".to_string()))?;

        let valid = verify_blocking(input.current_password, user.password_hash.clone()).await?;
        if !valid {
            warn!(user_id = user.id, "Password change with wrong current password");
            return Err(DomainError::credentials_rejected(
                "Invalid current password.",
                "currentPassword",
                "Incorrect current password",
            )
            .into());
        }

        user.password_hash = hash_blocking(input.new_password).await?;
        user.updated_at = Utc::now();
        self.users.update_user(user.clone()).await?;

        info!(user_id = user.id, "Password changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::user_repository::InMemoryUserRepository;

    fn service() -> AccountService<InMemoryUserRepository> {
        AccountService::new(Arc::new(InMemoryUserRepository::new()))
    }

    fn account(email: &str, username: &str) -> CreateAccount {
        CreateAccount {
            email: email.to_string(),
            password: "Abc123!".to_string(),
            username: username.to_string(),
            phone: None,
        }
    }

    fn session_for(user: &User) -> SessionUser {
        SessionUser {
            user_id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
        }
    }

    #[tokio::test]
    async fn test_create_account_hashes_the_password() {
        let service = service();
        let user = service.create_account(account("a@b.com", "abc")).await.unwrap();
        assert_ne!(user.password_hash, "Abc123!");
        assert!(user.password_hash.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn test_create_account_validation_failure_skips_the_store() {
        let service = service();
        let err = service
            .create_account(CreateAccount {
                email: "bad".to_string(),
                password: "Abc123!".to_string(),
                username: "abc".to_string(),
                phone: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DomainError>(),
            Some(DomainError::Validation(_))
        ));
        // Nothing was written, so the valid variant still succeeds.
        assert!(service.create_account(account("a@b.com", "abc")).await.is_ok());
    }

    #[tokio::test]
    async fn test_login_wrong_password_is_rejected_per_field() {
        let service = service();
        service.create_account(account("a@b.com", "abc")).await.unwrap();

        let err = service
            .login(Login {
                email: "a@b.com".to_string(),
                password: "Wrong1!".to_string(),
            })
            .await
            .unwrap_err();
        match err.downcast_ref::<DomainError>() {
            Some(DomainError::CredentialsRejected { message, errors }) => {
                assert_eq!(message, "Invalid email or password.");
                assert_eq!(errors["password"], vec!["Invalid password"]);
            }
            other => panic!("expected CredentialsRejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_login_unknown_email_blames_the_email_field() {
        let service = service();
        let err = service
            .login(Login {
                email: "nobody@b.com".to_string(),
                password: "Abc123!".to_string(),
            })
            .await
            .unwrap_err();
        match err.downcast_ref::<DomainError>() {
            Some(DomainError::CredentialsRejected { errors, .. }) => {
                assert_eq!(errors["email"], vec!["Email not found"]);
            }
            other => panic!("expected CredentialsRejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_sms_login_with_registered_phone() {
        let service = service();
        let mut input = account("a@b.com", "abc");
        input.phone = Some("01012345678".to_string());
        let user = service.create_account(input).await.unwrap();

        let logged_in = service
            .sms_login(SmsLogin {
                phone: "01012345678".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(logged_in.id, user.id);

        let err = service
            .sms_login(SmsLogin {
                phone: "01099999999".to_string(),
            })
            .await
            .unwrap_err();
        match err.downcast_ref::<DomainError>() {
            Some(DomainError::CredentialsRejected { message, errors }) => {
                assert_eq!(message, "Phone number not registered.");
                assert_eq!(errors["phone"], vec!["Phone number not found"]);
            }
            other => panic!("expected CredentialsRejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_update_profile_requires_a_session() {
        let service = service();
        let err = service
            .update_profile(
                None,
                UpdateProfile {
                    email: "a@b.com".to_string(),
                    username: "abc".to_string(),
                    bio: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DomainError>(),
            Some(DomainError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_update_profile_rejects_taken_username() {
        let service = service();
        service.create_account(account("a@b.com", "alice")).await.unwrap();
        let bob = service.create_account(account("b@b.com", "bob11")).await.unwrap();

        let err = service
            .update_profile(
                Some(&session_for(&bob)),
                UpdateProfile {
                    email: "b@b.com".to_string(),
                    username: "alice".to_string(),
                    bio: None,
                },
            )
            .await
            .unwrap_err();
        match err.downcast_ref::<DomainError>() {
            Some(DomainError::Conflict(errors)) => {
                assert_eq!(errors["username"], vec!["Username already in use"]);
            }
            other => panic!("expected Conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_update_profile_keeps_own_fields_without_conflict() {
        let service = service();
        let user = service.create_account(account("a@b.com", "abc")).await.unwrap();

        let updated = service
            .update_profile(
                Some(&session_for(&user)),
                UpdateProfile {
                    email: "a@b.com".to_string(),
                    username: "abc".to_string(),
                    bio: Some("new bio".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.bio.as_deref(), Some("new bio"));
        assert!(updated.updated_at >= user.updated_at);
    }

    #[tokio::test]
    async fn test_change_password_verifies_the_current_one() {
        let service = service();
        let user = service.create_account(account("a@b.com", "abc")).await.unwrap();
        let session = session_for(&user);

        let err = service
            .change_password(
                Some(&session),
                ChangePassword {
                    current_password: "Wrong1!".to_string(),
                    new_password: "New123!".to_string(),
                },
            )
            .await
            .unwrap_err();
        match err.downcast_ref::<DomainError>() {
            Some(DomainError::CredentialsRejected { errors, .. }) => {
                assert_eq!(errors["currentPassword"], vec!["Incorrect current password"]);
            }
            other => panic!("expected CredentialsRejected, got {other:?}"),
        }

        service
            .change_password(
                Some(&session),
                ChangePassword {
                    current_password: "Abc123!".to_string(),
                    new_password: "New123!".to_string(),
                },
            )
            .await
            .unwrap();

        // Old password no longer works, the new one does.
        assert!(
            service
                .login(Login {
                    email: "a@b.com".to_string(),
                    password: "Abc123!".to_string(),
                })
                .await
                .is_err()
        );
        assert!(
            service
                .login(Login {
                    email: "a@b.com".to_string(),
                    password: "New123!".to_string(),
                })
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_current_user_with_stale_session_is_none() {
        let service = service();
        let ghost = SessionUser {
            user_id: 999,
            email: "ghost@b.com".to_string(),
            username: "ghost".to_string(),
        };
        assert!(service.current_user(Some(&ghost)).await.unwrap().is_none());
        assert!(service.current_user(None).await.unwrap().is_none());
    }
}
