//! Form schemas. Each `validate_*` function checks one action's raw input
//! and collects every failing field before returning, so the client can
//! render all inline errors at once.

use crate::domain::error::FieldErrors;
use crate::domain::tweet::CreateTweet;
use crate::domain::user::{ChangePassword, CreateAccount, Login, SmsLogin, UpdateProfile};

pub const PASSWORD_MIN_LENGTH: usize = 5;
pub const PASSWORD_SYMBOLS: &str = "!@#$%^&*";
pub const USERNAME_MIN_LENGTH: usize = 3;
pub const TWEET_MAX_LENGTH: usize = 280;
pub const BIO_MAX_LENGTH: usize = 160;

const PASSWORD_RULE_ERROR: &str =
    "Password must contain at least one uppercase letter, one number, and one special character";
const USERNAME_RULE_ERROR: &str =
    "Username must contain only Korean, English, or numbers, no special characters";
const PHONE_RULE_ERROR: &str = "Invalid phone number (e.g., 01012345678)";

fn push(errors: &mut FieldErrors, field: &str, message: &str) {
    errors
        .entry(field.to_string())
        .or_default()
        .push(message.to_string());
}

/// Loose shape check, enough to catch `abc`, `a@`, `@b.com` and `a@b`.
pub fn email_ok(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && domain.contains('.')
        && !email.chars().any(char::is_whitespace)
}

fn hangul_syllable(c: char) -> bool {
    ('가'..='힣').contains(&c)
}

pub fn username_ok(username: &str) -> bool {
    username.chars().count() >= USERNAME_MIN_LENGTH
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || hangul_syllable(c))
}

pub fn password_ok(password: &str) -> bool {
    password.chars().count() >= PASSWORD_MIN_LENGTH
        && password
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || PASSWORD_SYMBOLS.contains(c))
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| PASSWORD_SYMBOLS.contains(c))
}

pub fn phone_ok(phone: &str) -> bool {
    (10..=11).contains(&phone.len()) && phone.chars().all(|c| c.is_ascii_digit())
}

fn check_email(errors: &mut FieldErrors, email: &str) {
    if email.is_empty() {
        push(errors, "email", "Email is required");
    } else if !email_ok(email) {
        push(errors, "email", "Invalid email address");
    }
}

fn check_username(errors: &mut FieldErrors, username: &str) {
    if username.chars().count() < USERNAME_MIN_LENGTH {
        push(errors, "username", "Username must be at least 3 characters");
    }
    if !username.is_empty()
        && !username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || hangul_syllable(c))
    {
        push(errors, "username", USERNAME_RULE_ERROR);
    }
}

fn check_password(errors: &mut FieldErrors, field: &str, password: &str, min_message: &str) {
    if password.chars().count() < PASSWORD_MIN_LENGTH {
        push(errors, field, min_message);
    } else if !password_ok(password) {
        push(errors, field, PASSWORD_RULE_ERROR);
    }
}

pub fn validate_create_account(input: &CreateAccount) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    check_email(&mut errors, &input.email);
    check_password(
        &mut errors,
        "password",
        &input.password,
        "Password must be at least 5 characters",
    );
    check_username(&mut errors, &input.username);
    if let Some(phone) = input.phone.as_deref() {
        if !phone_ok(phone) {
            push(&mut errors, "phone", PHONE_RULE_ERROR);
        }
    }
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

pub fn validate_login(input: &Login) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    check_email(&mut errors, &input.email);
    if input.password.chars().count() < PASSWORD_MIN_LENGTH {
        push(
            &mut errors,
            "password",
            "Password must be at least 5 characters",
        );
    }
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

pub fn validate_sms_login(input: &SmsLogin) -> Result<(), FieldErrors> {
    if phone_ok(&input.phone) {
        Ok(())
    } else {
        Err(crate::domain::error::single_field("phone", PHONE_RULE_ERROR))
    }
}

pub fn validate_create_tweet(input: &CreateTweet) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    let length = input.content.chars().count();
    if length < 1 {
        push(&mut errors, "content", "Tweet content cannot be empty");
    } else if length > TWEET_MAX_LENGTH {
        push(&mut errors, "content", "Tweet cannot exceed 280 characters");
    }
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

pub fn validate_update_profile(input: &UpdateProfile) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    check_email(&mut errors, &input.email);
    check_username(&mut errors, &input.username);
    if let Some(bio) = input.bio.as_deref() {
        if bio.chars().count() > BIO_MAX_LENGTH {
            push(&mut errors, "bio", "Bio cannot exceed 160 characters");
        }
    }
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

pub fn validate_change_password(input: &ChangePassword) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    if input.current_password.chars().count() < PASSWORD_MIN_LENGTH {
        push(
            &mut errors,
            "currentPassword",
            "Current password is required",
        );
    }
    check_password(
        &mut errors,
        "newPassword",
        &input.new_password,
        "New password must be at least 5 characters",
    );
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

pub fn validate_search(query: &str) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    let length = query.chars().count();
    if length < 1 {
        push(&mut errors, "query", "Query is required");
    } else if length > TWEET_MAX_LENGTH {
        push(&mut errors, "query", "Query must be 280 characters or less");
    }
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
