//! Input validation for API requests.
//!
//! For collecting multiple validation errors and returning them as an ApiError,
//! use the `ValidationErrorBuilder` from the `error` module.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Login names: latin letters, digits, `.`, `_`, `-`, 3-150 chars
    static ref USERNAME_REGEX: Regex = Regex::new(r"^[A-Za-z0-9._-]{3,150}$").unwrap();

    /// Phone numbers with optional leading `+`, spaces, dashes and parentheses
    static ref PHONE_REGEX: Regex = Regex::new(r"^\+?[0-9][0-9 ()-]{4,24}$").unwrap();

    /// Deliberately loose e-mail shape check
    static ref EMAIL_REGEX: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

/// Maximum length of free-text fields (descriptions, chat messages)
pub const MAX_TEXT_LEN: usize = 2000;

pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username is required".to_string());
    }
    if !USERNAME_REGEX.is_match(username) {
        return Err(
            "Username must be 3-150 characters: letters, digits, '.', '_' or '-'".to_string(),
        );
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < 6 {
        return Err("Password must be at least 6 characters".to_string());
    }
    Ok(())
}

/// Validate an optional phone number (empty is allowed)
pub fn validate_phone(phone: &str) -> Result<(), String> {
    if phone.is_empty() || PHONE_REGEX.is_match(phone) {
        Ok(())
    } else {
        Err("Invalid phone number".to_string())
    }
}

/// Validate an optional e-mail address (empty is allowed)
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() || EMAIL_REGEX.is_match(email) {
        Ok(())
    } else {
        Err("Invalid email address".to_string())
    }
}

pub fn validate_required(value: &str, label: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{} is required", label))
    } else {
        Ok(())
    }
}

pub fn validate_text_len(value: &str, label: &str) -> Result<(), String> {
    if value.chars().count() > MAX_TEXT_LEN {
        Err(format!("{} must be {} characters or less", label, MAX_TEXT_LEN))
    } else {
        Ok(())
    }
}
