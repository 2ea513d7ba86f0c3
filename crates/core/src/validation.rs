//! Input validation helpers shared by the authorities and handlers.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\w\-.]+@([\w-]+\.)+[\w-]{2,4}$").expect("email pattern is valid")
});

/// Trim and validate an email address, returning the normalized form.
pub fn normalize_email(raw: &str) -> Result<String, CoreError> {
    let email = raw.trim();
    if email.is_empty() {
        return Err(CoreError::Validation("Email address is required".into()));
    }
    if !EMAIL_RE.is_match(email) {
        return Err(CoreError::Validation("Invalid email address".into()));
    }
    Ok(email.to_string())
}

/// Reject blank values for a named field.
pub fn require_non_blank(field: &str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::Validation(format!("{field} is required")));
    }
    Ok(())
}

/// Check that a password and its confirmation are present and identical.
pub fn check_password_confirmation(password: &str, confirmation: &str) -> Result<(), CoreError> {
    if password.is_empty() {
        return Err(CoreError::Validation("Password is required".into()));
    }
    if confirmation.is_empty() {
        return Err(CoreError::Validation("Repeat the password".into()));
    }
    if password != confirmation {
        return Err(CoreError::Validation("The passwords don't match".into()));
    }
    Ok(())
}
