//! Input validation shared by the search endpoints and their clients.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{AppError, FieldError};

/// Upper bound on username length, in characters.
pub const USERNAME_MAX_LEN: usize = 100;

static USERNAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9_-]{0,98}[A-Za-z0-9])?$")
        .expect("username pattern is a valid regex")
});

/// Check a username and return every rule it breaks.
///
/// An empty input only reports that the field is required.
pub fn username_errors(username: &str) -> Vec<FieldError> {
    let field = "username";
    if username.is_empty() {
        return vec![FieldError::new(field, "Username is required")];
    }

    let mut errors = Vec::new();
    if username.chars().count() > USERNAME_MAX_LEN {
        errors.push(FieldError::new(
            field,
            format!("Username must be at most {USERNAME_MAX_LEN} characters"),
        ));
    }
    if username.trim().is_empty() {
        errors.push(FieldError::new(field, "Username cannot be blank"));
    }
    if username.contains("..") {
        errors.push(FieldError::new(
            field,
            "Username cannot contain consecutive dots",
        ));
    }
    let edge = ['.', '_', '-'];
    if username.starts_with(edge) || username.ends_with(edge) {
        errors.push(FieldError::new(
            field,
            "Username cannot start or end with a dot, underscore, or hyphen",
        ));
    }
    if !USERNAME_PATTERN.is_match(username) {
        errors.push(FieldError::new(
            field,
            "Username may only contain letters, numbers, underscores, and hyphens, \
             and must start and end with a letter or number",
        ));
    }
    errors
}

/// Validate a username, producing the 400 envelope on failure.
pub fn validate_username(username: &str) -> Result<(), AppError> {
    let errors = username_errors(username);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::validation(&errors))
    }
}
