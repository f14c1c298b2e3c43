//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest nickname accepted at registration.
pub const MAX_NICKNAME_CHARS: usize = 30;
/// Longest group title accepted at creation.
pub const MAX_TITLE_CHARS: usize = 60;

fn bounded_text(
    value: &str,
    max_chars: usize,
    code: &'static str,
    label: &str,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new(code);
        err.message = Some(format!("{label} must not be blank").into());
        return Err(err);
    }

    let length = value.chars().count();
    if length > max_chars {
        let mut err = ValidationError::new(code);
        err.message =
            Some(format!("{label} must be at most {max_chars} characters (got {length})").into());
        return Err(err);
    }

    Ok(())
}

/// Validates that a nickname is non-blank and at most [`MAX_NICKNAME_CHARS`] characters.
pub fn validate_nickname(nickname: &str) -> Result<(), ValidationError> {
    bounded_text(nickname, MAX_NICKNAME_CHARS, "nickname", "Nickname")
}

/// Validates that a group title is non-blank and at most [`MAX_TITLE_CHARS`] characters.
pub fn validate_title(title: &str) -> Result<(), ValidationError> {
    bounded_text(title, MAX_TITLE_CHARS, "title", "Title")
}
