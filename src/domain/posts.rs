//! Post and comment text rules shared by every write path.

use crate::domain::error::DomainError;

/// Number of characters shown when a post or comment is displayed inline.
pub const PREVIEW_CHARS: usize = 15;

/// Longest accepted group title.
pub const GROUP_TITLE_MAX_CHARS: usize = 200;

/// Leading characters of `text`, cut on a character boundary.
pub fn preview(text: &str) -> &str {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

/// Validates post or comment body text.
pub fn validate_text(text: &str) -> Result<String, DomainError> {
    if text.trim().is_empty() {
        return Err(DomainError::validation("text must not be blank"));
    }
    Ok(text.replace("\r\n", "\n"))
}

pub fn validate_group_title(title: &str) -> Result<String, DomainError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("group title must not be blank"));
    }
    if trimmed.chars().count() > GROUP_TITLE_MAX_CHARS {
        return Err(DomainError::validation(format!(
            "group title must be at most {GROUP_TITLE_MAX_CHARS} characters"
        )));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_cuts_after_fifteen_characters() {
        assert_eq!(preview("Тестовый пост про котиков"), "Тестовый пост п");
        assert_eq!(preview("short"), "short");
    }

    #[test]
    fn blank_text_is_rejected() {
        assert!(validate_text("   \n").is_err());
        assert_eq!(validate_text("a\r\nb").expect("valid"), "a\nb");
    }

    #[test]
    fn group_title_is_bounded() {
        assert!(validate_group_title(&"x".repeat(201)).is_err());
        assert_eq!(validate_group_title("  Cats ").expect("valid"), "Cats");
    }
}
