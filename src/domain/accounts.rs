//! Account field rules applied at sign-up.

use crate::domain::error::DomainError;

pub const USERNAME_MAX_CHARS: usize = 150;
pub const PASSWORD_MIN_CHARS: usize = 8;

/// Usernames are letters, digits and `@.+-_`.
pub fn validate_username(raw: &str) -> Result<String, DomainError> {
    let username = raw.trim();
    if username.is_empty() {
        return Err(DomainError::validation("username is required"));
    }
    if username.chars().count() > USERNAME_MAX_CHARS {
        return Err(DomainError::validation(format!(
            "username must be at most {USERNAME_MAX_CHARS} characters"
        )));
    }
    if !username
        .chars()
        .all(|ch| ch.is_alphanumeric() || matches!(ch, '@' | '.' | '+' | '-' | '_'))
    {
        return Err(DomainError::validation(
            "username may contain only letters, digits and @/./+/-/_",
        ));
    }
    Ok(username.to_string())
}

pub fn validate_email(raw: &str) -> Result<String, DomainError> {
    let email = raw.trim();
    if email.is_empty() {
        return Ok(String::new());
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
            Ok(email.to_string())
        }
        _ => Err(DomainError::validation("enter a valid email address")),
    }
}

pub fn validate_password(password: &str, confirmation: &str) -> Result<(), DomainError> {
    if password != confirmation {
        return Err(DomainError::validation("the two password fields didn't match"));
    }
    if password.chars().count() < PASSWORD_MIN_CHARS {
        return Err(DomainError::validation(format!(
            "password must contain at least {PASSWORD_MIN_CHARS} characters"
        )));
    }
    if password.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(DomainError::validation("password can't be entirely numeric"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_charset_is_enforced() {
        assert_eq!(validate_username(" leo.t+1 ").expect("valid"), "leo.t+1");
        assert!(validate_username("with space").is_err());
        assert!(validate_username("").is_err());
        assert!(validate_username(&"a".repeat(151)).is_err());
    }

    #[test]
    fn email_is_optional() {
        assert_eq!(validate_email("").expect("valid"), "");
        assert!(validate_email("nobody").is_err());
        assert!(validate_email("a@b").is_ok());
    }

    #[test]
    fn password_rules() {
        assert!(validate_password("secret-pass", "secret-pass").is_ok());
        assert!(validate_password("secret-pass", "other-pass").is_err());
        assert!(validate_password("short", "short").is_err());
        assert!(validate_password("12345678", "12345678").is_err());
    }
}
