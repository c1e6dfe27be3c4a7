use regex::Regex;
use std::sync::OnceLock;

use crate::error::AccessError;

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid regex"))
}

pub fn validate_email(email: &str) -> Result<&str, AccessError> {
    let trimmed = email.trim();
    if trimmed.is_empty() {
        return Err(AccessError::validation("Email is required"));
    }
    if !email_regex().is_match(trimmed) {
        return Err(AccessError::validation(format!(
            "Invalid email address: {trimmed}"
        )));
    }
    Ok(trimmed)
}

/// Checks length plus upper, lower and digit classes. All problems are
/// reported together.
pub fn validate_password(password: &str, min_length: usize) -> Result<(), AccessError> {
    let mut problems = Vec::new();

    if password.chars().count() < min_length {
        problems.push(format!(
            "Password must be at least {min_length} characters long"
        ));
    }
    if !password.chars().any(char::is_uppercase) {
        problems.push("Password must contain at least one uppercase letter".to_string());
    }
    if !password.chars().any(char::is_lowercase) {
        problems.push("Password must contain at least one lowercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        problems.push("Password must contain at least one number".to_string());
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(AccessError::Validation(problems.join("; ")))
    }
}

pub fn validate_display_name(name: &str) -> Result<&str, AccessError> {
    let trimmed = name.trim();
    if trimmed.chars().count() > 100 {
        return Err(AccessError::validation(
            "Display name must be 100 characters or less",
        ));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(AccessError::validation(
            "Display name cannot contain control characters",
        ));
    }
    Ok(trimmed)
}

pub fn validate_classroom_name(name: &str) -> Result<&str, AccessError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AccessError::validation("Classroom name cannot be empty"));
    }
    if trimmed.chars().count() > 80 {
        return Err(AccessError::validation(
            "Classroom name must be 80 characters or less",
        ));
    }
    Ok(trimmed)
}

pub fn validate_task_title(title: &str) -> Result<&str, AccessError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(AccessError::validation("Task title cannot be empty"));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert_eq!(validate_email("  kid@school.test ").unwrap(), "kid@school.test");
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("two@@school.test").is_err());
        assert!(validate_email("missing@tld").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("Reading123", 8).is_ok());
        assert!(validate_password("short1A", 8).is_err());
        assert!(validate_password("alllowercase1", 8).is_err());
        assert!(validate_password("ALLUPPERCASE1", 8).is_err());
        assert!(validate_password("NoDigitsHere", 8).is_err());
    }

    #[test]
    fn password_problems_are_reported_together() {
        let err = validate_password("abc", 8).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("at least 8 characters"));
        assert!(msg.contains("uppercase"));
        assert!(msg.contains("number"));
    }

    #[test]
    fn test_validate_display_name() {
        assert_eq!(validate_display_name("  Capy Buddy ").unwrap(), "Capy Buddy");
        assert!(validate_display_name("").is_ok());
        assert!(validate_display_name(&"a".repeat(101)).is_err());
        assert!(validate_display_name("bad\u{7}name").is_err());
    }

    #[test]
    fn test_validate_classroom_name() {
        assert!(validate_classroom_name("Grade 1 - Sunflowers").is_ok());
        assert!(validate_classroom_name("   ").is_err());
        assert!(validate_classroom_name(&"x".repeat(81)).is_err());
    }
}
