// Display name and chat text canonicalization: trimming and emptiness checks.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UsernameError {
    #[error("Username is required")]
    Empty,
}

/// Normalize a requested display name for binding and uniqueness checking.
///
/// Rules:
/// - Strip leading and trailing whitespace
/// - Reject names that are empty after trimming
///
/// The trimmed name is the identity, byte for byte: `Alice` and `alice` are
/// different names, and so are composed and decomposed spellings of `René`.
pub fn normalize_username(input: &str) -> Result<String, UsernameError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UsernameError::Empty);
    }

    Ok(trimmed.to_owned())
}

/// Trim chat text. Returns `None` when nothing is left to say.
pub fn normalize_chat_text(input: &str) -> Option<&str> {
    let trimmed = input.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_name() {
        assert_eq!(normalize_username("alice").unwrap(), "alice");
    }

    #[test]
    fn test_surrounding_whitespace_is_trimmed() {
        assert_eq!(normalize_username("  bob \t\n").unwrap(), "bob");
    }

    #[test]
    fn test_inner_whitespace_is_kept() {
        assert_eq!(normalize_username(" Mary Ann ").unwrap(), "Mary Ann");
    }

    #[test]
    fn test_reject_empty() {
        assert_eq!(normalize_username(""), Err(UsernameError::Empty));
    }

    #[test]
    fn test_reject_whitespace_only() {
        assert_eq!(normalize_username("   "), Err(UsernameError::Empty));
        assert_eq!(normalize_username("\t\r\n"), Err(UsernameError::Empty));
    }

    #[test]
    fn test_unicode_spelling_is_preserved() {
        let decomposed = normalize_username(" Ren\u{0065}\u{0301} ").unwrap();
        let composed = normalize_username("Ren\u{00e9}").unwrap();
        assert_eq!(decomposed, "Ren\u{0065}\u{0301}");
        assert_ne!(decomposed, composed);
    }

    #[test]
    fn test_case_is_preserved() {
        assert_ne!(normalize_username("Alice").unwrap(), normalize_username("alice").unwrap());
    }

    #[test]
    fn test_error_text() {
        assert_eq!(UsernameError::Empty.to_string(), "Username is required");
    }

    #[test]
    fn test_chat_text_trimmed() {
        assert_eq!(normalize_chat_text("  hello  "), Some("hello"));
        assert_eq!(normalize_chat_text("a  b"), Some("a  b"));
    }

    #[test]
    fn test_chat_text_empty() {
        assert_eq!(normalize_chat_text(""), None);
        assert_eq!(normalize_chat_text("   "), None);
    }
}
