//! Validation Utilities
//!
//! Input validation and normalization for API requests.

use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;
use validator::ValidationError;

/// Validates email address format
pub fn validate_email(email: &str) -> bool {
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    regex.is_match(email.trim())
}

/// Normalizes email address to lowercase and removes whitespace
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validates a display name: non-blank and at most 255 characters
pub fn validate_full_name(name: &str) -> bool {
    let trimmed = name.trim();
    !trimmed.is_empty() && trimmed.chars().count() <= 255
}

/// Validates URL format for profile pictures, thumbnails and videos
pub fn validate_url(url: &str) -> bool {
    if url.is_empty() {
        return true; // Empty URLs are allowed for optional fields
    }

    static URL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = URL_REGEX.get_or_init(|| {
        Regex::new(r"^https?://[^\s/$.?#].[^\s]*$").expect("Failed to compile URL regex")
    });

    regex.is_match(url) && url.len() <= 512
}

/// Validates a category slug (lowercase alphanumerics separated by single hyphens)
pub fn validate_slug(slug: &str) -> bool {
    static SLUG_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = SLUG_REGEX.get_or_init(|| {
        Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").expect("Failed to compile slug regex")
    });

    slug.len() <= 100 && regex.is_match(slug)
}

/// Derives a slug from a display name.
///
/// Lowercases, turns spaces into hyphens, strips everything outside
/// `[a-z0-9-]`, collapses hyphen runs and trims hyphens at both ends.
pub fn generate_slug(name: &str) -> String {
    static INVALID_CHARS: OnceLock<Regex> = OnceLock::new();
    static HYPHEN_RUNS: OnceLock<Regex> = OnceLock::new();

    let invalid = INVALID_CHARS
        .get_or_init(|| Regex::new(r"[^a-z0-9-]").expect("Failed to compile slug regex"));
    let hyphens =
        HYPHEN_RUNS.get_or_init(|| Regex::new(r"-+").expect("Failed to compile hyphen regex"));

    let lowered = name.to_lowercase().replace(' ', "-");
    let stripped = invalid.replace_all(&lowered, "");
    let collapsed = hyphens.replace_all(&stripped, "-");
    collapsed.trim_matches('-').to_string()
}

/// Custom validator for email fields
pub fn email_validator(email: &str) -> Result<(), ValidationError> {
    if validate_email(email) {
        Ok(())
    } else {
        Err(rejected("invalid_email", messages::INVALID_EMAIL))
    }
}

/// Custom validator for display names
pub fn full_name_validator(name: &str) -> Result<(), ValidationError> {
    if validate_full_name(name) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_name"))
    }
}

/// Custom validator for URL fields
pub fn url_validator(url: &str) -> Result<(), ValidationError> {
    if validate_url(url) {
        Ok(())
    } else {
        Err(rejected("invalid_url", messages::INVALID_URL))
    }
}

/// Custom validator for slug fields
pub fn slug_validator(slug: &str) -> Result<(), ValidationError> {
    if validate_slug(slug) {
        Ok(())
    } else {
        Err(rejected("invalid_slug", messages::INVALID_SLUG))
    }
}

fn rejected(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

/// Trims an optional text field; blank input counts as absent
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Flattens validator errors into a single human-readable message
pub fn describe_validation_errors(err: &validator::ValidationErrors) -> String {
    let mut messages = Vec::new();

    for (field, errors) in err.field_errors() {
        for error in errors {
            let message = error
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("invalid value ({})", error.code));
            messages.push(format!("{}: {}", field, message));
        }
    }

    messages.sort();
    messages.join(", ")
}

/// Validation error messages for user-friendly responses
pub mod messages {
    pub const INVALID_EMAIL: &str = "Please enter a valid email address";
    pub const INVALID_URL: &str = "Please enter a valid URL starting with http:// or https://";
    pub const INVALID_SLUG: &str = "Slug may contain lowercase letters, digits and single hyphens";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@example.com"));
        assert!(validate_email("test.user+tag@domain.co.uk"));
        assert!(!validate_email("invalid.email"));
        assert!(!validate_email("@domain.com"));
        assert!(!validate_email("user@"));
        assert!(!validate_email(""));
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  USER@EXAMPLE.COM  "), "user@example.com");
        assert_eq!(normalize_email("Test@Domain.org"), "test@domain.org");
    }

    #[test]
    fn test_validate_full_name() {
        assert!(validate_full_name("Alice"));
        assert!(validate_full_name("Nguyễn Văn A"));
        assert!(!validate_full_name("   "));
        assert!(!validate_full_name(&"a".repeat(256)));
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://example.com"));
        assert!(validate_url("http://example.com/path?query=1"));
        assert!(validate_url(""));
        assert!(!validate_url("ftp://example.com"));
        assert!(!validate_url("not-a-url"));
    }

    #[test]
    fn test_generate_slug() {
        assert_eq!(generate_slug("Smart Contracts 101"), "smart-contracts-101");
        assert_eq!(generate_slug("  DeFi & NFTs!  "), "defi-nfts");
        assert_eq!(generate_slug("a -- b"), "a-b");
        assert_eq!(generate_slug("***"), "");
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  x ".to_string())), Some("x".to_string()));
        assert_eq!(non_blank(Some("   ".to_string())), None);
        assert_eq!(non_blank(None), None);
    }

    #[test]
    fn test_custom_validators_carry_messages() {
        let err = slug_validator("Not A Slug").unwrap_err();
        assert_eq!(err.code, "invalid_slug");
        assert_eq!(err.message.as_deref(), Some(messages::INVALID_SLUG));
        assert!(email_validator("user@example.com").is_ok());
    }

    #[test]
    fn test_validate_slug() {
        assert!(validate_slug("blockchain-basics"));
        assert!(validate_slug("web3"));
        assert!(!validate_slug("Blockchain"));
        assert!(!validate_slug("-leading"));
        assert!(!validate_slug("double--hyphen"));
        assert!(!validate_slug(""));
    }
}
