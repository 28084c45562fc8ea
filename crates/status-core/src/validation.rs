//! Request validation rules
//!
//! Errors are collected per field in the same shape the API returns them:
//! `{"field": ["message", ...], "non_field_errors": ["message", ...]}`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Key under which errors not tied to a single field are reported
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Maximum username length
pub const USERNAME_MAX_LENGTH: usize = 150;

/// Status validation message
pub const CONTENT_OR_IMAGE_REQUIRED: &str = "Content or image is required.";

/// Registration validation message
pub const PASSWORDS_MUST_MATCH: &str = "Passwords must match";

/// Field-keyed validation messages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single error on a named field
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Single error not attached to a field
    pub fn non_field(message: impl Into<String>) -> Self {
        Self::field(NON_FIELD_ERRORS, message)
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn merge(&mut self, other: ValidationErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages recorded for a field (empty if none)
    pub fn messages(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// `Ok(())` when nothing was recorded
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, messages)| format!("{field}: {}", messages.join(" ")))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Check the username character set
///
/// Letters, digits and `@ . + - _` only, at most 150 characters.
pub fn validate_username_format(username: &str) -> Result<(), String> {
    if username.chars().count() > USERNAME_MAX_LENGTH {
        return Err(format!(
            "Ensure this field has no more than {USERNAME_MAX_LENGTH} characters."
        ));
    }

    let valid = username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'));
    if !valid {
        return Err(
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
                .to_string(),
        );
    }

    Ok(())
}

/// Password and confirmation must be identical
pub fn check_passwords_match(password: &str, password2: &str) -> Result<(), ValidationErrors> {
    if password != password2 {
        return Err(ValidationErrors::non_field(PASSWORDS_MUST_MATCH));
    }
    Ok(())
}

/// Content and image of a status submission, after validation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub content: Option<String>,
    pub image: Option<String>,
}

/// Trim surrounding whitespace; blank values become absent
fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Require either text content or an image
///
/// Both values are trimmed first, and whitespace-only values count as
/// absent, both for the check and in the returned entry.
pub fn validate_status_entry(entry: StatusEntry) -> Result<StatusEntry, ValidationErrors> {
    let entry = StatusEntry {
        content: normalize(entry.content),
        image: normalize(entry.image),
    };
    if entry.content.is_none() && entry.image.is_none() {
        return Err(ValidationErrors::non_field(CONTENT_OR_IMAGE_REQUIRED));
    }
    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_errors_collect_per_field() {
        let mut errors = ValidationErrors::new();
        errors.add("email", "Enter a valid email address.");
        errors.add("email", "User with this email already exists");
        errors.add("username", "This field is required.");

        assert_eq!(errors.messages("email").len(), 2);
        assert_eq!(errors.messages("username"), ["This field is required."]);
        assert!(errors.messages("password").is_empty());

        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json["email"][1], "User with this email already exists");
    }

    #[test]
    fn test_merge_and_into_result() {
        assert!(ValidationErrors::new().into_result().is_ok());

        let mut errors = ValidationErrors::field("username", "taken");
        errors.merge(ValidationErrors::non_field(PASSWORDS_MUST_MATCH));
        assert!(errors.has_field("username"));
        assert!(errors.has_field(NON_FIELD_ERRORS));
        assert!(errors.into_result().is_err());
    }

    #[test]
    fn test_passwords_must_match() {
        assert!(check_passwords_match("secret", "secret").is_ok());

        let err = check_passwords_match("a", "b").unwrap_err();
        assert_eq!(err.messages(NON_FIELD_ERRORS), [PASSWORDS_MUST_MATCH]);
    }

    #[test]
    fn test_username_format() {
        assert!(validate_username_format("alice").is_ok());
        assert!(validate_username_format("a.l+i-c_e@home").is_ok());
        assert!(validate_username_format("alice smith").is_err());
        assert!(validate_username_format("alice!").is_err());
        assert!(validate_username_format(&"a".repeat(150)).is_ok());
        assert!(validate_username_format(&"a".repeat(151)).is_err());
    }

    #[test]
    fn test_status_requires_content_or_image() {
        let empty = StatusEntry {
            content: Some(String::new()),
            image: None,
        };
        let err = validate_status_entry(empty).unwrap_err();
        assert_eq!(err.messages(NON_FIELD_ERRORS), [CONTENT_OR_IMAGE_REQUIRED]);

        assert!(validate_status_entry(StatusEntry::default()).is_err());
    }

    #[test]
    fn test_status_whitespace_content_is_blank() {
        let entry = StatusEntry {
            content: Some("   \n\t".to_string()),
            image: Some("  ".to_string()),
        };
        let err = validate_status_entry(entry).unwrap_err();
        assert_eq!(err.messages(NON_FIELD_ERRORS), [CONTENT_OR_IMAGE_REQUIRED]);
    }

    #[test]
    fn test_status_values_are_trimmed() {
        let entry = StatusEntry {
            content: Some("  hello  ".to_string()),
            image: Some(String::new()),
        };
        let valid = validate_status_entry(entry).unwrap();
        assert_eq!(valid.content.as_deref(), Some("hello"));
        assert_eq!(valid.image, None);
    }

    #[test]
    fn test_status_image_only() {
        let entry = StatusEntry {
            content: Some(String::new()),
            image: Some("status/alice/cat.jpg".to_string()),
        };
        let valid = validate_status_entry(entry).unwrap();
        assert_eq!(valid.content, None);
        assert_eq!(valid.image.as_deref(), Some("status/alice/cat.jpg"));
    }

    proptest! {
        #[test]
        fn prop_non_blank_content_always_passes(content in " *[a-z0-9]+ *") {
            let entry = StatusEntry { content: Some(content), image: None };
            prop_assert!(validate_status_entry(entry).is_ok());
        }

        #[test]
        fn prop_mismatched_passwords_always_fail(a in "[a-z]{1,16}", b in "[A-Z]{1,16}") {
            prop_assert!(check_passwords_match(&a, &b).is_err());
        }
    }
}
