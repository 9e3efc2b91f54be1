//! Field-level validators.
//!
//! Every function here is pure apart from `validate_year`, which reads the
//! clock. Each returns the accepted value unchanged so it can be chained into
//! payload construction.

use chrono::{Datelike, Utc};
use lettre::Address;
use regex::Regex;
use std::sync::LazyLock;

pub const RESERVED_USERNAME: &str = "me";
pub const USERNAME_MAX_LENGTH: usize = 150;
pub const EMAIL_MAX_LENGTH: usize = 254;
pub const NAME_MAX_LENGTH: usize = 256;
pub const SLUG_MAX_LENGTH: usize = 50;
pub const PROFILE_FIELD_MAX_LENGTH: usize = 150;
pub const MIN_SCORE: i16 = 1;
pub const MAX_SCORE: i16 = 10;

static USERNAME_FORBIDDEN_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w.@+-]").expect("static username pattern"));

static SLUG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("static slug pattern"));

/// A rejected field value, tagged with the wire field it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// validate_username
///
/// Rejects the reserved `me` (it collides with the `/users/me` route) and any
/// character outside `[\w.@+-]`. The error lists each offending character
/// once, in order of first appearance.
pub fn validate_username(name: &str) -> Result<&str, ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::new("username", "This field may not be blank."));
    }
    if name == RESERVED_USERNAME {
        return Err(ValidationError::new(
            "username",
            format!("Username '{RESERVED_USERNAME}' is reserved."),
        ));
    }
    if name.chars().count() > USERNAME_MAX_LENGTH {
        return Err(ValidationError::new(
            "username",
            format!("Ensure this field has no more than {USERNAME_MAX_LENGTH} characters."),
        ));
    }

    let mut offending: Vec<String> = Vec::new();
    for m in USERNAME_FORBIDDEN_CHARS.find_iter(name) {
        let quoted = format!("'{}'", m.as_str());
        if !offending.contains(&quoted) {
            offending.push(quoted);
        }
    }
    if !offending.is_empty() {
        return Err(ValidationError::new(
            "username",
            format!(
                "Username contains forbidden characters: {}",
                offending.join(", ")
            ),
        ));
    }

    Ok(name)
}

/// validate_year
///
/// A title cannot come from the future. The bound is the calendar year at
/// the moment of validation.
pub fn validate_year(value: i32) -> Result<i32, ValidationError> {
    check_year(value, Utc::now().year())
}

fn check_year(value: i32, current_year: i32) -> Result<i32, ValidationError> {
    if value > current_year {
        return Err(ValidationError::new(
            "year",
            format!("Invalid year {value}: it cannot be later than the current year {current_year}."),
        ));
    }
    Ok(value)
}

pub fn validate_slug(value: &str) -> Result<&str, ValidationError> {
    if value.len() > SLUG_MAX_LENGTH {
        return Err(ValidationError::new(
            "slug",
            format!("Ensure this field has no more than {SLUG_MAX_LENGTH} characters."),
        ));
    }
    if !SLUG_PATTERN.is_match(value) {
        return Err(ValidationError::new(
            "slug",
            "Slug may only contain latin letters, digits, hyphens and underscores.",
        ));
    }
    Ok(value)
}

pub fn validate_score(value: i16) -> Result<i16, ValidationError> {
    if !(MIN_SCORE..=MAX_SCORE).contains(&value) {
        return Err(ValidationError::new(
            "score",
            format!("Score must be between {MIN_SCORE} and {MAX_SCORE}."),
        ));
    }
    Ok(value)
}

/// validate_email
///
/// Parsed with the same address grammar the SMTP mailer uses, so an address
/// accepted here can always be handed to the transport.
pub fn validate_email(value: &str) -> Result<&str, ValidationError> {
    let invalid = || ValidationError::new("email", "Enter a valid email address.");

    if value.len() > EMAIL_MAX_LENGTH {
        return Err(invalid());
    }
    let address = value.parse::<Address>().map_err(|_| invalid())?;
    let domain = address.domain();
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(invalid());
    }
    Ok(value)
}

/// Required text with an upper bound, e.g. title and category names.
pub fn validate_required<'a>(
    field: &'static str,
    value: &'a str,
    max: usize,
) -> Result<&'a str, ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "This field may not be blank."));
    }
    validate_max_length(field, value, max)
}

pub fn validate_max_length<'a>(
    field: &'static str,
    value: &'a str,
    max: usize,
) -> Result<&'a str, ValidationError> {
    if value.chars().count() > max {
        return Err(ValidationError::new(
            field,
            format!("Ensure this field has no more than {max} characters."),
        ));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_accepts_allowed_charset() {
        for name in ["alice", "bob.smith", "x@y", "a+b", "dash-ed", "under_score", "Юзер"] {
            assert_eq!(validate_username(name), Ok(name));
        }
    }

    #[test]
    fn username_rejects_reserved_me() {
        let err = validate_username("me").unwrap_err();
        assert_eq!(err.field, "username");
        assert!(err.message.contains("reserved"));
    }

    #[test]
    fn username_is_case_sensitive_about_reserved_name() {
        assert!(validate_username("Me").is_ok());
    }

    #[test]
    fn username_error_enumerates_offending_characters_once() {
        let err = validate_username("bad name!!#").unwrap_err();
        assert_eq!(
            err.message,
            "Username contains forbidden characters: ' ', '!', '#'"
        );
    }

    #[test]
    fn username_rejects_blank_and_overlong() {
        assert!(validate_username("").is_err());
        assert!(validate_username(&"a".repeat(USERNAME_MAX_LENGTH + 1)).is_err());
        assert!(validate_username(&"a".repeat(USERNAME_MAX_LENGTH)).is_ok());
    }

    #[test]
    fn year_bound_is_inclusive_of_current_year() {
        assert_eq!(check_year(2024, 2024), Ok(2024));
        assert_eq!(check_year(-500, 2024), Ok(-500));
        assert!(check_year(2025, 2024).is_err());
    }

    #[test]
    fn year_uses_the_clock() {
        let now = Utc::now().year();
        assert_eq!(validate_year(now), Ok(now));
        let err = validate_year(now + 1).unwrap_err();
        assert_eq!(err.field, "year");
    }

    #[test]
    fn slug_charset() {
        assert!(validate_slug("sci-fi_2").is_ok());
        assert!(validate_slug("sci fi").is_err());
        assert!(validate_slug("фантастика").is_err());
        assert!(validate_slug("").is_err());
        assert!(validate_slug(&"s".repeat(SLUG_MAX_LENGTH + 1)).is_err());
    }

    #[test]
    fn score_range_is_one_to_ten() {
        assert!(validate_score(0).is_err());
        assert!(validate_score(1).is_ok());
        assert!(validate_score(10).is_ok());
        assert!(validate_score(11).is_err());
    }

    #[test]
    fn email_shape() {
        assert!(validate_email("a@x.com").is_ok());
        assert!(validate_email("a@x").is_err());
        assert!(validate_email("@x.com").is_err());
        assert!(validate_email("a@@x.com").is_err());
        assert!(validate_email("a b@x.com").is_err());
        assert!(validate_email("a@x.com.").is_err());
    }

    #[test]
    fn email_rejects_what_the_mail_transport_rejects() {
        for value in ["<a@x.com>", "a,b@x.com", "a(b)@x.com"] {
            assert!(value.parse::<Address>().is_err(), "{value}");
            assert!(validate_email(value).is_err(), "{value}");
        }
        assert!(validate_email(&format!("{}@x.com", "a".repeat(EMAIL_MAX_LENGTH))).is_err());
    }

    #[test]
    fn validation_error_displays_field_and_message() {
        let err = ValidationError::new("slug", "bad");
        assert_eq!(err.to_string(), "slug: bad");
    }

    #[test]
    fn required_rejects_whitespace_only() {
        assert!(validate_required("name", "   ", 10).is_err());
        assert!(validate_required("name", "Dune", 10).is_ok());
        assert!(validate_required("name", "Dune Messiah", 4).is_err());
    }
}
