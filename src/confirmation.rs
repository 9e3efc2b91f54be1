//! Signup confirmation codes.
//!
//! A code is issued on every signup attempt and removed from storage on every
//! exchange attempt. This module only decides whether a code that was taken
//! out of storage is acceptable; the removal itself is the repository's job
//! (`Repository::take_confirmation_code`).

use chrono::{DateTime, Duration, Utc};
use rand::{Rng, distributions::Alphanumeric};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::{error::ApiError, models::ConfirmationCode};

pub const CODE_LENGTH: usize = 12;

const BAD_CODE: &str =
    "Invalid confirmation code. Request a new one at /api/v1/auth/signup/.";
const EXPIRED_CODE: &str =
    "Confirmation code has expired. Request a new one at /api/v1/auth/signup/.";

/// Why a supplied code was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeRejection {
    /// No live code: never issued, or already spent by an earlier attempt.
    Missing,
    Expired,
    Mismatch,
}

impl From<CodeRejection> for ApiError {
    fn from(rejection: CodeRejection) -> Self {
        let message = match rejection {
            CodeRejection::Expired => EXPIRED_CODE,
            CodeRejection::Missing | CodeRejection::Mismatch => BAD_CODE,
        };
        ApiError::validation("confirmation_code", message)
    }
}

pub fn generate_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CODE_LENGTH)
        .map(char::from)
        .collect()
}

/// Builds a fresh code for `user_id` valid for `ttl` from now.
pub fn issue(user_id: Uuid, ttl: Duration) -> ConfirmationCode {
    ConfirmationCode {
        user_id,
        code: generate_code(),
        expires_at: Utc::now() + ttl,
    }
}

/// verify
///
/// Checks a code already removed from storage against the one the client
/// supplied. Comparison time does not depend on where the strings differ.
pub fn verify(
    stored: Option<&ConfirmationCode>,
    supplied: &str,
    now: DateTime<Utc>,
) -> Result<(), CodeRejection> {
    let stored = stored.ok_or(CodeRejection::Missing)?;
    if stored.expires_at <= now {
        return Err(CodeRejection::Expired);
    }
    if !constant_time_eq(stored.code.as_bytes(), supplied.as_bytes()) {
        return Err(CodeRejection::Mismatch);
    }
    Ok(())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(value: &str, ttl_minutes: i64) -> ConfirmationCode {
        ConfirmationCode {
            user_id: Uuid::nil(),
            code: value.to_string(),
            expires_at: Utc::now() + Duration::minutes(ttl_minutes),
        }
    }

    #[test]
    fn generated_codes_are_alphanumeric_and_fixed_length() {
        let a = generate_code();
        let b = generate_code();
        assert_eq!(a.len(), CODE_LENGTH);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn issue_sets_expiry_in_the_future() {
        let issued = issue(Uuid::nil(), Duration::minutes(5));
        assert!(issued.expires_at > Utc::now());
    }

    #[test]
    fn matching_live_code_is_accepted() {
        assert_eq!(verify(Some(&code("ABC123", 10)), "ABC123", Utc::now()), Ok(()));
    }

    #[test]
    fn mismatch_is_rejected() {
        assert_eq!(
            verify(Some(&code("ABC123", 10)), "ABC124", Utc::now()),
            Err(CodeRejection::Mismatch)
        );
        assert_eq!(
            verify(Some(&code("ABC123", 10)), "ABC12", Utc::now()),
            Err(CodeRejection::Mismatch)
        );
    }

    #[test]
    fn spent_code_is_missing() {
        assert_eq!(verify(None, "ABC123", Utc::now()), Err(CodeRejection::Missing));
    }

    #[test]
    fn expired_code_is_rejected_even_if_it_matches() {
        assert_eq!(
            verify(Some(&code("ABC123", -1)), "ABC123", Utc::now()),
            Err(CodeRejection::Expired)
        );
    }

    #[test]
    fn rejections_map_to_field_validation_errors() {
        match ApiError::from(CodeRejection::Mismatch) {
            ApiError::Validation { field, .. } => assert_eq!(field, "confirmation_code"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
