//! One-time numeric verification codes.
//!
//! A code is six decimal digits drawn uniformly from `100000..=999999`, so
//! every code has the same length and never starts with a zero. A code is
//! live strictly before its expiry instant; at `now == expires_at` it is
//! already expired.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use crate::error::ServiceError;

/// Smallest code that can be issued.
pub const CODE_MIN: u32 = 100_000;
/// Largest code that can be issued.
pub const CODE_MAX: u32 = 999_999;
/// Number of digits in every code.
pub const CODE_LEN: usize = 6;

/// A six-digit verification code.
#[derive(Clone, PartialEq, Eq)]
pub struct VerificationCode(String);

impl VerificationCode {
    /// Draws a fresh code from the thread-local RNG.
    #[must_use]
    pub fn generate() -> Self {
        Self::generate_with(&mut rand::thread_rng())
    }

    /// Draws a fresh code from the given RNG.
    #[must_use]
    pub fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self(rng.gen_range(CODE_MIN..=CODE_MAX).to_string())
    }

    /// Validates a code submitted by a client.
    ///
    /// Only the shape is checked here; whether the code matches anything is
    /// decided by the store.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidOrExpired`] for anything that is not
    /// six ASCII digits, so malformed input is indistinguishable from a
    /// wrong code.
    pub fn parse(raw: &str) -> Result<Self, ServiceError> {
        let trimmed = raw.trim();
        if trimmed.len() == CODE_LEN && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(ServiceError::InvalidOrExpired)
        }
    }

    /// Returns the digits.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// The digits are a secret; keep them out of debug logs.
impl fmt::Debug for VerificationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("VerificationCode(******)")
    }
}

impl fmt::Display for VerificationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A code together with the instant it stops being accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCode {
    /// The code sent to the member.
    pub code: VerificationCode,
    /// First instant at which the code is rejected.
    pub expires_at: DateTime<Utc>,
}

impl IssuedCode {
    /// Generates a new code valid for `ttl` from `now`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Internal`] if `now + ttl` falls outside the
    /// representable time range.
    pub fn issue(now: DateTime<Utc>, ttl: Duration) -> Result<Self, ServiceError> {
        let expires_at = now.checked_add_signed(ttl).ok_or_else(|| {
            ServiceError::Internal(format!("code expiry overflows: now={now}, ttl={ttl}"))
        })?;
        Ok(Self {
            code: VerificationCode::generate(),
            expires_at,
        })
    }

    /// Returns `true` while a code expiring at `expires_at` may still be
    /// consumed at `now`.
    #[must_use]
    pub fn is_live_at(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now < expires_at
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn generated_codes_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10_000 {
            let code = VerificationCode::generate_with(&mut rng);
            assert_eq!(code.as_str().len(), CODE_LEN);
            let Ok(value) = code.as_str().parse::<u32>() else {
                panic!("non-numeric code");
            };
            assert!((CODE_MIN..=CODE_MAX).contains(&value));
        }
    }

    #[test]
    fn parse_accepts_six_digits_only() {
        assert!(VerificationCode::parse(" 123456 ").is_ok());
        for raw in ["", "12345", "1234567", "12a456", "１２３４５６"] {
            assert!(
                matches!(VerificationCode::parse(raw), Err(ServiceError::InvalidOrExpired)),
                "accepted {raw:?}"
            );
        }
    }

    #[test]
    fn debug_hides_digits() {
        let Ok(code) = VerificationCode::parse("424242") else {
            panic!("valid code rejected");
        };
        assert!(!format!("{code:?}").contains("424242"));
    }

    #[test]
    fn expiry_boundary_is_exclusive() {
        let now = Utc::now();
        let Ok(issued) = IssuedCode::issue(now, Duration::minutes(15)) else {
            panic!("issue failed");
        };
        let live = |at| IssuedCode::is_live_at(issued.expires_at, at);
        assert!(live(now));
        assert!(live(issued.expires_at - Duration::milliseconds(1)));
        assert!(!live(issued.expires_at));
        assert!(!live(issued.expires_at + Duration::seconds(1)));
    }

    #[test]
    fn overflowing_expiry_is_an_error() {
        let ttl = Duration::days(365 * 1_000_000);
        assert!(matches!(
            IssuedCode::issue(Utc::now(), ttl),
            Err(ServiceError::Internal(_))
        ));
    }
}
