//! Opaque one-way credential digests.
//!
//! Stored form is `<salt-hex>$<sha256-hex>` where the digest covers
//! `salt || secret`. Comparison is constant-time.

use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::ServiceError;

const SALT_LEN: usize = 16;
const MIN_SECRET_LEN: usize = 8;

/// A salted digest of a member's secret, safe to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialHash(String);

impl CredentialHash {
    /// Digests a new secret with a random salt.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidRequest`] if the secret is shorter
    /// than eight characters.
    pub fn derive(secret: &str) -> Result<Self, ServiceError> {
        if secret.chars().count() < MIN_SECRET_LEN {
            return Err(ServiceError::InvalidRequest(format!(
                "credential must be at least {MIN_SECRET_LEN} characters"
            )));
        }
        let mut salt = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        let digest = digest(&salt, secret);
        Ok(Self(format!("{}${}", hex::encode(salt), hex::encode(digest))))
    }

    /// Wraps a previously stored digest string.
    #[must_use]
    pub fn from_stored(stored: String) -> Self {
        Self(stored)
    }

    /// Returns `true` if `secret` produces this digest.
    ///
    /// A malformed stored value never verifies.
    #[must_use]
    pub fn verify(&self, secret: &str) -> bool {
        let Some((salt_hex, digest_hex)) = self.0.split_once('$') else {
            return false;
        };
        let (Ok(salt), Ok(expected)) = (hex::decode(salt_hex), hex::decode(digest_hex)) else {
            return false;
        };
        let actual = digest(&salt, secret);
        actual.as_slice().ct_eq(expected.as_slice()).into()
    }

    /// Returns the stored representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn digest(salt: &[u8], secret: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(secret.as_bytes());
    hasher.finalize().into()
}
