//! Password hashing.
//!
//! New hashes are salted Argon2 PHC strings. Unsalted SHA-256 hex digests
//! written by earlier versions are still accepted so their owners can log
//! in once and get upgraded.

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};

use crate::error::{Result, TpeError};

/// Length of a hex-encoded SHA-256 digest.
const LEGACY_HEX_LEN: usize = 64;

/// Outcome of checking a password against a stored hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Verdict {
    /// Matches an Argon2 hash.
    Match,
    /// Matches a legacy digest; the caller should re-hash.
    LegacyMatch,
    /// Does not match.
    Mismatch,
}

impl Verdict {
    /// Returns `true` for either kind of match.
    pub(crate) const fn is_match(self) -> bool {
        !matches!(self, Self::Mismatch)
    }
}

/// Hashes a password with Argon2 and a fresh random salt.
pub(crate) fn hash(password: &SecretString) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.expose_secret().as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| TpeError::PasswordHash(err.to_string()))
}

/// Checks a password against a stored Argon2 or legacy hash.
pub(crate) fn verify(password: &SecretString, stored: &str) -> Verdict {
    if is_legacy(stored) {
        return if legacy_digest(password.expose_secret()).eq_ignore_ascii_case(stored) {
            Verdict::LegacyMatch
        } else {
            Verdict::Mismatch
        };
    }
    let Ok(parsed) = PasswordHash::new(stored) else {
        tracing::warn!("stored password hash is not a valid PHC string");
        return Verdict::Mismatch;
    };
    if Argon2::default()
        .verify_password(password.expose_secret().as_bytes(), &parsed)
        .is_ok()
    {
        Verdict::Match
    } else {
        Verdict::Mismatch
    }
}

/// Returns `true` if `stored` looks like an unsalted SHA-256 hex digest.
fn is_legacy(stored: &str) -> bool {
    stored.len() == LEGACY_HEX_LEN && stored.bytes().all(|byte| byte.is_ascii_hexdigit())
}

/// Unsalted SHA-256 hex digest, as earlier versions stored it.
pub(crate) fn legacy_digest(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}
