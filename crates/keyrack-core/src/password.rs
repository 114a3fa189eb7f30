// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Password hashing and policy.
//!
//! Uses Argon2id with the crate defaults and a per-password random salt.
//! Verification goes through `argon2`'s constant-time comparison, so a
//! mismatch and a malformed hash are the only observable failure modes.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString};
use argon2::Argon2;

use crate::error::{PasswordError, PasswordResult};

// =============================================================================
// Password Policy
// =============================================================================

/// Minimum accepted password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum accepted password length (argon2 input cap, generous).
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Validates a candidate password against the policy.
pub fn validate_policy(password: &str) -> PasswordResult<()> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(PasswordError::policy(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(PasswordError::policy(format!(
            "password must be at most {} characters",
            MAX_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

// =============================================================================
// PasswordHasher
// =============================================================================

/// Argon2id password hasher.
#[derive(Debug, Clone, Default)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl PasswordHasher {
    /// Creates a hasher with default Argon2id parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hashes a password with a fresh random salt.
    ///
    /// The password is policy-checked first so callers cannot persist hashes
    /// of passwords that would be rejected at login time.
    pub fn hash(&self, password: &str) -> PasswordResult<String> {
        validate_policy(password)?;

        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| PasswordError::hash_failed(e.to_string()))?;

        Ok(hash.to_string())
    }

    /// Verifies a password against a stored hash.
    ///
    /// Returns `PasswordError::VerifyFailed` on mismatch and
    /// `PasswordError::InvalidHash` if the stored hash cannot be parsed.
    pub fn verify(&self, password: &str, stored_hash: &str) -> PasswordResult<()> {
        let parsed = PasswordHash::new(stored_hash).map_err(|_| PasswordError::InvalidHash)?;

        self.argon2
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| PasswordError::VerifyFailed)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hasher = PasswordHasher::new();
        let hash = hasher.hash("correct horse battery").unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(hasher.verify("correct horse battery", &hash).is_ok());
    }

    #[test]
    fn test_wrong_password_rejected() {
        let hasher = PasswordHasher::new();
        let hash = hasher.hash("correct horse battery").unwrap();

        let err = hasher.verify("wrong password!", &hash).unwrap_err();
        assert!(err.is_mismatch());
    }

    #[test]
    fn test_invalid_hash_rejected() {
        let hasher = PasswordHasher::new();
        let err = hasher.verify("whatever1", "not-a-hash").unwrap_err();
        assert!(matches!(err, PasswordError::InvalidHash));
    }

    #[test]
    fn test_policy_minimum_length() {
        let hasher = PasswordHasher::new();
        assert!(hasher.hash("short").is_err());
        assert!(validate_policy("longenough").is_ok());
    }

    #[test]
    fn test_hashes_are_salted() {
        let hasher = PasswordHasher::new();
        let a = hasher.hash("same password").unwrap();
        let b = hasher.hash("same password").unwrap();
        assert_ne!(a, b);
    }
}
