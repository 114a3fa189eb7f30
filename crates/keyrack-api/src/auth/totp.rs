// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! TOTP two-factor enrollment and verification.
//!
//! Enrollment is a two-step flow: `enroll` mints a secret and provisioning
//! URI, and the enrollment stays pending until the first valid code confirms
//! it. Verification tolerates one 30-second step of clock skew and locks the
//! enrollment after too many consecutive failures.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use totp_rs::{Algorithm, Secret, TOTP};

use crate::error::{ApiError, ApiResult};

// =============================================================================
// TotpConfig
// =============================================================================

/// TOTP configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TotpConfig {
    /// Issuer shown in authenticator apps.
    pub issuer: String,
    /// Consecutive failures before the enrollment locks.
    pub max_attempts: u32,
}

impl Default for TotpConfig {
    fn default() -> Self {
        Self {
            issuer: "keyrack".to_string(),
            max_attempts: 5,
        }
    }
}

// =============================================================================
// TotpEnrollment
// =============================================================================

/// A stored TOTP enrollment.
#[derive(Debug, Clone)]
pub struct TotpEnrollment {
    /// The owning user.
    pub user_id: String,
    /// Raw shared secret.
    secret: Vec<u8>,
    /// Account label embedded in the provisioning URI.
    pub account_name: String,
    /// `true` once the first valid code confirmed the enrollment.
    pub activated: bool,
    /// Consecutive failed verification attempts.
    pub failed_attempts: u32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Result of starting an enrollment.
#[derive(Debug, Clone, Serialize)]
pub struct TotpProvisioning {
    /// Base32-encoded shared secret for manual entry.
    pub secret: String,
    /// `otpauth://` URI for QR provisioning.
    pub otpauth_url: String,
}

// =============================================================================
// TotpManager
// =============================================================================

/// In-memory TOTP enrollment store and verifier.
#[derive(Debug, Clone)]
pub struct TotpManager {
    enrollments: Arc<DashMap<String, TotpEnrollment>>,
    config: TotpConfig,
}

impl TotpManager {
    /// Creates a new manager with the given configuration.
    pub fn new(config: TotpConfig) -> Self {
        Self {
            enrollments: Arc::new(DashMap::new()),
            config,
        }
    }

    /// Starts an enrollment for a user.
    ///
    /// A pending enrollment is replaced; an activated one returns 409 so a
    /// confirmed factor cannot be silently swapped out.
    pub fn enroll(
        &self,
        user_id: impl Into<String>,
        account_name: impl Into<String>,
    ) -> ApiResult<TotpProvisioning> {
        let user_id = user_id.into();
        let account_name = account_name.into();

        if let Some(existing) = self.enrollments.get(&user_id) {
            if existing.activated {
                return Err(ApiError::conflict("TOTP is already active for this user"));
            }
        }

        let secret = Secret::generate_secret();
        let secret_bytes = secret
            .to_bytes()
            .map_err(|e| ApiError::internal(format!("Failed to generate TOTP secret: {:?}", e)))?;

        let totp = self.totp_for(&secret_bytes, &account_name)?;
        let provisioning = TotpProvisioning {
            secret: secret.to_encoded().to_string(),
            otpauth_url: totp.get_url(),
        };

        self.enrollments.insert(
            user_id.clone(),
            TotpEnrollment {
                user_id,
                secret: secret_bytes,
                account_name,
                activated: false,
                failed_attempts: 0,
                created_at: Utc::now(),
            },
        );

        Ok(provisioning)
    }

    /// Confirms a pending enrollment with its first valid code.
    pub fn activate(&self, user_id: &str, code: &str) -> ApiResult<()> {
        let mut entry = self
            .enrollments
            .get_mut(user_id)
            .ok_or_else(|| ApiError::not_found("TOTP enrollment"))?;

        if entry.activated {
            return Err(ApiError::conflict("TOTP is already active for this user"));
        }

        let totp = self.totp_for(&entry.secret, &entry.account_name)?;
        if check_code(&totp, code)? {
            entry.activated = true;
            entry.failed_attempts = 0;
            Ok(())
        } else {
            Err(ApiError::unauthorized("Invalid TOTP code"))
        }
    }

    /// Verifies a code against an activated enrollment.
    ///
    /// Failures increment the attempt counter; at the limit the enrollment
    /// locks and further attempts return 429.
    pub fn verify(&self, user_id: &str, code: &str) -> ApiResult<()> {
        let mut entry = self
            .enrollments
            .get_mut(user_id)
            .ok_or_else(|| ApiError::not_found("TOTP enrollment"))?;

        if !entry.activated {
            return Err(ApiError::unauthorized("TOTP is not activated"));
        }
        if entry.failed_attempts >= self.config.max_attempts {
            return Err(ApiError::rate_limit_exceeded(None));
        }

        let totp = self.totp_for(&entry.secret, &entry.account_name)?;
        if check_code(&totp, code)? {
            entry.failed_attempts = 0;
            Ok(())
        } else {
            entry.failed_attempts += 1;
            if entry.failed_attempts >= self.config.max_attempts {
                Err(ApiError::rate_limit_exceeded(None))
            } else {
                Err(ApiError::unauthorized("Invalid TOTP code"))
            }
        }
    }

    /// Returns a user's enrollment state: `None`, pending, or activated.
    pub fn status(&self, user_id: &str) -> Option<bool> {
        self.enrollments.get(user_id).map(|e| e.activated)
    }

    /// Removes an enrollment. Returns `true` if it existed.
    pub fn remove(&self, user_id: &str) -> bool {
        self.enrollments.remove(user_id).is_some()
    }

    /// Generates the current code for a user's enrollment.
    ///
    /// Only exposed for tests and the playground demo flows.
    pub fn current_code(&self, user_id: &str) -> ApiResult<String> {
        let entry = self
            .enrollments
            .get(user_id)
            .ok_or_else(|| ApiError::not_found("TOTP enrollment"))?;

        let totp = self.totp_for(&entry.secret, &entry.account_name)?;
        totp.generate_current()
            .map_err(|e| ApiError::internal(format!("System clock error: {}", e)))
    }

    // 6 digits, 30s step, skew of 1 step either way
    fn totp_for(&self, secret: &[u8], account_name: &str) -> ApiResult<TOTP> {
        TOTP::new(
            Algorithm::SHA1,
            6,
            1,
            30,
            secret.to_vec(),
            Some(self.config.issuer.clone()),
            account_name.to_string(),
        )
        .map_err(|e| ApiError::internal(format!("Invalid TOTP parameters: {}", e)))
    }
}

fn check_code(totp: &TOTP, code: &str) -> ApiResult<bool> {
    totp.check_current(code)
        .map_err(|e| ApiError::internal(format!("System clock error: {}", e)))
}

// =============================================================================
// Tests
// =============================================================================
