// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! WebAuthn-style passkey registration and assertion.
//!
//! The ceremony shapes follow WebAuthn: a server-issued single-use challenge,
//! a credential registry keyed by credential ID, and a signature counter that
//! must strictly increase on every assertion. Signature verification sits
//! behind [`AssertionVerifier`] so the playground's HMAC stand-in can be
//! replaced by a real COSE verifier without touching the ceremonies.

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::{ApiError, ApiResult};

type HmacSha256 = Hmac<Sha256>;

// =============================================================================
// PasskeyConfig
// =============================================================================

/// Passkey configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PasskeyConfig {
    /// Challenge lifetime in seconds.
    pub challenge_ttl_secs: u64,
    /// Relying party identifier embedded in audit trails.
    pub rp_id: String,
}

impl Default for PasskeyConfig {
    fn default() -> Self {
        Self {
            challenge_ttl_secs: 120,
            rp_id: "keyrack".to_string(),
        }
    }
}

// =============================================================================
// Challenges and Credentials
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChallengeKind {
    Registration,
    Assertion,
}

#[derive(Debug, Clone)]
struct Challenge {
    kind: ChallengeKind,
    // registration challenges bind to a user; assertion challenges may be
    // usernameless
    user_id: Option<String>,
    expires_at: DateTime<Utc>,
}

/// A registered passkey credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasskeyCredential {
    /// Credential ID chosen by the authenticator.
    pub credential_id: String,
    /// The owning user.
    pub user_id: String,
    /// Public key material, base64url.
    #[serde(skip_serializing)]
    pub public_key: String,
    /// Signature counter. Must strictly increase on every assertion.
    pub counter: u32,
    /// Registration timestamp.
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// AssertionVerifier
// =============================================================================

/// Verifies an assertion signature against a stored credential.
///
/// The playground ships [`HmacAssertionVerifier`]; a production deployment
/// would plug in COSE/ECDSA verification here.
pub trait AssertionVerifier: Send + Sync {
    /// Returns `true` if `signature` is valid for `challenge` under the
    /// credential's key material.
    fn verify(&self, credential: &PasskeyCredential, challenge: &str, signature: &str) -> bool;
}

/// HMAC-SHA256 stand-in verifier.
///
/// Treats the registered key material as a shared secret: the expected
/// signature is `HMAC-SHA256(key material, challenge)`, base64url. The
/// comparison is constant-time.
#[derive(Debug, Default)]
pub struct HmacAssertionVerifier;

impl AssertionVerifier for HmacAssertionVerifier {
    fn verify(&self, credential: &PasskeyCredential, challenge: &str, signature: &str) -> bool {
        let Ok(sig_bytes) = URL_SAFE_NO_PAD.decode(signature) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(credential.public_key.as_bytes()) else {
            return false;
        };
        mac.update(challenge.as_bytes());
        mac.verify_slice(&sig_bytes).is_ok()
    }
}

/// Signs a challenge the way [`HmacAssertionVerifier`] expects.
///
/// This is the client half of the playground ceremony, used by tests and
/// demo flows.
pub fn sign_challenge(key_material: &str, challenge: &str) -> ApiResult<String> {
    let mut mac = HmacSha256::new_from_slice(key_material.as_bytes())
        .map_err(|e| ApiError::internal(format!("Invalid key material: {}", e)))?;
    mac.update(challenge.as_bytes());
    Ok(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
}

// =============================================================================
// Assertion Outcome
// =============================================================================

/// Why an assertion was refused.
///
/// Counter regression is split out because it indicates a possibly cloned
/// authenticator and must raise a security audit event, not just a 401.
#[derive(Debug)]
pub enum AssertionError {
    /// Challenge, credential, or signature did not check out.
    Invalid,
    /// The presented counter did not increase past the stored one.
    CounterRegression {
        /// The affected user.
        user_id: String,
        /// The affected credential.
        credential_id: String,
    },
}

impl From<AssertionError> for ApiError {
    fn from(err: AssertionError) -> Self {
        match err {
            AssertionError::Invalid => ApiError::unauthorized("Passkey assertion failed"),
            AssertionError::CounterRegression { .. } => {
                ApiError::unauthorized("Passkey assertion failed")
            }
        }
    }
}

// =============================================================================
// PasskeyManager
// =============================================================================

/// Challenge store and credential registry.
#[derive(Clone)]
pub struct PasskeyManager {
    challenges: Arc<DashMap<String, Challenge>>,
    credentials: Arc<DashMap<String, PasskeyCredential>>,
    verifier: Arc<dyn AssertionVerifier>,
    config: PasskeyConfig,
}

impl PasskeyManager {
    /// Creates a manager with the playground HMAC verifier.
    pub fn new(config: PasskeyConfig) -> Self {
        Self::with_verifier(config, Arc::new(HmacAssertionVerifier))
    }

    /// Creates a manager with a custom verifier.
    pub fn with_verifier(config: PasskeyConfig, verifier: Arc<dyn AssertionVerifier>) -> Self {
        Self {
            challenges: Arc::new(DashMap::new()),
            credentials: Arc::new(DashMap::new()),
            verifier,
            config,
        }
    }

    /// Issues a registration challenge bound to a user.
    pub fn start_registration(&self, user_id: impl Into<String>) -> String {
        self.issue_challenge(ChallengeKind::Registration, Some(user_id.into()))
    }

    /// Completes registration: the client echoes the challenge along with
    /// its new credential.
    pub fn finish_registration(
        &self,
        user_id: &str,
        challenge: &str,
        credential_id: impl Into<String>,
        public_key: impl Into<String>,
    ) -> ApiResult<PasskeyCredential> {
        self.consume_challenge(challenge, ChallengeKind::Registration, Some(user_id))?;

        let credential_id = credential_id.into();
        if self.credentials.contains_key(&credential_id) {
            return Err(ApiError::conflict("Credential ID is already registered"));
        }

        let credential = PasskeyCredential {
            credential_id: credential_id.clone(),
            user_id: user_id.to_string(),
            public_key: public_key.into(),
            counter: 0,
            created_at: Utc::now(),
        };
        self.credentials.insert(credential_id, credential.clone());

        Ok(credential)
    }

    /// Issues an assertion challenge.
    ///
    /// With a user ID, the matching credential IDs come back as the
    /// allow-list; without one the list is empty (usernameless flow).
    pub fn start_assertion(&self, user_id: Option<&str>) -> (String, Vec<String>) {
        let allow = match user_id {
            Some(user_id) => self.credentials_for(user_id),
            None => Vec::new(),
        };
        let challenge = self.issue_challenge(ChallengeKind::Assertion, None);
        (challenge, allow)
    }

    /// Completes an assertion, returning the authenticated user ID.
    pub fn finish_assertion(
        &self,
        challenge: &str,
        credential_id: &str,
        signature: &str,
        counter: u32,
    ) -> Result<String, AssertionError> {
        self.consume_challenge(challenge, ChallengeKind::Assertion, None)
            .map_err(|_| AssertionError::Invalid)?;

        let mut credential = self
            .credentials
            .get_mut(credential_id)
            .ok_or(AssertionError::Invalid)?;

        if !self.verifier.verify(&credential, challenge, signature) {
            return Err(AssertionError::Invalid);
        }

        if counter <= credential.counter {
            return Err(AssertionError::CounterRegression {
                user_id: credential.user_id.clone(),
                credential_id: credential.credential_id.clone(),
            });
        }

        credential.counter = counter;
        Ok(credential.user_id.clone())
    }

    /// Returns the credential IDs registered for a user.
    pub fn credentials_for(&self, user_id: &str) -> Vec<String> {
        self.credentials
            .iter()
            .filter(|c| c.user_id == user_id)
            .map(|c| c.credential_id.clone())
            .collect()
    }

    /// Returns a credential by ID.
    pub fn get_credential(&self, credential_id: &str) -> Option<PasskeyCredential> {
        self.credentials
            .get(credential_id)
            .map(|c| c.value().clone())
    }

    /// Removes a credential. Returns `true` if it existed.
    pub fn remove_credential(&self, credential_id: &str) -> bool {
        self.credentials.remove(credential_id).is_some()
    }

    fn issue_challenge(&self, kind: ChallengeKind, user_id: Option<String>) -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let challenge = URL_SAFE_NO_PAD.encode(bytes);

        self.challenges.insert(
            challenge.clone(),
            Challenge {
                kind,
                user_id,
                expires_at: Utc::now()
                    + chrono::Duration::seconds(self.config.challenge_ttl_secs as i64),
            },
        );

        challenge
    }

    // Challenges are single-use: a lookup removes the entry whatever the
    // outcome, so a failed ceremony cannot retry against the same challenge.
    fn consume_challenge(
        &self,
        challenge: &str,
        kind: ChallengeKind,
        user_id: Option<&str>,
    ) -> ApiResult<()> {
        let (_, stored) = self
            .challenges
            .remove(challenge)
            .ok_or_else(|| ApiError::unauthorized("Unknown or expired challenge"))?;

        if stored.kind != kind
            || Utc::now() >= stored.expires_at
            || stored.user_id.as_deref() != user_id
        {
            return Err(ApiError::unauthorized("Unknown or expired challenge"));
        }

        Ok(())
    }
}

impl std::fmt::Debug for PasskeyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasskeyManager")
            .field("credentials", &self.credentials.len())
            .field("pending_challenges", &self.challenges.len())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
