// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Single-use magic-link tokens.
//!
//! A token is `{id}.{sig}` where `sig` is an HMAC-SHA256 over the record ID,
//! base64url-encoded. The server keeps the record; the signature keeps a
//! leaked store dump from being redeemable without the key. Redemption is
//! single-use, TTL-bound, and counts failed attempts per record.

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

type HmacSha256 = Hmac<Sha256>;

// =============================================================================
// MagicLinkConfig
// =============================================================================

/// Magic link configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MagicLinkConfig {
    /// Signing key for link tokens.
    #[serde(skip_serializing)]
    pub secret: String,
    /// Link lifetime in seconds.
    pub ttl_secs: u64,
    /// Failed redemption attempts before the record locks.
    pub max_attempts: u32,
}

impl Default for MagicLinkConfig {
    fn default() -> Self {
        Self {
            secret: String::new(), // Must be set by user
            ttl_secs: 900,         // 15 minutes
            max_attempts: 3,
        }
    }
}

// =============================================================================
// MagicLinkRecord
// =============================================================================

/// A stored magic link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MagicLinkRecord {
    /// Record ID, the first half of the token.
    pub id: Uuid,
    /// The user the link signs in.
    pub user_id: String,
    /// Issue timestamp.
    pub issued_at: DateTime<Utc>,
    /// Expiry timestamp.
    pub expires_at: DateTime<Utc>,
    /// Set on successful redemption; a used link never redeems again.
    pub used: bool,
    /// Failed redemption attempts against this record.
    pub attempts: u32,
}

// =============================================================================
// MagicLinkManager
// =============================================================================

/// Mints and redeems magic-link tokens.
#[derive(Clone)]
pub struct MagicLinkManager {
    records: Arc<DashMap<Uuid, MagicLinkRecord>>,
    config: MagicLinkConfig,
}

impl MagicLinkManager {
    /// Creates a new manager with the given configuration.
    pub fn new(config: MagicLinkConfig) -> ApiResult<Self> {
        if config.secret.is_empty() {
            return Err(ApiError::internal("Magic link secret is not configured"));
        }
        Ok(Self {
            records: Arc::new(DashMap::new()),
            config,
        })
    }

    /// Issues a token for a user and returns the `{id}.{sig}` string.
    pub fn issue(&self, user_id: impl Into<String>) -> ApiResult<String> {
        let id = Uuid::now_v7();
        let now = Utc::now();

        self.records.insert(
            id,
            MagicLinkRecord {
                id,
                user_id: user_id.into(),
                issued_at: now,
                expires_at: now + chrono::Duration::seconds(self.config.ttl_secs as i64),
                used: false,
                attempts: 0,
            },
        );

        Ok(format!("{}.{}", id, self.sign(id)?))
    }

    /// Redeems a token, returning the user it signs in.
    ///
    /// The signature check is constant-time. Replays, tampered signatures,
    /// expired links, and exhausted attempt counters all map to 401, and
    /// every failure against a known record increments its counter.
    pub fn redeem(&self, token: &str) -> ApiResult<String> {
        let (id, sig) = parse_token(token)?;

        let mut record = self
            .records
            .get_mut(&id)
            .ok_or_else(invalid_link)?;

        if record.used || record.attempts >= self.config.max_attempts {
            return Err(invalid_link());
        }

        if !self.verify(id, &sig) {
            record.attempts += 1;
            return Err(invalid_link());
        }

        if Utc::now() >= record.expires_at {
            record.attempts += 1;
            return Err(invalid_link());
        }

        record.used = true;
        Ok(record.user_id.clone())
    }

    /// Returns a record by ID.
    pub fn get(&self, id: Uuid) -> Option<MagicLinkRecord> {
        self.records.get(&id).map(|r| r.value().clone())
    }

    /// Drops used and expired records. Returns how many were removed.
    pub fn prune(&self) -> usize {
        let now = Utc::now();
        let before = self.records.len();
        self.records
            .retain(|_, record| !record.used && now < record.expires_at);
        before - self.records.len()
    }

    fn sign(&self, id: Uuid) -> ApiResult<String> {
        let mut mac = HmacSha256::new_from_slice(self.config.secret.as_bytes())
            .map_err(|e| ApiError::internal(format!("Invalid magic link key: {}", e)))?;
        mac.update(id.as_bytes());
        Ok(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
    }

    fn verify(&self, id: Uuid, sig: &str) -> bool {
        let Ok(sig_bytes) = URL_SAFE_NO_PAD.decode(sig) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(self.config.secret.as_bytes()) else {
            return false;
        };
        mac.update(id.as_bytes());
        mac.verify_slice(&sig_bytes).is_ok()
    }
}

impl std::fmt::Debug for MagicLinkManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MagicLinkManager")
            .field("records", &self.records.len())
            .field("ttl_secs", &self.config.ttl_secs)
            .finish()
    }
}

fn parse_token(token: &str) -> ApiResult<(Uuid, String)> {
    let (id, sig) = token.split_once('.').ok_or_else(invalid_link)?;
    let id = Uuid::parse_str(id).map_err(|_| invalid_link())?;
    if sig.is_empty() {
        return Err(invalid_link());
    }
    Ok((id, sig.to_string()))
}

fn invalid_link() -> ApiError {
    ApiError::unauthorized("Invalid or expired magic link")
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> MagicLinkManager {
        MagicLinkManager::new(MagicLinkConfig {
            secret: "magic-link-test-secret".to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_issue_and_redeem() {
        let manager = manager();
        let token = manager.issue("alice").unwrap();

        assert_eq!(manager.redeem(&token).unwrap(), "alice");
    }

    #[test]
    fn test_replay_rejected() {
        let manager = manager();
        let token = manager.issue("alice").unwrap();

        manager.redeem(&token).unwrap();
        assert!(manager.redeem(&token).is_err());
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let manager = manager();
        let token = manager.issue("alice").unwrap();

        let (id, _) = token.split_once('.').unwrap();
        let forged = format!("{}.{}", id, URL_SAFE_NO_PAD.encode([0u8; 32]));

        assert!(manager.redeem(&forged).is_err());

        // the failure is counted against the record
        let record = manager.get(id.parse().unwrap()).unwrap();
        assert_eq!(record.attempts, 1);
    }

    #[test]
    fn test_attempts_lock_the_record() {
        let manager = MagicLinkManager::new(MagicLinkConfig {
            secret: "magic-link-test-secret".to_string(),
            max_attempts: 2,
            ..Default::default()
        })
        .unwrap();

        let token = manager.issue("alice").unwrap();
        let (id, _) = token.split_once('.').unwrap();
        let forged = format!("{}.{}", id, URL_SAFE_NO_PAD.encode([0u8; 32]));

        let _ = manager.redeem(&forged);
        let _ = manager.redeem(&forged);

        // the genuine token no longer redeems either
        assert!(manager.redeem(&token).is_err());
    }

    #[test]
    fn test_expired_link_rejected() {
        let manager = MagicLinkManager::new(MagicLinkConfig {
            secret: "magic-link-test-secret".to_string(),
            ttl_secs: 0,
            ..Default::default()
        })
        .unwrap();

        let token = manager.issue("alice").unwrap();
        assert!(manager.redeem(&token).is_err());
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        let manager = manager();

        assert!(manager.redeem("not-a-token").is_err());
        assert!(manager.redeem("00000000-0000-0000-0000-000000000000.sig").is_err());
        assert!(manager.redeem(&format!("{}.", Uuid::now_v7())).is_err());
    }

    #[test]
    fn test_prune() {
        let manager = manager();
        let token = manager.issue("alice").unwrap();
        manager.redeem(&token).unwrap();

        assert_eq!(manager.prune(), 1);
    }
}
