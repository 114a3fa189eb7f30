// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Server-side sessions.
//!
//! Session IDs are opaque 256-bit random values. Validation renews the
//! expiry on every touch (sliding window) up to an absolute cap measured
//! from creation. Unknown, expired, and revoked sessions all produce the
//! same error so the API gives no oracle on which IDs exist.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};

// =============================================================================
// SessionConfig
// =============================================================================

/// Session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Sliding idle timeout in seconds.
    pub idle_timeout_secs: u64,
    /// Absolute session lifetime cap in seconds, measured from creation.
    pub absolute_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 1800,      // 30 minutes
            absolute_timeout_secs: 28800, // 8 hours
        }
    }
}

// =============================================================================
// SessionRecord
// =============================================================================

/// A stored session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Opaque session ID.
    pub id: String,
    /// The authenticated user.
    pub user_id: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Current expiry. Renewed on touch, never past the absolute cap.
    pub expires_at: DateTime<Utc>,
    /// Last time the session was used.
    pub last_seen: DateTime<Utc>,
    /// Whether the session has been revoked.
    pub revoked: bool,
}

impl SessionRecord {
    /// Returns `true` if the session can still be used.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && now < self.expires_at
    }
}

// =============================================================================
// SessionManager
// =============================================================================

/// In-memory session store.
#[derive(Debug, Clone)]
pub struct SessionManager {
    sessions: Arc<DashMap<String, SessionRecord>>,
    config: SessionConfig,
}

impl SessionManager {
    /// Creates a new manager with the given configuration.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            config,
        }
    }

    /// Creates a session for a user and returns the stored record.
    pub fn create(&self, user_id: impl Into<String>) -> SessionRecord {
        let now = Utc::now();
        let absolute_cap =
            now + chrono::Duration::seconds(self.config.absolute_timeout_secs as i64);
        let idle = now + chrono::Duration::seconds(self.config.idle_timeout_secs as i64);
        let record = SessionRecord {
            id: generate_session_id(),
            user_id: user_id.into(),
            created_at: now,
            expires_at: idle.min(absolute_cap),
            last_seen: now,
            revoked: false,
        };
        self.sessions.insert(record.id.clone(), record.clone());
        record
    }

    /// Validates a session and renews its expiry.
    ///
    /// Returns the updated record, or 401 for unknown, expired, or revoked
    /// sessions. All three cases share one message.
    pub fn touch(&self, session_id: &str) -> ApiResult<SessionRecord> {
        let now = Utc::now();

        let mut entry = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(invalid_session)?;

        if !entry.is_active(now) {
            return Err(invalid_session());
        }

        let absolute_cap = entry.created_at
            + chrono::Duration::seconds(self.config.absolute_timeout_secs as i64);
        let renewed = now + chrono::Duration::seconds(self.config.idle_timeout_secs as i64);

        entry.last_seen = now;
        entry.expires_at = renewed.min(absolute_cap);

        // the cap itself can be in the past for very old sessions
        if now >= entry.expires_at {
            return Err(invalid_session());
        }

        Ok(entry.clone())
    }

    /// Looks a session up without renewing it.
    pub fn get(&self, session_id: &str) -> Option<SessionRecord> {
        self.sessions.get(session_id).map(|s| s.value().clone())
    }

    /// Revokes a session. Returns 401 for unknown sessions.
    pub fn revoke(&self, session_id: &str) -> ApiResult<()> {
        let mut entry = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(invalid_session)?;
        entry.revoked = true;
        Ok(())
    }

    /// Revokes every session of a user. Returns how many were revoked.
    pub fn revoke_all_for_user(&self, user_id: &str) -> usize {
        let mut revoked = 0;
        for mut entry in self.sessions.iter_mut() {
            if entry.user_id == user_id && !entry.revoked {
                entry.revoked = true;
                revoked += 1;
            }
        }
        revoked
    }

    /// Drops expired and revoked sessions. Returns how many were removed.
    pub fn prune(&self) -> usize {
        let now = Utc::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, record| record.is_active(now));
        before - self.sessions.len()
    }

    /// Returns the number of stored sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if no sessions are stored.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Returns the idle timeout.
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.config.idle_timeout_secs)
    }
}

fn invalid_session() -> ApiError {
    ApiError::unauthorized("Invalid or expired session")
}

fn generate_session_id() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

// =============================================================================
// Tests
// =============================================================================
