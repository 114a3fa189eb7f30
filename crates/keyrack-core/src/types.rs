// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Core domain types.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// UserId
// =============================================================================

/// A unique user identifier.
///
/// Wraps a UUID so user ids cannot be confused with other string identifiers
/// flowing through the system (session ids, tenant ids, credential ids).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random user ID (UUIDv7, time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Wraps an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parses a user ID from a string.
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// User
// =============================================================================

/// A user account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,

    /// Login name (unique).
    pub username: String,

    /// Email address (unique).
    pub email: String,

    /// Argon2 password hash. `None` for accounts that only sign in through
    /// passwordless flows (magic link, passkey, social login).
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,

    /// Role names assigned to the user.
    #[serde(default)]
    pub roles: Vec<String>,

    /// Free-form attributes used by attribute-based authorization
    /// (department, clearance, region, ...).
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,

    /// Tenants the user belongs to.
    #[serde(default)]
    pub tenant_ids: Vec<String>,

    /// When the account was created.
    pub created_at: DateTime<Utc>,

    /// Disabled accounts cannot authenticate through any flow.
    #[serde(default)]
    pub disabled: bool,
}

impl User {
    /// Creates a new user with the given username and email.
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: UserId::new(),
            username: username.into(),
            email: email.into(),
            password_hash: None,
            roles: Vec::new(),
            attributes: HashMap::new(),
            tenant_ids: Vec::new(),
            created_at: Utc::now(),
            disabled: false,
        }
    }

    /// Sets the password hash.
    pub fn with_password_hash(mut self, hash: impl Into<String>) -> Self {
        self.password_hash = Some(hash.into());
        self
    }

    /// Adds a role.
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    /// Sets an attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Adds a tenant membership.
    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_ids.push(tenant_id.into());
        self
    }

    /// Returns `true` if the user has the given role.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Returns `true` if the user belongs to the given tenant.
    pub fn belongs_to(&self, tenant_id: &str) -> bool {
        self.tenant_ids.iter().any(|t| t == tenant_id)
    }

    /// Returns a public view of the user with no credential material.
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            roles: self.roles.clone(),
            tenant_ids: self.tenant_ids.clone(),
            created_at: self.created_at,
        }
    }
}

/// Public view of a user, safe to return from API endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    /// Unique user ID.
    pub id: UserId,
    /// Login name.
    pub username: String,
    /// Email address.
    pub email: String,
    /// Assigned roles.
    pub roles: Vec<String>,
    /// Tenant memberships.
    pub tenant_ids: Vec<String>,
    /// Account creation time.
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Tests
// =============================================================================
