// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Access Control Lists (ACL).
//!
//! Each resource carries a list of entries granting or denying permissions
//! to a user or role. A deny entry covering the requested permission wins;
//! otherwise the union of matching grant entries must cover it.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Decision;

// =============================================================================
// ACL Permission
// =============================================================================

/// Permissions grantable through ACL entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AclPermission {
    /// Read the resource.
    Read,
    /// Modify the resource.
    Write,
    /// Delete the resource.
    Delete,
    /// Manage the resource's ACL.
    Admin,
}

impl AclPermission {
    /// Returns the permission name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            AclPermission::Read => "read",
            AclPermission::Write => "write",
            AclPermission::Delete => "delete",
            AclPermission::Admin => "admin",
        }
    }
}

impl fmt::Display for AclPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// ACL Subject
// =============================================================================

/// Who an ACL entry applies to.
///
/// Serialized as `user:{id}` or `role:{name}` strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AclSubject {
    /// A specific user.
    User(String),
    /// Anyone holding the role.
    Role(String),
}

impl AclSubject {
    /// Parses a subject from its string form.
    pub fn parse(s: &str) -> Option<Self> {
        if let Some(id) = s.strip_prefix("user:") {
            if !id.is_empty() {
                return Some(AclSubject::User(id.to_string()));
            }
        }
        if let Some(name) = s.strip_prefix("role:") {
            if !name.is_empty() {
                return Some(AclSubject::Role(name.to_string()));
            }
        }
        None
    }

    /// Returns `true` if the subject matches the given user and roles.
    pub fn applies_to(&self, user_id: &str, roles: &[String]) -> bool {
        match self {
            AclSubject::User(id) => id == user_id,
            AclSubject::Role(name) => roles.iter().any(|r| r == name),
        }
    }
}

impl fmt::Display for AclSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AclSubject::User(id) => write!(f, "user:{}", id),
            AclSubject::Role(name) => write!(f, "role:{}", name),
        }
    }
}

impl Serialize for AclSubject {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for AclSubject {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        AclSubject::parse(&s).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "invalid ACL subject '{}', expected 'user:{{id}}' or 'role:{{name}}'",
                s
            ))
        })
    }
}

// =============================================================================
// ACL Entry
// =============================================================================

/// A single access control entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AclEntry {
    /// Entry ID.
    #[serde(default = "new_entry_id")]
    pub id: Uuid,
    /// The resource the entry guards.
    pub resource: String,
    /// Who the entry applies to.
    pub subject: AclSubject,
    /// Permissions the entry grants or denies.
    pub permissions: Vec<AclPermission>,
    /// When `true`, the entry denies instead of grants.
    #[serde(default)]
    pub deny: bool,
}

fn new_entry_id() -> Uuid {
    Uuid::now_v7()
}

impl AclEntry {
    /// Creates a grant entry.
    pub fn grant(
        resource: impl Into<String>,
        subject: AclSubject,
        permissions: Vec<AclPermission>,
    ) -> Self {
        Self {
            id: new_entry_id(),
            resource: resource.into(),
            subject,
            permissions,
            deny: false,
        }
    }

    /// Creates a deny entry.
    pub fn deny(
        resource: impl Into<String>,
        subject: AclSubject,
        permissions: Vec<AclPermission>,
    ) -> Self {
        Self {
            id: new_entry_id(),
            resource: resource.into(),
            subject,
            permissions,
            deny: true,
        }
    }
}

// =============================================================================
// ACL Registry
// =============================================================================

/// Entry store keyed by resource.
#[derive(Debug, Clone, Default)]
pub struct AclRegistry {
    entries: Arc<DashMap<String, Vec<AclEntry>>>,
}

impl AclRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry, returning its ID.
    pub fn add_entry(&self, entry: AclEntry) -> Uuid {
        let id = entry.id;
        self.entries
            .entry(entry.resource.clone())
            .or_default()
            .push(entry);
        id
    }

    /// Removes an entry by ID. Returns `true` if it existed.
    pub fn remove_entry(&self, id: Uuid) -> bool {
        for mut entries in self.entries.iter_mut() {
            let before = entries.len();
            entries.retain(|e| e.id != id);
            if entries.len() != before {
                return true;
            }
        }
        false
    }

    /// Returns all entries, optionally filtered by resource.
    pub fn entries(&self, resource: Option<&str>) -> Vec<AclEntry> {
        match resource {
            Some(resource) => self
                .entries
                .get(resource)
                .map(|e| e.value().clone())
                .unwrap_or_default(),
            None => self
                .entries
                .iter()
                .flat_map(|e| e.value().clone())
                .collect(),
        }
    }

    /// Evaluates an access check.
    ///
    /// Deny entries covering the permission win. Otherwise the union of
    /// matching grants must cover it. A resource with no matching entries
    /// is not applicable.
    pub fn check(
        &self,
        user_id: &str,
        roles: &[String],
        resource: &str,
        permission: AclPermission,
    ) -> Decision {
        let Some(entries) = self.entries.get(resource) else {
            return Decision::NotApplicable;
        };

        let matching: Vec<&AclEntry> = entries
            .iter()
            .filter(|e| e.subject.applies_to(user_id, roles))
            .collect();

        if matching.is_empty() {
            return Decision::NotApplicable;
        }

        if let Some(deny) = matching
            .iter()
            .find(|e| e.deny && e.permissions.contains(&permission))
        {
            return Decision::deny(format!(
                "Denied by ACL entry for {} on '{}'",
                deny.subject, resource
            ));
        }

        let granted = matching
            .iter()
            .filter(|e| !e.deny)
            .any(|e| e.permissions.contains(&permission));

        if granted {
            Decision::Allow
        } else {
            Decision::deny(format!(
                "No ACL entry grants '{}' on '{}'",
                permission, resource
            ))
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
