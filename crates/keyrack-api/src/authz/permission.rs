// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Permission definitions for RBAC.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Permissions for accessing API resources.
///
/// Permissions are fine-grained access controls that can be assigned to roles.
/// Each endpoint requires one or more permissions to access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    // =========================================================================
    // User Permissions
    // =========================================================================
    /// Read user information.
    UserRead,
    /// Modify user profiles.
    UserWrite,
    /// Manage users (create, delete, roles, sessions).
    UserAdmin,

    // =========================================================================
    // Policy Permissions
    // =========================================================================
    /// Read authorization policies and role bindings.
    PolicyRead,
    /// Modify authorization policies, ACL entries, and role bindings.
    PolicyWrite,

    // =========================================================================
    // Tenant Permissions
    // =========================================================================
    /// Read tenant information and memberships.
    TenantRead,
    /// Manage tenants and memberships.
    TenantAdmin,

    // =========================================================================
    // System Permissions
    // =========================================================================
    /// Full system administration.
    SystemAdmin,
    /// View system metrics and logs.
    SystemMonitor,
    /// Read audit logs.
    AuditRead,
}

impl Permission {
    /// Returns the permission name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::UserRead => "user:read",
            Permission::UserWrite => "user:write",
            Permission::UserAdmin => "user:admin",
            Permission::PolicyRead => "policy:read",
            Permission::PolicyWrite => "policy:write",
            Permission::TenantRead => "tenant:read",
            Permission::TenantAdmin => "tenant:admin",
            Permission::SystemAdmin => "system:admin",
            Permission::SystemMonitor => "system:monitor",
            Permission::AuditRead => "audit:read",
        }
    }

    /// Parses a permission from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user:read" | "UserRead" => Some(Permission::UserRead),
            "user:write" | "UserWrite" => Some(Permission::UserWrite),
            "user:admin" | "UserAdmin" => Some(Permission::UserAdmin),
            "policy:read" | "PolicyRead" => Some(Permission::PolicyRead),
            "policy:write" | "PolicyWrite" => Some(Permission::PolicyWrite),
            "tenant:read" | "TenantRead" => Some(Permission::TenantRead),
            "tenant:admin" | "TenantAdmin" => Some(Permission::TenantAdmin),
            "system:admin" | "SystemAdmin" => Some(Permission::SystemAdmin),
            "system:monitor" | "SystemMonitor" => Some(Permission::SystemMonitor),
            "audit:read" | "AuditRead" => Some(Permission::AuditRead),
            _ => None,
        }
    }

    /// Returns all available permissions.
    pub fn all() -> &'static [Permission] {
        &[
            Permission::UserRead,
            Permission::UserWrite,
            Permission::UserAdmin,
            Permission::PolicyRead,
            Permission::PolicyWrite,
            Permission::TenantRead,
            Permission::TenantAdmin,
            Permission::SystemAdmin,
            Permission::SystemMonitor,
            Permission::AuditRead,
        ]
    }

    /// Returns `true` if this is an admin-level permission.
    pub fn is_admin(&self) -> bool {
        matches!(
            self,
            Permission::UserAdmin
                | Permission::PolicyWrite
                | Permission::TenantAdmin
                | Permission::SystemAdmin
        )
    }

    /// Returns the category of this permission.
    pub fn category(&self) -> &'static str {
        match self {
            Permission::UserRead | Permission::UserWrite | Permission::UserAdmin => "user",
            Permission::PolicyRead | Permission::PolicyWrite => "policy",
            Permission::TenantRead | Permission::TenantAdmin => "tenant",
            Permission::SystemAdmin | Permission::SystemMonitor | Permission::AuditRead => "system",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Permission Set
// =============================================================================

/// A set of permissions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PermissionSet {
    permissions: std::collections::HashSet<Permission>,
}

impl PermissionSet {
    /// Creates an empty permission set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a permission set from a list of permissions.
    pub fn from_permissions(permissions: impl IntoIterator<Item = Permission>) -> Self {
        Self {
            permissions: permissions.into_iter().collect(),
        }
    }

    /// Adds a permission to the set.
    pub fn add(&mut self, permission: Permission) {
        self.permissions.insert(permission);
    }

    /// Removes a permission from the set.
    pub fn remove(&mut self, permission: Permission) {
        self.permissions.remove(&permission);
    }

    /// Returns `true` if the set contains the given permission.
    pub fn contains(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    /// Returns `true` if the set contains all of the given permissions.
    pub fn contains_all(&self, permissions: &[Permission]) -> bool {
        permissions.iter().all(|p| self.permissions.contains(p))
    }

    /// Returns `true` if the set contains any of the given permissions.
    pub fn contains_any(&self, permissions: &[Permission]) -> bool {
        permissions.iter().any(|p| self.permissions.contains(p))
    }

    /// Returns the number of permissions in the set.
    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    /// Returns `true` if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }

    /// Returns an iterator over the permissions.
    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.permissions.iter()
    }

    /// Merges another permission set into this one.
    pub fn merge(&mut self, other: &PermissionSet) {
        self.permissions.extend(other.permissions.iter().copied());
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        Self::from_permissions(iter)
    }
}

// =============================================================================
// Tests
// =============================================================================
