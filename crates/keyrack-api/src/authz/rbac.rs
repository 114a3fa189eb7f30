// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Role-Based Access Control (RBAC).

use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use super::permission::PermissionSet;
use super::{Decision, Permission};

// =============================================================================
// Role
// =============================================================================

/// Predefined roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Read-only access to users and policies.
    Viewer,
    /// Regular user with write access to their own data.
    Member,
    /// User and policy management plus tenant administration.
    Admin,
    /// Complete system access.
    Superadmin,
    /// Custom role (requires explicit permissions).
    Custom,
}

impl Role {
    /// Returns the role name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Viewer => "viewer",
            Role::Member => "member",
            Role::Admin => "admin",
            Role::Superadmin => "superadmin",
            Role::Custom => "custom",
        }
    }

    /// Parses a role from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "viewer" | "reader" => Some(Role::Viewer),
            "member" | "user" => Some(Role::Member),
            "admin" | "administrator" => Some(Role::Admin),
            "superadmin" | "super_admin" | "root" => Some(Role::Superadmin),
            "custom" => Some(Role::Custom),
            _ => None,
        }
    }

    /// Returns the default permissions for this role.
    pub fn default_permissions(&self) -> Vec<Permission> {
        match self {
            Role::Viewer => vec![Permission::UserRead],
            Role::Member => vec![Permission::UserRead, Permission::UserWrite],
            Role::Admin => vec![
                Permission::UserRead,
                Permission::UserWrite,
                Permission::UserAdmin,
                Permission::PolicyRead,
                Permission::PolicyWrite,
                Permission::TenantRead,
                Permission::TenantAdmin,
                Permission::AuditRead,
            ],
            Role::Superadmin => Permission::all().to_vec(),
            Role::Custom => vec![],
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Role Permissions
// =============================================================================

/// Permissions assigned to a role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolePermissions {
    /// Role name.
    pub role: String,
    /// Permissions assigned to this role.
    pub permissions: Vec<Permission>,
    /// Description of the role.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RolePermissions {
    /// Creates a new role permissions entry.
    pub fn new(role: impl Into<String>, permissions: Vec<Permission>) -> Self {
        Self {
            role: role.into(),
            permissions,
            description: None,
        }
    }

    /// Creates role permissions from a predefined role.
    pub fn from_role(role: Role) -> Self {
        Self {
            role: role.as_str().to_string(),
            permissions: role.default_permissions(),
            description: Some(Self::default_description(role)),
        }
    }

    /// Adds a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn default_description(role: Role) -> String {
        match role {
            Role::Viewer => "Read-only access to user data".to_string(),
            Role::Member => "Read and write access to own data".to_string(),
            Role::Admin => "User, policy, and tenant administration".to_string(),
            Role::Superadmin => "Complete system administration access".to_string(),
            Role::Custom => "Custom role with explicit permissions".to_string(),
        }
    }
}

// =============================================================================
// RBAC Policy
// =============================================================================

/// RBAC policy for permission management.
///
/// The central component for role-to-permission mappings. Role definitions
/// can be changed at runtime through the policy endpoints, so the map is
/// concurrent rather than frozen at startup. Combination across multiple
/// roles is a union of grants.
#[derive(Debug, Clone)]
pub struct RbacPolicy {
    /// Role to permissions mapping.
    role_permissions: Arc<DashMap<String, PermissionSet>>,
    /// Default role for new users.
    default_role: String,
}

impl RbacPolicy {
    /// Creates a new RBAC policy with default roles.
    pub fn new() -> Self {
        let role_permissions = DashMap::new();

        for role in &[Role::Viewer, Role::Member, Role::Admin, Role::Superadmin] {
            let perms = PermissionSet::from_permissions(role.default_permissions());
            role_permissions.insert(role.as_str().to_string(), perms);
        }

        Self {
            role_permissions: Arc::new(role_permissions),
            default_role: Role::Member.as_str().to_string(),
        }
    }

    /// Creates a policy builder.
    pub fn builder() -> RbacPolicyBuilder {
        RbacPolicyBuilder::new()
    }

    /// Returns the permissions for a given role, if defined.
    pub fn get_permissions(&self, role: &str) -> Option<PermissionSet> {
        self.role_permissions.get(role).map(|r| r.value().clone())
    }

    /// Defines or replaces a role.
    pub fn define_role(&self, role: impl Into<String>, permissions: Vec<Permission>) {
        self.role_permissions
            .insert(role.into(), PermissionSet::from_permissions(permissions));
    }

    /// Removes a role definition. Returns `true` if the role existed.
    pub fn remove_role(&self, role: &str) -> bool {
        self.role_permissions.remove(role).is_some()
    }

    /// Returns the combined permissions for multiple roles.
    pub fn get_combined_permissions(&self, roles: &[String]) -> PermissionSet {
        let mut combined = PermissionSet::new();

        for role in roles {
            if let Some(perms) = self.role_permissions.get(role) {
                combined.merge(perms.value());
            }
        }

        combined
    }

    /// Returns `true` if the given roles have the specified permission.
    pub fn has_permission(&self, roles: &[String], permission: Permission) -> bool {
        for role in roles {
            if let Some(perms) = self.role_permissions.get(role) {
                if perms.contains(permission) {
                    return true;
                }
            }
        }
        false
    }

    /// Returns `true` if the given roles have all the specified permissions.
    pub fn has_all_permissions(&self, roles: &[String], permissions: &[Permission]) -> bool {
        let combined = self.get_combined_permissions(roles);
        combined.contains_all(permissions)
    }

    /// Returns `true` if the given roles have any of the specified permissions.
    pub fn has_any_permission(&self, roles: &[String], permissions: &[Permission]) -> bool {
        let combined = self.get_combined_permissions(roles);
        combined.contains_any(permissions)
    }

    /// Evaluates a check request to a decision.
    pub fn check(&self, roles: &[String], permission: Permission) -> Decision {
        if self.has_permission(roles, permission) {
            Decision::Allow
        } else {
            Decision::deny(format!(
                "No role grants permission '{}'",
                permission.as_str()
            ))
        }
    }

    /// Returns the default role name.
    pub fn default_role(&self) -> &str {
        &self.default_role
    }

    /// Returns all registered role names.
    pub fn roles(&self) -> Vec<String> {
        self.role_permissions
            .iter()
            .map(|r| r.key().clone())
            .collect()
    }

    /// Returns all role definitions.
    pub fn role_definitions(&self) -> Vec<RolePermissions> {
        self.role_permissions
            .iter()
            .map(|r| {
                RolePermissions::new(r.key().clone(), r.value().iter().copied().collect())
            })
            .collect()
    }
}

impl Default for RbacPolicy {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// RBAC Policy Builder
// =============================================================================

/// Builder for constructing RBAC policies.
#[derive(Debug, Default)]
pub struct RbacPolicyBuilder {
    role_permissions: Vec<(String, PermissionSet)>,
    default_role: Option<String>,
}

impl RbacPolicyBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds default roles with their standard permissions.
    pub fn with_default_roles(mut self) -> Self {
        for role in &[Role::Viewer, Role::Member, Role::Admin, Role::Superadmin] {
            let perms = PermissionSet::from_permissions(role.default_permissions());
            self.role_permissions.push((role.as_str().to_string(), perms));
        }
        self
    }

    /// Adds a role with specific permissions.
    pub fn add_role(mut self, role: impl Into<String>, permissions: Vec<Permission>) -> Self {
        let perms = PermissionSet::from_permissions(permissions);
        self.role_permissions.push((role.into(), perms));
        self
    }

    /// Adds a predefined role.
    pub fn add_predefined_role(mut self, role: Role) -> Self {
        let perms = PermissionSet::from_permissions(role.default_permissions());
        self.role_permissions.push((role.as_str().to_string(), perms));
        self
    }

    /// Sets the default role.
    pub fn default_role(mut self, role: impl Into<String>) -> Self {
        self.default_role = Some(role.into());
        self
    }

    /// Builds the policy.
    pub fn build(self) -> RbacPolicy {
        let map = DashMap::new();
        for (role, perms) in self.role_permissions {
            map.insert(role, perms);
        }

        RbacPolicy {
            role_permissions: Arc::new(map),
            default_role: self
                .default_role
                .unwrap_or_else(|| Role::Member.as_str().to_string()),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
