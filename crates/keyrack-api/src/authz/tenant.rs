// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Multi-tenant authorization.
//!
//! Access inside a tenant is decided by the role the user holds in that
//! tenant, not by their global roles. A user without a membership is denied
//! no matter what they can do elsewhere; the only exception is the global
//! `superadmin` role.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use super::rbac::{RbacPolicy, Role};
use super::{Decision, Permission};

// =============================================================================
// Tenant
// =============================================================================

/// A tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    /// Tenant ID (slug).
    pub id: String,
    /// Display name.
    pub name: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Tenant {
    /// Creates a new tenant.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

/// A user's membership in a tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantMembership {
    /// The member's user ID.
    pub user_id: String,
    /// The role the user holds inside the tenant.
    pub role: String,
    /// When the membership was created.
    pub joined_at: DateTime<Utc>,
}

// =============================================================================
// Tenant Registry
// =============================================================================

/// Tenant and membership store.
#[derive(Debug, Clone, Default)]
pub struct TenantRegistry {
    tenants: Arc<DashMap<String, Tenant>>,
    // tenant id -> user id -> membership
    memberships: Arc<DashMap<String, DashMap<String, TenantMembership>>>,
}

impl TenantRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a tenant. Returns `false` if the ID is already taken.
    pub fn create_tenant(&self, tenant: Tenant) -> bool {
        match self.tenants.entry(tenant.id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(tenant);
                true
            }
        }
    }

    /// Returns a tenant by ID.
    pub fn get_tenant(&self, id: &str) -> Option<Tenant> {
        self.tenants.get(id).map(|t| t.value().clone())
    }

    /// Deletes a tenant and its memberships. Returns `true` if it existed.
    pub fn delete_tenant(&self, id: &str) -> bool {
        self.memberships.remove(id);
        self.tenants.remove(id).is_some()
    }

    /// Returns all tenants.
    pub fn tenants(&self) -> Vec<Tenant> {
        self.tenants.iter().map(|t| t.value().clone()).collect()
    }

    /// Adds or updates a membership. Fails if the tenant does not exist.
    pub fn set_membership(
        &self,
        tenant_id: &str,
        user_id: impl Into<String>,
        role: impl Into<String>,
    ) -> bool {
        if !self.tenants.contains_key(tenant_id) {
            return false;
        }
        let user_id = user_id.into();
        self.memberships
            .entry(tenant_id.to_string())
            .or_default()
            .insert(
                user_id.clone(),
                TenantMembership {
                    user_id,
                    role: role.into(),
                    joined_at: Utc::now(),
                },
            );
        true
    }

    /// Returns a user's membership in a tenant.
    pub fn get_membership(&self, tenant_id: &str, user_id: &str) -> Option<TenantMembership> {
        self.memberships
            .get(tenant_id)?
            .get(user_id)
            .map(|m| m.value().clone())
    }

    /// Removes a membership. Returns `true` if it existed.
    pub fn remove_membership(&self, tenant_id: &str, user_id: &str) -> bool {
        self.memberships
            .get(tenant_id)
            .is_some_and(|members| members.remove(user_id).is_some())
    }

    /// Returns all memberships of a tenant.
    pub fn members(&self, tenant_id: &str) -> Vec<TenantMembership> {
        self.memberships
            .get(tenant_id)
            .map(|members| members.iter().map(|m| m.value().clone()).collect())
            .unwrap_or_default()
    }

    /// Checks whether a user may perform an action inside a tenant.
    ///
    /// The user's tenant role is resolved through the RBAC policy. Global
    /// roles do not cross the tenant boundary, except `superadmin`.
    pub fn check(
        &self,
        rbac: &RbacPolicy,
        tenant_id: &str,
        user_id: &str,
        global_roles: &[String],
        permission: Permission,
    ) -> Decision {
        if !self.tenants.contains_key(tenant_id) {
            return Decision::deny(format!("Unknown tenant '{}'", tenant_id));
        }

        if global_roles.iter().any(|r| r == Role::Superadmin.as_str()) {
            return Decision::Allow;
        }

        let Some(membership) = self.get_membership(tenant_id, user_id) else {
            return Decision::deny(format!(
                "User is not a member of tenant '{}'",
                tenant_id
            ));
        };

        if rbac.has_permission(&[membership.role.clone()], permission) {
            Decision::Allow
        } else {
            Decision::deny(format!(
                "Tenant role '{}' does not grant '{}'",
                membership.role,
                permission.as_str()
            ))
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with_demo() -> TenantRegistry {
        let registry = TenantRegistry::new();
        registry.create_tenant(Tenant::new("demo", "Demo Tenant"));
        registry.set_membership("demo", "alice", "admin");
        registry.set_membership("demo", "bob", "viewer");
        registry
    }

    #[test]
    fn test_tenant_crud() {
        let registry = TenantRegistry::new();

        assert!(registry.create_tenant(Tenant::new("acme", "Acme")));
        assert!(!registry.create_tenant(Tenant::new("acme", "Duplicate")));
        assert!(registry.get_tenant("acme").is_some());

        assert!(registry.delete_tenant("acme"));
        assert!(!registry.delete_tenant("acme"));
        assert!(registry.get_tenant("acme").is_none());
    }

    #[test]
    fn test_membership_requires_tenant() {
        let registry = TenantRegistry::new();
        assert!(!registry.set_membership("ghost", "alice", "admin"));
    }

    #[test]
    fn test_tenant_check_uses_tenant_role() {
        let registry = registry_with_demo();
        let rbac = RbacPolicy::new();

        assert!(registry
            .check(&rbac, "demo", "alice", &[], Permission::PolicyWrite)
            .is_allowed());

        // bob is only a viewer inside the tenant, whatever the global roles say
        let decision = registry.check(
            &rbac,
            "demo",
            "bob",
            &["admin".to_string()],
            Permission::PolicyWrite,
        );
        assert!(!decision.is_allowed());
    }

    #[test]
    fn test_non_member_denied() {
        let registry = registry_with_demo();
        let rbac = RbacPolicy::new();

        let decision = registry.check(
            &rbac,
            "demo",
            "mallory",
            &["admin".to_string()],
            Permission::UserRead,
        );
        assert!(!decision.is_allowed());
    }

    #[test]
    fn test_superadmin_crosses_tenants() {
        let registry = registry_with_demo();
        let rbac = RbacPolicy::new();

        assert!(registry
            .check(
                &rbac,
                "demo",
                "root",
                &["superadmin".to_string()],
                Permission::TenantAdmin,
            )
            .is_allowed());
    }

    #[test]
    fn test_membership_removal() {
        let registry = registry_with_demo();

        assert!(registry.remove_membership("demo", "bob"));
        assert!(!registry.remove_membership("demo", "bob"));
        assert!(registry.get_membership("demo", "bob").is_none());
        assert_eq!(registry.members("demo").len(), 1);
    }
}
