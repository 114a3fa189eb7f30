// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Authorization models.
//!
//! Each submodule implements one access-control model with its own
//! evaluation semantics:
//!
//! - [`rbac`]: roles mapped to permission sets, union across roles
//! - [`abac`]: attribute rules over subject/resource/context, deny wins
//! - [`pbac`]: policy documents with wildcard actions/resources, deny wins
//! - [`acl`]: per-resource entry lists, deny entries win
//! - [`scope`]: `resource:action` scope strings with wildcard coverage
//! - [`tenant`]: tenant membership combined with per-tenant roles
//!
//! All models evaluate to a common [`Decision`].

pub mod abac;
pub mod acl;
pub mod pbac;
pub mod permission;
pub mod rbac;
pub mod scope;
pub mod tenant;

pub use abac::{AbacEngine, AbacRequest, AttributeRule, Condition, RuleEffect};
pub use acl::{AclEntry, AclPermission, AclRegistry, AclSubject};
pub use pbac::{PbacRequest, PolicyDocument, PolicyEffect, PolicySet};
pub use permission::{Permission, PermissionSet};
pub use rbac::{RbacPolicy, RbacPolicyBuilder, Role, RolePermissions};
pub use scope::ScopeSet;
pub use tenant::{Tenant, TenantMembership, TenantRegistry};

use serde::{Deserialize, Serialize};

// =============================================================================
// Decision
// =============================================================================

/// The outcome of an authorization check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    /// Access is granted.
    Allow,
    /// Access is denied.
    Deny {
        /// Why the request was denied.
        reason: String,
    },
    /// No rule applied; callers treat this as a deny.
    NotApplicable,
}

impl Decision {
    /// Creates a deny decision with a reason.
    pub fn deny(reason: impl Into<String>) -> Self {
        Decision::Deny {
            reason: reason.into(),
        }
    }

    /// Returns `true` if access is granted.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// Returns the denial reason, if any.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Decision::Allow => None,
            Decision::Deny { reason } => Some(reason),
            Decision::NotApplicable => Some("No applicable rule"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_allowed() {
        assert!(Decision::Allow.is_allowed());
        assert!(!Decision::deny("nope").is_allowed());
        assert!(!Decision::NotApplicable.is_allowed());
    }

    #[test]
    fn test_decision_reason() {
        assert_eq!(Decision::Allow.reason(), None);
        assert_eq!(Decision::deny("no access").reason(), Some("no access"));
        assert!(Decision::NotApplicable.reason().is_some());
    }
}
