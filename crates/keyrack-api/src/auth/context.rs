// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Authentication context.

use std::net::IpAddr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::authz::{Permission, PermissionSet};

use super::Claims;

/// How a request was authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// Bearer JWT access token.
    Jwt,
    /// Server-side session ID.
    Session,
    /// Internal system call.
    System,
    /// No credentials presented.
    Anonymous,
}

/// Authentication context for a request.
///
/// This is attached to requests after successful authentication and contains
/// all necessary information for authorization and audit logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    /// User ID.
    pub user_id: String,
    /// User roles.
    pub roles: Vec<String>,
    /// Scopes granted to the presented credential.
    pub scopes: Vec<String>,
    /// Resolved permissions.
    #[serde(skip)]
    pub permissions: Arc<PermissionSet>,
    /// Active tenant, when authenticated in a tenant context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    /// How this request was authenticated.
    pub method: AuthMethod,
    /// Client IP address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<IpAddr>,
    /// Request ID for tracing.
    pub request_id: Uuid,
    /// Session ID (if available).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// User's display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// User's email.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl AuthContext {
    /// Creates a new authentication context from JWT claims.
    pub fn from_claims(claims: &Claims, permissions: PermissionSet) -> Self {
        Self {
            user_id: claims.sub.clone(),
            roles: claims.roles.clone(),
            scopes: claims.scopes.clone(),
            permissions: Arc::new(permissions),
            tenant_id: claims.tenant_id.clone(),
            method: AuthMethod::Jwt,
            client_ip: None,
            request_id: Uuid::now_v7(),
            session_id: claims.session_id.clone(),
            name: claims.name.clone(),
            email: claims.email.clone(),
        }
    }

    /// Creates a context from a server-side session.
    pub fn from_session(
        user_id: impl Into<String>,
        session_id: impl Into<String>,
        roles: Vec<String>,
        permissions: PermissionSet,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            roles,
            scopes: Vec::new(),
            permissions: Arc::new(permissions),
            tenant_id: None,
            method: AuthMethod::Session,
            client_ip: None,
            request_id: Uuid::now_v7(),
            session_id: Some(session_id.into()),
            name: None,
            email: None,
        }
    }

    /// Creates an anonymous context (for unauthenticated requests).
    pub fn anonymous() -> Self {
        Self {
            user_id: "anonymous".to_string(),
            roles: Vec::new(),
            scopes: Vec::new(),
            permissions: Arc::new(PermissionSet::new()),
            tenant_id: None,
            method: AuthMethod::Anonymous,
            client_ip: None,
            request_id: Uuid::now_v7(),
            session_id: None,
            name: None,
            email: None,
        }
    }

    /// Creates a system context (for internal operations).
    pub fn system() -> Self {
        Self {
            user_id: "system".to_string(),
            roles: vec!["system".to_string()],
            scopes: Vec::new(),
            permissions: Arc::new(PermissionSet::from_permissions(
                Permission::all().iter().copied(),
            )),
            tenant_id: None,
            method: AuthMethod::System,
            client_ip: None,
            request_id: Uuid::now_v7(),
            session_id: None,
            name: Some("System".to_string()),
            email: None,
        }
    }

    /// Sets the client IP address.
    pub fn with_client_ip(mut self, ip: IpAddr) -> Self {
        self.client_ip = Some(ip);
        self
    }

    /// Sets the request ID.
    pub fn with_request_id(mut self, request_id: Uuid) -> Self {
        self.request_id = request_id;
        self
    }

    /// Returns `true` if the context has the given role.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Returns `true` if the context has any of the given roles.
    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        roles.iter().any(|role| self.has_role(role))
    }

    /// Returns `true` if the credential carries the given scope.
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }

    /// Returns `true` if the context has the given permission.
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(permission)
    }

    /// Returns `true` if the context has all of the given permissions.
    pub fn has_all_permissions(&self, permissions: &[Permission]) -> bool {
        self.permissions.contains_all(permissions)
    }

    /// Returns `true` if the context has any of the given permissions.
    pub fn has_any_permission(&self, permissions: &[Permission]) -> bool {
        self.permissions.contains_any(permissions)
    }

    /// Returns `true` if this is an anonymous context.
    pub fn is_anonymous(&self) -> bool {
        self.method == AuthMethod::Anonymous
    }

    /// Returns `true` if this is a system context.
    pub fn is_system(&self) -> bool {
        self.method == AuthMethod::System
    }

    /// Returns `true` if this context has admin privileges.
    pub fn is_admin(&self) -> bool {
        self.has_permission(Permission::SystemAdmin)
            || self.has_role("admin")
            || self.has_role("superadmin")
    }

    /// Converts to keyrack_core's AuditContext for audit logging.
    pub fn to_audit_context(&self) -> keyrack_core::AuditContext {
        keyrack_core::AuditContext {
            user_id: Some(self.user_id.clone()),
            client_ip: self.client_ip,
            request_id: Some(self.request_id),
            session_id: self.session_id.clone(),
            roles: self.roles.clone(),
            user_agent: None,
        }
    }
}

impl Default for AuthContext {
    fn default() -> Self {
        Self::anonymous()
    }
}

// =============================================================================
// Tests
// =============================================================================
