// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Audit logging middleware.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    response::Response,
};
use keyrack_core::audit::{ActionResult, AuditAction, AuditLog, AuditLogger, AuditResource};
use tower::{Layer, Service};

use crate::auth::AuthContext;
use crate::config::AuditConfig;

// =============================================================================
// AuditLayer
// =============================================================================

/// Layer for audit logging.
///
/// This layer wraps services to automatically log requests and responses
/// for security and compliance purposes.
#[derive(Clone)]
pub struct AuditLayer {
    logger: Arc<dyn AuditLogger>,
    config: Arc<AuditConfig>,
}

impl AuditLayer {
    /// Creates a new audit layer.
    pub fn new(logger: Arc<dyn AuditLogger>, config: AuditConfig) -> Self {
        Self {
            logger,
            config: Arc::new(config),
        }
    }

    /// Creates a no-op audit layer that doesn't log anything.
    pub fn noop() -> Self {
        Self {
            logger: Arc::new(keyrack_core::NoOpAuditLogger),
            config: Arc::new(AuditConfig::default()),
        }
    }
}

impl<S> Layer<S> for AuditLayer {
    type Service = AuditMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuditMiddleware {
            inner,
            logger: self.logger.clone(),
            config: self.config.clone(),
        }
    }
}

// =============================================================================
// AuditMiddleware
// =============================================================================

/// Middleware for audit logging.
#[derive(Clone)]
pub struct AuditMiddleware<S> {
    inner: S,
    logger: Arc<dyn AuditLogger>,
    config: Arc<AuditConfig>,
}

impl<S> AuditMiddleware<S> {
    /// Determines if the request should be audited based on method and path.
    fn should_audit(&self, method: &Method, path: &str) -> bool {
        if !self.config.enabled {
            return false;
        }

        let actions = &self.config.audit_actions;

        // Authentication flows (password, session, TOTP, magic link,
        // passkey, social login)
        if path.contains("/auth/")
            || path.contains("/sessions")
            || path.contains("/totp/")
            || path.contains("/magic-links")
            || path.contains("/passkeys/")
            || path.contains("/oauth/")
        {
            return actions.authentication;
        }

        // Authorization checks and policy administration
        if path.contains("/authz/") {
            if path.ends_with("/check") {
                return actions.authorization_checks;
            }
            if matches!(
                *method,
                Method::POST | Method::PUT | Method::DELETE | Method::PATCH
            ) {
                return actions.write_operations;
            }
            return actions.read_operations;
        }

        // Write operations
        if matches!(
            *method,
            Method::POST | Method::PUT | Method::DELETE | Method::PATCH
        ) {
            return actions.write_operations;
        }

        // Read operations
        if *method == Method::GET {
            return actions.read_operations;
        }

        false
    }

    /// Maps HTTP method and path to an audit action.
    fn method_to_action(method: &Method, path: &str) -> AuditAction {
        // Password and token endpoints
        if path.contains("/auth/login") {
            return AuditAction::Login;
        }
        if path.contains("/auth/logout") {
            return AuditAction::Logout;
        }
        if path.contains("/auth/refresh") {
            return AuditAction::TokenRefresh;
        }
        if path.contains("/auth/register") {
            return AuditAction::UserCreate;
        }
        if path.contains("/auth/change-password") {
            return AuditAction::PasswordChange;
        }

        // Server-side sessions
        if path.contains("/sessions") {
            return match *method {
                Method::DELETE => AuditAction::SessionRevoke,
                _ => AuditAction::SessionCreate,
            };
        }

        // Second factor and passwordless flows
        if path.contains("/totp/verify") {
            return AuditAction::OtpVerify;
        }
        if path.contains("/totp/") {
            return AuditAction::OtpEnroll;
        }
        if path.contains("/magic-links/redeem") {
            return AuditAction::MagicLinkRedeem;
        }
        if path.contains("/magic-links") {
            return AuditAction::MagicLinkIssue;
        }
        if path.contains("/passkeys/register") {
            return AuditAction::PasskeyRegister;
        }
        if path.contains("/passkeys/login") {
            return AuditAction::PasskeyAssert;
        }
        if path.contains("/oauth/") {
            return AuditAction::OauthLogin;
        }

        // Authorization administration
        if path.contains("/authz/") {
            if path.ends_with("/check") {
                return AuditAction::PermissionCheck;
            }
            if path.contains("/acl/") {
                return AuditAction::AclChange;
            }
            if path.contains("/rbac/users") {
                return AuditAction::RoleChange;
            }
            if path.contains("/tenants") {
                return AuditAction::TenantChange;
            }
            return match *method {
                Method::GET => AuditAction::PermissionCheck,
                _ => AuditAction::PolicyChange,
            };
        }

        if path.contains("/health") || path.contains("/ready") {
            return AuditAction::HealthCheck;
        }

        AuditAction::Custom
    }

    /// Maps status code to action result.
    fn status_to_result(status: StatusCode, _method: &Method, path: &str) -> ActionResult {
        if status.is_success() {
            ActionResult::Success
        } else if status == StatusCode::UNAUTHORIZED {
            if path.contains("/auth/login") {
                ActionResult::failure("Invalid credentials")
            } else {
                ActionResult::Denied
            }
        } else if status == StatusCode::FORBIDDEN {
            ActionResult::Denied
        } else if status == StatusCode::TOO_MANY_REQUESTS {
            ActionResult::rejected("Rate limit exceeded")
        } else {
            ActionResult::failure(format!("HTTP {}", status.as_u16()))
        }
    }
}

impl<S> Service<Request<Body>> for AuditMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let logger = self.logger.clone();
        let should_audit = self.should_audit(req.method(), req.uri().path());
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let auth_ctx = req.extensions().get::<AuthContext>().cloned();

        let mut inner = self.inner.clone();
        let start = Instant::now();

        Box::pin(async move {
            // Call the inner service
            let response = inner.call(req).await?;

            // Log if needed
            if should_audit {
                let status = response.status();
                let duration_ms = start.elapsed().as_millis() as u64;

                let action = Self::method_to_action(&method, &path);
                let result = Self::status_to_result(status, &method, &path);
                let resource = AuditResource::api(&path);

                let mut log = AuditLog::new(action, resource, result)
                    .with_duration(duration_ms)
                    .with_details(serde_json::json!({
                        "method": method.as_str(),
                        "path": path,
                        "status": status.as_u16(),
                    }));

                // Add user context if available
                if let Some(ctx) = auth_ctx {
                    log = log.with_user(&ctx.user_id, ctx.client_ip);
                    log = log.with_correlation_id(ctx.request_id);
                    if let Some(session_id) = ctx.session_id {
                        log = log.with_session_id(session_id);
                    }
                }

                // Fire and forget logging (non-blocking)
                let logger = logger.clone();
                tokio::spawn(async move {
                    if let Err(e) = logger.log(log).await {
                        tracing::warn!(error = %e, "Failed to write audit log");
                    }
                });
            }

            Ok(response)
        })
    }
}

// =============================================================================
// Audit Entry Builder
// =============================================================================

/// Builder for creating audit log entries in handlers.
pub struct AuditEntryBuilder {
    action: AuditAction,
    resource: AuditResource,
    auth_ctx: Option<AuthContext>,
    details: serde_json::Value,
    duration_ms: Option<u64>,
}

impl AuditEntryBuilder {
    /// Creates a new builder.
    pub fn new(action: AuditAction, resource: AuditResource) -> Self {
        Self {
            action,
            resource,
            auth_ctx: None,
            details: serde_json::Value::Null,
            duration_ms: None,
        }
    }

    /// Sets the auth context.
    pub fn with_auth(mut self, ctx: &AuthContext) -> Self {
        self.auth_ctx = Some(ctx.clone());
        self
    }

    /// Sets the details.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }

    /// Sets the duration.
    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Builds the audit log for a successful operation.
    pub fn success(self) -> AuditLog {
        self.build(ActionResult::Success)
    }

    /// Builds the audit log for a failed operation.
    pub fn failure(self, reason: impl Into<String>) -> AuditLog {
        self.build(ActionResult::failure(reason))
    }

    /// Builds the audit log for a denied operation.
    pub fn denied(self) -> AuditLog {
        self.build(ActionResult::Denied)
    }

    fn build(self, result: ActionResult) -> AuditLog {
        let mut log = AuditLog::new(self.action, self.resource, result);

        if !self.details.is_null() {
            log = log.with_details(self.details);
        }

        if let Some(duration) = self.duration_ms {
            log = log.with_duration(duration);
        }

        if let Some(ctx) = self.auth_ctx {
            log = log.with_user(&ctx.user_id, ctx.client_ip);
            log = log.with_correlation_id(ctx.request_id);
        }

        log
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Creates an audit log for an access denied event.
pub fn audit_access_denied(
    auth_ctx: &AuthContext,
    resource: &str,
    required_permission: &str,
) -> AuditLog {
    AuditLog::access_denied(
        AuditAction::PermissionCheck,
        AuditResource::api(resource),
        &auth_ctx.user_id,
        auth_ctx.client_ip,
        format!("Missing permission: {}", required_permission),
    )
    .with_correlation_id(auth_ctx.request_id)
}

/// Creates an audit log for a security event (e.g. a passkey counter
/// regression indicating a cloned authenticator).
pub fn audit_security_event(
    event_type: &str,
    description: impl Into<String>,
    client_ip: Option<std::net::IpAddr>,
) -> AuditLog {
    AuditLog::security_event(event_type, description, client_ip)
}

// =============================================================================
// Tests
// =============================================================================
