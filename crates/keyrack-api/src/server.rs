// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! API server implementation.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    routing::{delete, get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

use crate::auth::{JwtManager, SessionManager};
use crate::authz::{Permission, RbacPolicy};
use crate::config::ApiConfig;
use crate::error::ApiResult;
use crate::handlers;
use crate::middleware::{AuditLayer, AuthLayer, RateLimitLayer, RbacLayer};
use crate::state::AppState;

// =============================================================================
// ApiServer
// =============================================================================

/// The API server.
///
/// This is the main entry point for creating and running the HTTP server.
pub struct ApiServer {
    state: AppState,
    config: Arc<ApiConfig>,
}

impl ApiServer {
    /// Creates a new API server with the given state.
    pub fn new(state: AppState) -> Self {
        let config = state.config.clone();
        Self { state, config }
    }

    /// Creates the router with all routes and middleware.
    pub fn router(&self) -> Router {
        // Create middleware layers
        let cors = create_cors_layer(&self.config);
        let rate_limit = RateLimitLayer::new(self.config.rate_limit.clone());
        let auth = AuthLayer::new(
            self.state.jwt_manager.clone(),
            self.state.session_manager.clone(),
            self.state.user_store.clone(),
            self.state.rbac_policy.clone(),
        )
        .with_default_public_paths();
        let audit = AuditLayer::new(
            self.state.audit_logger.clone(),
            self.config.audit.clone(),
        );

        // Build the middleware stack
        let middleware_stack = ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(self.config.request_timeout))
            .layer(cors)
            .layer(rate_limit)
            .layer(auth)
            .layer(audit);

        Router::new()
            .merge(core_routes())
            .merge(policy_read_routes())
            .merge(policy_write_routes())
            .merge(role_admin_routes())
            .merge(tenant_routes())
            .layer(middleware_stack)
            .layer(DefaultBodyLimit::max(self.config.max_body_size))
            .with_state(self.state.clone())
    }

    /// Runs the server.
    pub async fn run(self) -> ApiResult<()> {
        let addr = self.config.socket_addr();
        let router = self.router();

        info!("Starting API server on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| crate::error::ApiError::internal(format!("Failed to bind: {}", e)))?;

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .map_err(|e| crate::error::ApiError::internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Runs the server with graceful shutdown.
    pub async fn run_with_shutdown(
        self,
        shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> ApiResult<()> {
        let addr = self.config.socket_addr();
        let router = self.router();

        info!("Starting API server on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| crate::error::ApiError::internal(format!("Failed to bind: {}", e)))?;

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal)
        .await
        .map_err(|e| crate::error::ApiError::internal(format!("Server error: {}", e)))?;

        info!("API server shutdown complete");

        Ok(())
    }

    /// Returns the server address.
    pub fn addr(&self) -> SocketAddr {
        self.config.socket_addr()
    }
}

// =============================================================================
// Routes
// =============================================================================

/// Routes available to any caller the auth layer lets through.
fn core_routes() -> Router<AppState> {
    Router::new()
        // Health endpoints (public)
        .route("/health", get(handlers::health))
        .route("/ready", get(handlers::ready))
        // Password + JWT
        .route("/api/v1/auth/register", post(handlers::register))
        .route("/api/v1/auth/login", post(handlers::login))
        .route("/api/v1/auth/refresh", post(handlers::refresh_token))
        .route("/api/v1/auth/logout", post(handlers::logout))
        .route("/api/v1/auth/me", get(handlers::me))
        .route(
            "/api/v1/auth/change-password",
            post(handlers::change_password),
        )
        // Server-side sessions
        .route("/api/v1/sessions", post(handlers::create_session))
        .route(
            "/api/v1/sessions/current",
            get(handlers::current_session).delete(handlers::revoke_session),
        )
        // TOTP second factor
        .route(
            "/api/v1/totp",
            get(handlers::status).delete(handlers::remove),
        )
        .route("/api/v1/totp/enroll", post(handlers::enroll))
        .route("/api/v1/totp/activate", post(handlers::activate))
        .route("/api/v1/totp/verify", post(handlers::verify))
        // Magic links
        .route("/api/v1/magic-links", post(handlers::issue))
        .route("/api/v1/magic-links/redeem", post(handlers::redeem))
        // Passkeys
        .route("/api/v1/passkeys", get(handlers::list_credentials))
        .route(
            "/api/v1/passkeys/{credential_id}",
            delete(handlers::remove_credential),
        )
        .route(
            "/api/v1/passkeys/register/start",
            post(handlers::register_start),
        )
        .route(
            "/api/v1/passkeys/register/finish",
            post(handlers::register_finish),
        )
        .route("/api/v1/passkeys/login/start", post(handlers::login_start))
        .route(
            "/api/v1/passkeys/login/finish",
            post(handlers::login_finish),
        )
        // Social login
        .route("/api/v1/oauth/providers", get(handlers::providers))
        .route(
            "/api/v1/oauth/{provider}/authorize",
            get(handlers::authorize),
        )
        .route("/api/v1/oauth/{provider}/callback", get(handlers::callback))
        // Decision endpoints (any authenticated caller may ask)
        .route("/api/v1/authz/rbac/check", post(handlers::rbac_check))
        .route("/api/v1/authz/abac/check", post(handlers::abac_check))
        .route("/api/v1/authz/pbac/check", post(handlers::pbac_check))
        .route("/api/v1/authz/acl/check", post(handlers::acl_check))
        .route("/api/v1/authz/scopes/check", post(handlers::scope_check))
        .route(
            "/api/v1/authz/tenants/{id}/check",
            post(handlers::tenant_check),
        )
}

/// Read access to policy definitions.
fn policy_read_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/authz/rbac/roles", get(handlers::rbac_roles))
        .route("/api/v1/authz/abac/rules", get(handlers::list_abac_rules))
        .route(
            "/api/v1/authz/abac/rules/{id}",
            get(handlers::get_abac_rule),
        )
        .route(
            "/api/v1/authz/pbac/policies",
            get(handlers::list_pbac_policies),
        )
        .route(
            "/api/v1/authz/pbac/policies/{id}",
            get(handlers::get_pbac_policy),
        )
        .route("/api/v1/authz/acl/entries", get(handlers::list_acl_entries))
        .route_layer(RbacLayer::require(Permission::PolicyRead))
}

/// Mutating access to policy definitions.
fn policy_write_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/authz/abac/rules", post(handlers::create_abac_rule))
        .route(
            "/api/v1/authz/abac/rules/{id}",
            put(handlers::update_abac_rule).delete(handlers::delete_abac_rule),
        )
        .route(
            "/api/v1/authz/pbac/policies",
            post(handlers::create_pbac_policy),
        )
        .route(
            "/api/v1/authz/pbac/policies/{id}",
            put(handlers::update_pbac_policy).delete(handlers::delete_pbac_policy),
        )
        .route(
            "/api/v1/authz/acl/entries",
            post(handlers::create_acl_entry),
        )
        .route(
            "/api/v1/authz/acl/entries/{id}",
            delete(handlers::delete_acl_entry),
        )
        .route_layer(RbacLayer::require(Permission::PolicyWrite))
}

/// Role bindings: reads need `user:read`, writes need `user:admin`.
fn role_admin_routes() -> Router<AppState> {
    let read = Router::new()
        .route(
            "/api/v1/authz/rbac/users/{user_id}/roles",
            get(handlers::get_user_roles),
        )
        .route_layer(RbacLayer::require(Permission::UserRead));

    let write = Router::new()
        .route(
            "/api/v1/authz/rbac/users/{user_id}/roles",
            put(handlers::set_user_roles),
        )
        .route_layer(RbacLayer::require(Permission::UserAdmin));

    read.merge(write)
}

/// Tenant administration.
fn tenant_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/api/v1/authz/tenants", get(handlers::list_tenants))
        .route("/api/v1/authz/tenants/{id}", get(handlers::get_tenant))
        .route(
            "/api/v1/authz/tenants/{id}/members",
            get(handlers::list_tenant_members),
        )
        .route_layer(RbacLayer::require(Permission::TenantRead));

    let write = Router::new()
        .route("/api/v1/authz/tenants", post(handlers::create_tenant))
        .route(
            "/api/v1/authz/tenants/{id}",
            delete(handlers::delete_tenant),
        )
        .route(
            "/api/v1/authz/tenants/{id}/members/{user_id}",
            put(handlers::set_tenant_membership).delete(handlers::remove_tenant_membership),
        )
        .route_layer(RbacLayer::require(Permission::TenantAdmin));

    read.merge(write)
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Creates the CORS layer from configuration.
fn create_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = &config.cors;

    let mut layer = CorsLayer::new().max_age(Duration::from_secs(cors.max_age));

    if cors.allowed_origins.contains(&"*".to_string()) {
        layer = layer.allow_origin(Any);
    } else {
        let origins: Vec<header::HeaderValue> = cors
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        layer = layer.allow_origin(origins);
    }

    let methods: Vec<Method> = cors
        .allowed_methods
        .iter()
        .filter_map(|m| m.parse().ok())
        .collect();
    layer = layer.allow_methods(methods);

    if cors.allowed_headers.contains(&"*".to_string()) {
        layer = layer.allow_headers(Any);
    } else {
        let headers: Vec<header::HeaderName> = cors
            .allowed_headers
            .iter()
            .filter_map(|h| h.parse().ok())
            .collect();
        layer = layer.allow_headers(headers);
    }

    if cors.allow_credentials {
        layer = layer.allow_credentials(true);
    }

    layer
}

// =============================================================================
// Server Builder
// =============================================================================

/// Builder for creating the API server.
pub struct ApiServerBuilder {
    state_builder: crate::state::AppStateBuilder,
}

impl ApiServerBuilder {
    /// Creates a new server builder.
    pub fn new() -> Self {
        Self {
            state_builder: AppState::builder(),
        }
    }

    /// Sets the configuration.
    pub fn config(mut self, config: ApiConfig) -> Self {
        self.state_builder = self.state_builder.config(config);
        self
    }

    /// Sets the user store.
    pub fn user_store(mut self, store: Arc<dyn keyrack_core::UserStore>) -> Self {
        self.state_builder = self.state_builder.user_store(store);
        self
    }

    /// Sets the JWT manager.
    pub fn jwt_manager(mut self, manager: Arc<JwtManager>) -> Self {
        self.state_builder = self.state_builder.jwt_manager(manager);
        self
    }

    /// Sets the session manager.
    pub fn session_manager(mut self, manager: Arc<SessionManager>) -> Self {
        self.state_builder = self.state_builder.session_manager(manager);
        self
    }

    /// Sets the RBAC policy.
    pub fn rbac_policy(mut self, policy: Arc<RbacPolicy>) -> Self {
        self.state_builder = self.state_builder.rbac_policy(policy);
        self
    }

    /// Sets the audit logger.
    pub fn audit_logger(mut self, logger: Arc<dyn keyrack_core::AuditLogger>) -> Self {
        self.state_builder = self.state_builder.audit_logger(logger);
        self
    }

    /// Builds the server.
    pub fn build(self) -> ApiResult<ApiServer> {
        let state = self.state_builder.build()?;
        Ok(ApiServer::new(state))
    }
}

impl Default for ApiServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::JwtConfig;

    fn test_config() -> ApiConfig {
        let mut config = ApiConfig::default();
        config.jwt = JwtConfig::new("test-secret-key-that-is-long-enough");
        config.magic_link.secret = "magic-link-test-secret".to_string();
        config
    }

    #[test]
    fn test_server_builder() {
        let server = ApiServerBuilder::new()
            .config(test_config())
            .build()
            .unwrap();

        assert_eq!(server.addr().port(), 8080);
    }

    #[test]
    fn test_router_creation() {
        let server = ApiServerBuilder::new()
            .config(test_config())
            .build()
            .unwrap();

        let _router = server.router();
    }

    #[tokio::test]
    async fn test_cors_layer() {
        let config = test_config();
        let _layer = create_cors_layer(&config);
    }
}
