// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Authentication middleware.
//!
//! Accepts either a `Bearer` JWT in the `Authorization` header or an opaque
//! server-side session id in `X-Session-Id`, and inserts an [`AuthContext`]
//! into the request extensions.

use std::collections::HashSet;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, Request},
    response::{IntoResponse, Response},
};
use tower::{Layer, Service};
use uuid::Uuid;

use keyrack_core::{UserId, UserStore};

use crate::auth::{AuthContext, JwtManager, SessionManager};
use crate::authz::RbacPolicy;
use crate::error::ApiError;

/// Header carrying an opaque session id as an alternative to a bearer token.
pub const SESSION_HEADER: &str = "x-session-id";

// =============================================================================
// AuthLayer
// =============================================================================

/// Layer for request authentication.
///
/// Wraps services to authenticate requests before they reach handlers. A
/// request authenticates with a JWT bearer token or a session id header;
/// paths in the public list pass through with an anonymous context.
#[derive(Clone)]
pub struct AuthLayer {
    jwt_manager: Arc<JwtManager>,
    session_manager: Arc<SessionManager>,
    user_store: Arc<dyn UserStore>,
    rbac_policy: Arc<RbacPolicy>,
    public_paths: Arc<HashSet<String>>,
}

impl AuthLayer {
    /// Creates a new auth layer.
    pub fn new(
        jwt_manager: Arc<JwtManager>,
        session_manager: Arc<SessionManager>,
        user_store: Arc<dyn UserStore>,
        rbac_policy: Arc<RbacPolicy>,
    ) -> Self {
        Self {
            jwt_manager,
            session_manager,
            user_store,
            rbac_policy,
            public_paths: Arc::new(HashSet::new()),
        }
    }

    /// Adds public paths that don't require authentication.
    pub fn with_public_paths(mut self, paths: Vec<String>) -> Self {
        self.public_paths = Arc::new(paths.into_iter().collect());
        self
    }

    /// Creates with default public paths.
    ///
    /// Login-style endpoints are public by definition: they establish the
    /// credential rather than require one. Everything under `/oauth/` is
    /// public because the callback arrives from the provider redirect.
    pub fn with_default_public_paths(self) -> Self {
        self.with_public_paths(vec![
            "/health".to_string(),
            "/ready".to_string(),
            "/api/v1/auth/register".to_string(),
            "/api/v1/auth/login".to_string(),
            "/api/v1/auth/refresh".to_string(),
            "/api/v1/sessions".to_string(),
            "/api/v1/magic-links".to_string(),
            "/api/v1/magic-links/redeem".to_string(),
            "/api/v1/passkeys/login/*".to_string(),
            "/api/v1/oauth/*".to_string(),
        ])
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthMiddleware {
            inner,
            jwt_manager: self.jwt_manager.clone(),
            session_manager: self.session_manager.clone(),
            user_store: self.user_store.clone(),
            rbac_policy: self.rbac_policy.clone(),
            public_paths: self.public_paths.clone(),
        }
    }
}

// =============================================================================
// AuthMiddleware
// =============================================================================

/// Middleware for request authentication.
#[derive(Clone)]
pub struct AuthMiddleware<S> {
    inner: S,
    jwt_manager: Arc<JwtManager>,
    session_manager: Arc<SessionManager>,
    user_store: Arc<dyn UserStore>,
    rbac_policy: Arc<RbacPolicy>,
    public_paths: Arc<HashSet<String>>,
}

impl<S> AuthMiddleware<S> {
    /// Checks if a path is public.
    fn is_public_path(&self, path: &str) -> bool {
        // Check exact matches
        if self.public_paths.contains(path) {
            return true;
        }

        // Check prefix matches for paths with parameters
        for public_path in self.public_paths.iter() {
            if public_path.ends_with('*') {
                let prefix = &public_path[..public_path.len() - 1];
                if path.starts_with(prefix) {
                    return true;
                }
            }
        }

        false
    }
}

impl<S> Service<Request<Body>> for AuthMiddleware<S>
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

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let jwt_manager = self.jwt_manager.clone();
        let session_manager = self.session_manager.clone();
        let user_store = self.user_store.clone();
        let rbac_policy = self.rbac_policy.clone();
        let is_public = self.is_public_path(req.uri().path());
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let request_id = Uuid::now_v7();

            let client_ip = req
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ci| ci.0.ip());

            // Skip auth for public paths
            if is_public {
                let mut auth_ctx = AuthContext::anonymous().with_request_id(request_id);
                if let Some(ip) = client_ip {
                    auth_ctx = auth_ctx.with_client_ip(ip);
                }
                req.extensions_mut().insert(auth_ctx);
                return inner.call(req).await;
            }

            // Bearer token first, then session header
            let auth_ctx = if let Some(token) = extract_bearer_token(&req) {
                // validate_access_token enforces the token-use tag and the
                // jti revocation list.
                match jwt_manager.validate_access_token(&token) {
                    Ok(claims) => {
                        let permissions = rbac_policy.get_combined_permissions(&claims.roles);
                        AuthContext::from_claims(&claims, permissions)
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, "Token validation failed");
                        return Ok(e.into_response());
                    }
                }
            } else if let Some(session_id) = extract_session_id(&req) {
                let record = match session_manager.touch(&session_id) {
                    Ok(record) => record,
                    Err(e) => {
                        tracing::debug!(error = %e, "Session validation failed");
                        return Ok(e.into_response());
                    }
                };

                // Sessions only store the user id; roles come from the store
                // so permission changes take effect on the next request.
                let roles = match UserId::parse(&record.user_id) {
                    Some(user_id) => match user_store.get(user_id).await {
                        Ok(user) if !user.disabled => user.roles,
                        _ => {
                            return Ok(ApiError::unauthorized("Invalid or expired session")
                                .into_response());
                        }
                    },
                    None => {
                        return Ok(
                            ApiError::unauthorized("Invalid or expired session").into_response()
                        );
                    }
                };

                let permissions = rbac_policy.get_combined_permissions(&roles);
                AuthContext::from_session(record.user_id, record.id, roles, permissions)
            } else {
                tracing::debug!("No credentials provided");
                return Ok(ApiError::unauthorized("No credentials provided").into_response());
            };

            let mut auth_ctx = auth_ctx.with_request_id(request_id);
            if let Some(ip) = client_ip {
                auth_ctx = auth_ctx.with_client_ip(ip);
            }

            req.extensions_mut().insert(auth_ctx);

            inner.call(req).await
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Extracts the bearer token from the Authorization header.
fn extract_bearer_token<B>(req: &Request<B>) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer ").map(|s| s.to_string()))
}

/// Extracts the opaque session id from the `X-Session-Id` header.
fn extract_session_id<B>(req: &Request<B>) -> Option<String> {
    req.headers()
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|s| s.to_string())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{JwtConfig, SessionConfig};
    use keyrack_core::InMemoryUserStore;

    fn test_layer() -> AuthLayer {
        let jwt_manager = Arc::new(
            JwtManager::new(JwtConfig::new(
                "test-secret-key-that-is-long-enough-for-hs256",
            ))
            .unwrap(),
        );
        let session_manager = Arc::new(SessionManager::new(SessionConfig::default()));
        let user_store: Arc<dyn UserStore> = Arc::new(InMemoryUserStore::new());
        let rbac_policy = Arc::new(RbacPolicy::new());
        AuthLayer::new(jwt_manager, session_manager, user_store, rbac_policy)
    }

    fn mock_service(
    ) -> tower::util::BoxCloneService<Request<Body>, Response, std::convert::Infallible> {
        tower::util::BoxCloneService::new(tower::service_fn(|_req: Request<Body>| async {
            Ok::<_, std::convert::Infallible>(Response::new(Body::empty()))
        }))
    }

    #[test]
    fn test_extract_bearer_token() {
        use axum::http::HeaderValue;

        let mut req = Request::builder().uri("/test").body(Body::empty()).unwrap();

        // No header
        assert!(extract_bearer_token(&req).is_none());

        // Invalid format
        req.headers_mut()
            .insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(extract_bearer_token(&req).is_none());

        // Valid bearer token
        req.headers_mut().insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer mytoken123"),
        );
        assert_eq!(extract_bearer_token(&req), Some("mytoken123".to_string()));
    }

    #[test]
    fn test_extract_session_id() {
        use axum::http::HeaderValue;

        let mut req = Request::builder().uri("/test").body(Body::empty()).unwrap();
        assert!(extract_session_id(&req).is_none());

        req.headers_mut()
            .insert(SESSION_HEADER, HeaderValue::from_static("sess-abc"));
        assert_eq!(extract_session_id(&req), Some("sess-abc".to_string()));
    }

    #[test]
    fn test_public_paths() {
        let layer = test_layer()
            .with_public_paths(vec!["/health".to_string(), "/api/v1/oauth/*".to_string()]);
        let middleware = layer.layer(mock_service());

        assert!(middleware.is_public_path("/health"));
        assert!(middleware.is_public_path("/api/v1/oauth/github/callback"));
        assert!(!middleware.is_public_path("/api/v1/auth/me"));
    }

    #[test]
    fn test_default_public_paths_cover_login_flows() {
        let layer = test_layer().with_default_public_paths();
        let middleware = layer.layer(mock_service());

        assert!(middleware.is_public_path("/api/v1/auth/login"));
        assert!(middleware.is_public_path("/api/v1/auth/register"));
        assert!(middleware.is_public_path("/api/v1/magic-links/redeem"));
        assert!(middleware.is_public_path("/api/v1/passkeys/login/start"));
        assert!(!middleware.is_public_path("/api/v1/passkeys/register/start"));
        assert!(!middleware.is_public_path("/api/v1/totp/enroll"));
    }

    #[tokio::test]
    async fn test_missing_credentials_rejected() {
        use tower::ServiceExt;

        let layer = test_layer().with_default_public_paths();
        let mut service = layer.layer(mock_service());

        let req = Request::builder()
            .uri("/api/v1/auth/me")
            .body(Body::empty())
            .unwrap();

        let response = service.ready().await.unwrap().call(req).await.unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_valid_session_header_accepted() {
        use tower::ServiceExt;

        let jwt_manager = Arc::new(
            JwtManager::new(JwtConfig::new(
                "test-secret-key-that-is-long-enough-for-hs256",
            ))
            .unwrap(),
        );
        let session_manager = Arc::new(SessionManager::new(SessionConfig::default()));
        let store = Arc::new(InMemoryUserStore::new());
        let user = keyrack_core::User::new("casey", "casey@example.com")
            .with_role("member");
        let user = store.create(user).await.unwrap();
        let session = session_manager.create(user.id.to_string());

        let layer = AuthLayer::new(
            jwt_manager,
            session_manager,
            store,
            Arc::new(RbacPolicy::new()),
        );
        let mut service = layer.layer(mock_service());

        let req = Request::builder()
            .uri("/api/v1/auth/me")
            .header(SESSION_HEADER, &session.id)
            .body(Body::empty())
            .unwrap();

        let response = service.ready().await.unwrap().call(req).await.unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }
}
