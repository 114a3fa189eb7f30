// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Password and JWT authentication handlers.

use axum::{extract::State, http::HeaderMap, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

use keyrack_core::audit::{ActionResult, AuditAction, AuditLog, AuditResource};
use keyrack_core::{password, User, UserId};

use crate::error::{ApiError, ApiResult, ValidationErrors};
use crate::extractors::{Auth, ClientIp};
use crate::response::{ApiResponse, AuthResponse};
use crate::state::AppState;

// =============================================================================
// Register
// =============================================================================

/// Registration request body.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// Login name (unique).
    pub username: String,
    /// Email address (unique).
    pub email: String,
    /// Plaintext password, checked against the password policy.
    pub password: String,
}

/// POST /api/v1/auth/register
///
/// Creates a new account with the default role and returns its profile.
pub async fn register(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut errors = ValidationErrors::new();
    if request.username.trim().is_empty() {
        errors.add("username", "Username is required");
    }
    if !request.email.contains('@') {
        errors.add("email", "A valid email address is required");
    }
    if let Err(e) = password::validate_policy(&request.password) {
        errors.add("password", e.to_string());
    }
    if !errors.is_empty() {
        return Err(ApiError::validation_with_errors(
            "Registration request is invalid",
            errors,
        ));
    }

    let hash = state.password_hasher.hash(&request.password)?;
    let user = User::new(request.username.trim(), request.email.trim())
        .with_password_hash(hash)
        .with_role(state.rbac().default_role());

    // Duplicate username/email comes back as a store conflict (409).
    let user = state.users().create(user).await?;

    let audit_log = AuditLog::new(
        AuditAction::UserCreate,
        AuditResource::user(user.id.to_string()),
        ActionResult::Success,
    )
    .with_user(user.id.to_string(), client_ip);
    let logger = state.audit().clone();
    tokio::spawn(async move {
        if let Err(e) = logger.log(audit_log).await {
            tracing::warn!(error = %e, "Failed to log registration");
        }
    });

    tracing::info!(user_id = %user.id, username = %user.username, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(user.profile())),
    ))
}

// =============================================================================
// Login
// =============================================================================

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Username or email.
    pub username: String,
    /// Password.
    pub password: String,
}

/// POST /api/v1/auth/login
///
/// Authenticates a user and returns a JWT token pair.
pub async fn login(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    Json(request): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    if request.username.is_empty() || request.password.is_empty() {
        return Err(ApiError::bad_request("Username and password are required"));
    }

    let user = match verify_credentials(&state, &request.username, &request.password).await {
        Ok(user) => user,
        Err(e) => {
            let audit_log = AuditLog::login(&request.username, client_ip, false);
            let logger = state.audit().clone();
            tokio::spawn(async move {
                if let Err(e) = logger.log(audit_log).await {
                    tracing::warn!(error = %e, "Failed to log failed login");
                }
            });
            return Err(e);
        }
    };

    let pair = state.jwt().issue_pair(&user, Vec::new())?;

    let audit_log = AuditLog::login(user.id.to_string(), client_ip, true);
    let logger = state.audit().clone();
    tokio::spawn(async move {
        if let Err(e) = logger.log(audit_log).await {
            tracing::warn!(error = %e, "Failed to log successful login");
        }
    });

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(ApiResponse::success(
        AuthResponse::new(pair.access_token, pair.expires_in)
            .with_refresh_token(pair.refresh_token),
    )))
}

/// Resolves a username (or email) and verifies the password.
///
/// Every failure mode returns the same 401 so responses cannot be used to
/// probe which accounts exist.
pub(super) async fn verify_credentials(
    state: &AppState,
    username: &str,
    password: &str,
) -> ApiResult<User> {
    let invalid = || ApiError::unauthorized("Invalid username or password");

    let user = match state.users().find_by_username(username).await {
        Ok(user) => user,
        Err(_) => state
            .users()
            .find_by_email(username)
            .await
            .map_err(|_| invalid())?,
    };

    if user.disabled {
        return Err(invalid());
    }

    let hash = user.password_hash.as_deref().ok_or_else(invalid)?;
    state
        .password_hasher
        .verify(password, hash)
        .map_err(|_| invalid())?;

    Ok(user)
}

// =============================================================================
// Refresh
// =============================================================================

/// Refresh request body.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    /// Refresh token from a previous login or refresh.
    pub refresh_token: String,
}

/// POST /api/v1/auth/refresh
///
/// Rotates a refresh token: the presented token is revoked and a fresh pair
/// is minted against the user's current roles.
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> ApiResult<impl IntoResponse> {
    let claims = state.jwt().validate_refresh_token(&request.refresh_token)?;

    // Roles come from the store, not the old token, so role changes and
    // disabled accounts take effect at the next refresh.
    let user_id = UserId::parse(&claims.sub)
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired refresh token"))?;
    let user = state
        .users()
        .get(user_id)
        .await
        .map_err(|_| ApiError::unauthorized("Invalid or expired refresh token"))?;
    if user.disabled {
        return Err(ApiError::unauthorized("Invalid or expired refresh token"));
    }

    if let Some(jti) = claims.jti {
        state.jwt().revoke(jti);
    }

    let pair = state.jwt().issue_pair(&user, claims.scopes)?;

    tracing::debug!(user_id = %user.id, "Token pair refreshed");

    Ok(Json(ApiResponse::success(
        AuthResponse::new(pair.access_token, pair.expires_in)
            .with_refresh_token(pair.refresh_token),
    )))
}

// =============================================================================
// Logout
// =============================================================================

/// Logout request body. The refresh token is optional; without it only the
/// access token and session are invalidated.
#[derive(Debug, Default, Deserialize)]
pub struct LogoutRequest {
    /// Refresh token to revoke alongside the access token.
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// POST /api/v1/auth/logout
///
/// Revokes the presented access token (and refresh token, when supplied).
/// Session-authenticated callers get their session revoked instead.
pub async fn logout(
    State(state): State<AppState>,
    Auth(auth_ctx): Auth,
    headers: HeaderMap,
    request: Option<Json<LogoutRequest>>,
) -> ApiResult<impl IntoResponse> {
    if let Some(token) = bearer_token(&headers) {
        if let Ok(claims) = state.jwt().decode_without_validation(token) {
            if let Some(jti) = claims.jti {
                state.jwt().revoke(jti);
            }
        }
    }

    if let Some(Json(request)) = request {
        if let Some(refresh) = request.refresh_token {
            if let Ok(claims) = state.jwt().decode_without_validation(&refresh) {
                if let Some(jti) = claims.jti {
                    state.jwt().revoke(jti);
                }
            }
        }
    }

    if let Some(session_id) = &auth_ctx.session_id {
        // Already-gone sessions are fine; logout is idempotent.
        let _ = state.sessions().revoke(session_id);
    }

    let audit_log = AuditLog::logout(&auth_ctx.user_id, auth_ctx.client_ip);
    let logger = state.audit().clone();
    tokio::spawn(async move {
        if let Err(e) = logger.log(audit_log).await {
            tracing::warn!(error = %e, "Failed to log logout");
        }
    });

    tracing::info!(user_id = %auth_ctx.user_id, "User logged out");

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Logged out successfully"
    }))))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

// =============================================================================
// Current user
// =============================================================================

/// The authenticated caller, as seen by the authorization layer.
#[derive(Debug, Serialize)]
pub struct CurrentUserResponse {
    /// User ID.
    pub user_id: String,
    /// Assigned role names.
    pub roles: Vec<String>,
    /// Granted OAuth-style scopes.
    pub scopes: Vec<String>,
    /// Effective permissions, combined across roles.
    pub permissions: Vec<String>,
    /// Active tenant, when the token carries one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    /// How the caller authenticated.
    pub method: crate::auth::AuthMethod,
    /// Display name, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Email, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// GET /api/v1/auth/me
///
/// Returns the caller's identity, roles, and effective permissions.
pub async fn me(Auth(auth_ctx): Auth) -> ApiResult<impl IntoResponse> {
    let permissions = auth_ctx
        .permissions
        .iter()
        .map(|p| p.as_str().to_string())
        .collect();

    Ok(Json(ApiResponse::success(CurrentUserResponse {
        user_id: auth_ctx.user_id.clone(),
        roles: auth_ctx.roles.clone(),
        scopes: auth_ctx.scopes.clone(),
        permissions,
        tenant_id: auth_ctx.tenant_id.clone(),
        method: auth_ctx.method,
        name: auth_ctx.name.clone(),
        email: auth_ctx.email.clone(),
    })))
}

// =============================================================================
// Change password
// =============================================================================

/// Password change request body.
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    /// The current password, re-verified before the change.
    pub current_password: String,
    /// The replacement password.
    pub new_password: String,
}

/// POST /api/v1/auth/change-password
///
/// Verifies the current password, applies the new one, and revokes every
/// other session the user holds.
pub async fn change_password(
    State(state): State<AppState>,
    Auth(auth_ctx): Auth,
    Json(request): Json<ChangePasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    let user_id = UserId::parse(&auth_ctx.user_id)
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;
    let mut user = state.users().get(user_id).await?;

    let hash = user
        .password_hash
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("Account has no password set"))?;
    state
        .password_hasher
        .verify(&request.current_password, hash)
        .map_err(|_| ApiError::unauthorized("Current password is incorrect"))?;

    if request.new_password == request.current_password {
        return Err(ApiError::validation(
            "New password must differ from the current password",
        ));
    }
    password::validate_policy(&request.new_password)?;
    user.password_hash = Some(state.password_hasher.hash(&request.new_password)?);
    state.users().update(user).await?;

    let revoked = state.sessions().revoke_all_for_user(&auth_ctx.user_id);

    let audit_log = AuditLog::new(
        AuditAction::PasswordChange,
        AuditResource::user(&auth_ctx.user_id),
        ActionResult::Success,
    )
    .with_user(&auth_ctx.user_id, auth_ctx.client_ip)
    .with_details(serde_json::json!({ "sessions_revoked": revoked }));
    let logger = state.audit().clone();
    tokio::spawn(async move {
        if let Err(e) = logger.log(audit_log).await {
            tracing::warn!(error = %e, "Failed to log password change");
        }
    });

    tracing::info!(user_id = %auth_ctx.user_id, "Password changed");

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Password changed",
        "sessions_revoked": revoked
    }))))
}
