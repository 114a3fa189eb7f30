// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Server-side session handlers.
//!
//! Sessions are the stateful alternative to JWTs: the client holds an opaque
//! ID and presents it in the `X-Session-Id` header. Everything else lives on
//! the server and can be revoked at any time.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

use keyrack_core::audit::{ActionResult, AuditAction, AuditLog, AuditResource};

use crate::error::{ApiError, ApiResult};
use crate::extractors::{Auth, ClientIp};
use crate::response::ApiResponse;
use crate::state::AppState;

use super::auth::verify_credentials;

// =============================================================================
// Create
// =============================================================================

/// Session login request body.
#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    /// Username or email.
    pub username: String,
    /// Password.
    pub password: String,
}

/// A freshly created session, as returned to the client.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    /// Opaque session ID for the `X-Session-Id` header.
    pub session_id: String,
    /// Authenticated user.
    pub user_id: String,
    /// Current expiry; renewed while the session stays active.
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

/// POST /api/v1/sessions
///
/// Authenticates with a password and opens a server-side session.
pub async fn create_session(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    Json(request): Json<CreateSessionRequest>,
) -> ApiResult<impl IntoResponse> {
    if request.username.is_empty() || request.password.is_empty() {
        return Err(ApiError::bad_request("Username and password are required"));
    }

    let user = verify_credentials(&state, &request.username, &request.password).await?;
    let record = state.sessions().create(user.id.to_string());

    let audit_log = AuditLog::new(
        AuditAction::SessionCreate,
        AuditResource::session(&record.id),
        ActionResult::Success,
    )
    .with_user(user.id.to_string(), client_ip);
    let logger = state.audit().clone();
    tokio::spawn(async move {
        if let Err(e) = logger.log(audit_log).await {
            tracing::warn!(error = %e, "Failed to log session creation");
        }
    });

    tracing::info!(user_id = %user.id, "Session created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(SessionResponse {
            session_id: record.id,
            user_id: record.user_id,
            expires_at: record.expires_at,
        })),
    ))
}

// =============================================================================
// Inspect
// =============================================================================

/// GET /api/v1/sessions/current
///
/// Returns the caller's session record. Requires session authentication.
pub async fn current_session(
    State(state): State<AppState>,
    Auth(auth_ctx): Auth,
) -> ApiResult<impl IntoResponse> {
    let session_id = auth_ctx
        .session_id
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("Not authenticated with a session"))?;

    let record = state
        .sessions()
        .get(session_id)
        .ok_or_else(|| ApiError::not_found("Session"))?;

    Ok(Json(ApiResponse::success(record)))
}

// =============================================================================
// Revoke
// =============================================================================

/// DELETE /api/v1/sessions/current
///
/// Revokes the caller's session.
pub async fn revoke_session(
    State(state): State<AppState>,
    Auth(auth_ctx): Auth,
) -> ApiResult<impl IntoResponse> {
    let session_id = auth_ctx
        .session_id
        .clone()
        .ok_or_else(|| ApiError::bad_request("Not authenticated with a session"))?;

    state.sessions().revoke(&session_id)?;

    let audit_log = AuditLog::new(
        AuditAction::SessionRevoke,
        AuditResource::session(&session_id),
        ActionResult::Success,
    )
    .with_user(&auth_ctx.user_id, auth_ctx.client_ip);
    let logger = state.audit().clone();
    tokio::spawn(async move {
        if let Err(e) = logger.log(audit_log).await {
            tracing::warn!(error = %e, "Failed to log session revocation");
        }
    });

    tracing::info!(user_id = %auth_ctx.user_id, "Session revoked");

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Session revoked"
    }))))
}
