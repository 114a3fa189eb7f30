// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Passkey (WebAuthn-style) handlers.
//!
//! The ceremony shape follows WebAuthn: a challenge round-trip for both
//! registration and login, an allow-list of credential IDs, and a signature
//! counter that must strictly increase. The cryptography is the playground's
//! HMAC stand-in rather than real attestation.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use keyrack_core::audit::{ActionResult, AuditAction, AuditLog, AuditResource};
use keyrack_core::UserId;

use crate::auth::AssertionError;
use crate::error::{ApiError, ApiResult};
use crate::extractors::{Auth, ClientIp};
use crate::middleware::audit::audit_security_event;
use crate::response::{ApiResponse, AuthResponse};
use crate::state::AppState;

// =============================================================================
// Registration
// =============================================================================

/// Registration challenge, bound to the caller.
#[derive(Debug, Serialize)]
pub struct RegistrationChallengeResponse {
    /// Challenge the authenticator must echo back.
    pub challenge: String,
}

/// POST /api/v1/passkeys/register/start
///
/// Issues a registration challenge for the authenticated caller.
pub async fn register_start(
    State(state): State<AppState>,
    Auth(auth_ctx): Auth,
) -> ApiResult<impl IntoResponse> {
    let challenge = state.passkey_manager.start_registration(&auth_ctx.user_id);

    Ok(Json(ApiResponse::success(RegistrationChallengeResponse {
        challenge,
    })))
}

/// Registration completion request body.
#[derive(Debug, Deserialize)]
pub struct FinishRegistrationRequest {
    /// The challenge from `register/start`.
    pub challenge: String,
    /// Authenticator-chosen credential ID.
    pub credential_id: String,
    /// Credential key material.
    pub public_key: String,
}

/// POST /api/v1/passkeys/register/finish
///
/// Stores the new credential. Duplicate credential IDs return 409.
pub async fn register_finish(
    State(state): State<AppState>,
    Auth(auth_ctx): Auth,
    Json(request): Json<FinishRegistrationRequest>,
) -> ApiResult<impl IntoResponse> {
    let credential = state.passkey_manager.finish_registration(
        &auth_ctx.user_id,
        &request.challenge,
        request.credential_id,
        request.public_key,
    )?;

    let audit_log = AuditLog::new(
        AuditAction::PasskeyRegister,
        AuditResource::user(&auth_ctx.user_id),
        ActionResult::Success,
    )
    .with_user(&auth_ctx.user_id, auth_ctx.client_ip)
    .with_details(serde_json::json!({ "credential_id": credential.credential_id }));
    let logger = state.audit().clone();
    tokio::spawn(async move {
        if let Err(e) = logger.log(audit_log).await {
            tracing::warn!(error = %e, "Failed to log passkey registration");
        }
    });

    tracing::info!(user_id = %auth_ctx.user_id, "Passkey registered");

    Ok((StatusCode::CREATED, Json(ApiResponse::success(credential))))
}

// =============================================================================
// Login
// =============================================================================

/// Login challenge request body. The username is optional; without it the
/// allow-list comes back empty (usernameless flow).
#[derive(Debug, Default, Deserialize)]
pub struct StartAssertionRequest {
    /// Username whose credentials should be listed.
    #[serde(default)]
    pub username: Option<String>,
}

/// Assertion challenge plus the credential IDs the caller may use.
#[derive(Debug, Serialize)]
pub struct AssertionChallengeResponse {
    /// Challenge the authenticator must sign.
    pub challenge: String,
    /// Credential IDs registered for the named user, if any.
    pub allow_credentials: Vec<String>,
}

/// POST /api/v1/passkeys/login/start
///
/// Issues an assertion challenge. Unknown usernames still get a challenge
/// with an empty allow-list, so the endpoint does not leak which accounts
/// exist.
pub async fn login_start(
    State(state): State<AppState>,
    request: Option<Json<StartAssertionRequest>>,
) -> ApiResult<impl IntoResponse> {
    let username = request.and_then(|Json(r)| r.username);

    let user_id = match username {
        Some(name) => state
            .users()
            .find_by_username(&name)
            .await
            .ok()
            .map(|u| u.id.to_string()),
        None => None,
    };

    let (challenge, allow_credentials) = state.passkey_manager.start_assertion(user_id.as_deref());

    Ok(Json(ApiResponse::success(AssertionChallengeResponse {
        challenge,
        allow_credentials,
    })))
}

/// Assertion completion request body.
#[derive(Debug, Deserialize)]
pub struct FinishAssertionRequest {
    /// The challenge from `login/start`.
    pub challenge: String,
    /// Credential used to sign it.
    pub credential_id: String,
    /// Signature over the challenge.
    pub signature: String,
    /// Authenticator signature counter.
    pub counter: u32,
}

/// POST /api/v1/passkeys/login/finish
///
/// Verifies the assertion and returns a JWT pair. A counter that fails to
/// increase is treated as a cloned authenticator: the attempt is refused and
/// a security event is recorded, but the response stays a uniform 401.
pub async fn login_finish(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    Json(request): Json<FinishAssertionRequest>,
) -> ApiResult<impl IntoResponse> {
    let invalid = || ApiError::unauthorized("Passkey assertion failed");

    let user_id = match state.passkey_manager.finish_assertion(
        &request.challenge,
        &request.credential_id,
        &request.signature,
        request.counter,
    ) {
        Ok(user_id) => user_id,
        Err(AssertionError::CounterRegression {
            user_id,
            credential_id,
        }) => {
            tracing::warn!(
                user_id = %user_id,
                credential_id = %credential_id,
                "Passkey counter regression, possible cloned authenticator"
            );
            let audit_log = audit_security_event(
                "passkey_counter_regression",
                format!(
                    "Signature counter did not increase for credential '{}'",
                    credential_id
                ),
                client_ip,
            );
            let logger = state.audit().clone();
            tokio::spawn(async move {
                if let Err(e) = logger.log(audit_log).await {
                    tracing::warn!(error = %e, "Failed to log security event");
                }
            });
            return Err(invalid());
        }
        Err(AssertionError::Invalid) => return Err(invalid()),
    };

    let id = UserId::parse(&user_id).ok_or_else(invalid)?;
    let user = state.users().get(id).await.map_err(|_| invalid())?;
    if user.disabled {
        return Err(invalid());
    }

    let pair = state.jwt().issue_pair(&user, Vec::new())?;

    let audit_log = AuditLog::new(
        AuditAction::PasskeyAssert,
        AuditResource::user(&user_id),
        ActionResult::Success,
    )
    .with_user(&user_id, client_ip);
    let logger = state.audit().clone();
    tokio::spawn(async move {
        if let Err(e) = logger.log(audit_log).await {
            tracing::warn!(error = %e, "Failed to log passkey login");
        }
    });

    tracing::info!(user_id = %user.id, "Passkey login");

    Ok(Json(ApiResponse::success(
        AuthResponse::new(pair.access_token, pair.expires_in)
            .with_refresh_token(pair.refresh_token),
    )))
}

// =============================================================================
// Credential management
// =============================================================================

/// GET /api/v1/passkeys
///
/// Lists the caller's registered credential IDs.
pub async fn list_credentials(
    State(state): State<AppState>,
    Auth(auth_ctx): Auth,
) -> ApiResult<impl IntoResponse> {
    let credentials = state.passkey_manager.credentials_for(&auth_ctx.user_id);

    Ok(Json(ApiResponse::success(serde_json::json!({
        "credentials": credentials
    }))))
}

/// DELETE /api/v1/passkeys/{credential_id}
///
/// Removes one of the caller's credentials. Removing someone else's
/// credential is a 404, not a 403, to avoid confirming it exists.
pub async fn remove_credential(
    State(state): State<AppState>,
    Auth(auth_ctx): Auth,
    Path(credential_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let owned = state
        .passkey_manager
        .get_credential(&credential_id)
        .map(|c| c.user_id == auth_ctx.user_id)
        .unwrap_or(false);

    if !owned || !state.passkey_manager.remove_credential(&credential_id) {
        return Err(ApiError::not_found("Passkey credential"));
    }

    tracing::info!(user_id = %auth_ctx.user_id, "Passkey credential removed");

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Credential removed"
    }))))
}
