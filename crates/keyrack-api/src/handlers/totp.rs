// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! TOTP second-factor handlers.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

use keyrack_core::audit::{ActionResult, AuditAction, AuditLog, AuditResource};

use crate::error::ApiResult;
use crate::extractors::Auth;
use crate::response::ApiResponse;
use crate::state::AppState;

/// Code verification request body, shared by activate and verify.
#[derive(Debug, Deserialize)]
pub struct TotpCodeRequest {
    /// 6-digit code from the authenticator app.
    pub code: String,
}

/// Enrollment state for the caller.
#[derive(Debug, Serialize)]
pub struct TotpStatusResponse {
    /// Whether an enrollment exists.
    pub enrolled: bool,
    /// Whether the enrollment has been activated with a first valid code.
    pub activated: bool,
}

/// POST /api/v1/totp/enroll
///
/// Starts a TOTP enrollment and returns the provisioning secret and
/// `otpauth://` URI. A second enroll before activation replaces the pending
/// secret; an activated factor returns 409.
pub async fn enroll(
    State(state): State<AppState>,
    Auth(auth_ctx): Auth,
) -> ApiResult<impl IntoResponse> {
    let account_name = auth_ctx
        .email
        .clone()
        .unwrap_or_else(|| auth_ctx.user_id.clone());

    let provisioning = state
        .totp_manager
        .enroll(&auth_ctx.user_id, account_name)?;

    let audit_log = AuditLog::new(
        AuditAction::OtpEnroll,
        AuditResource::user(&auth_ctx.user_id),
        ActionResult::Success,
    )
    .with_user(&auth_ctx.user_id, auth_ctx.client_ip);
    let logger = state.audit().clone();
    tokio::spawn(async move {
        if let Err(e) = logger.log(audit_log).await {
            tracing::warn!(error = %e, "Failed to log TOTP enrollment");
        }
    });

    tracing::info!(user_id = %auth_ctx.user_id, "TOTP enrollment started");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(provisioning)),
    ))
}

/// POST /api/v1/totp/activate
///
/// Confirms a pending enrollment with its first valid code.
pub async fn activate(
    State(state): State<AppState>,
    Auth(auth_ctx): Auth,
    Json(request): Json<TotpCodeRequest>,
) -> ApiResult<impl IntoResponse> {
    state.totp_manager.activate(&auth_ctx.user_id, &request.code)?;

    tracing::info!(user_id = %auth_ctx.user_id, "TOTP activated");

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "TOTP activated"
    }))))
}

/// POST /api/v1/totp/verify
///
/// Verifies a code against the caller's activated factor. Repeated failures
/// lock the factor until it is re-enrolled.
pub async fn verify(
    State(state): State<AppState>,
    Auth(auth_ctx): Auth,
    Json(request): Json<TotpCodeRequest>,
) -> ApiResult<impl IntoResponse> {
    let result = state.totp_manager.verify(&auth_ctx.user_id, &request.code);

    let audit_log = AuditLog::new(
        AuditAction::OtpVerify,
        AuditResource::user(&auth_ctx.user_id),
        match &result {
            Ok(()) => ActionResult::Success,
            Err(e) => ActionResult::failure(e.user_message()),
        },
    )
    .with_user(&auth_ctx.user_id, auth_ctx.client_ip);
    let logger = state.audit().clone();
    tokio::spawn(async move {
        if let Err(e) = logger.log(audit_log).await {
            tracing::warn!(error = %e, "Failed to log TOTP verification");
        }
    });

    result?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Code verified"
    }))))
}

/// GET /api/v1/totp
///
/// Returns the caller's enrollment state.
pub async fn status(
    State(state): State<AppState>,
    Auth(auth_ctx): Auth,
) -> ApiResult<impl IntoResponse> {
    let activated = state.totp_manager.status(&auth_ctx.user_id);

    Ok(Json(ApiResponse::success(TotpStatusResponse {
        enrolled: activated.is_some(),
        activated: activated.unwrap_or(false),
    })))
}

/// DELETE /api/v1/totp
///
/// Removes the caller's TOTP factor. Idempotent.
pub async fn remove(
    State(state): State<AppState>,
    Auth(auth_ctx): Auth,
) -> ApiResult<impl IntoResponse> {
    let removed = state.totp_manager.remove(&auth_ctx.user_id);

    if removed {
        tracing::info!(user_id = %auth_ctx.user_id, "TOTP factor removed");
    }

    Ok(Json(ApiResponse::success(serde_json::json!({
        "removed": removed
    }))))
}
