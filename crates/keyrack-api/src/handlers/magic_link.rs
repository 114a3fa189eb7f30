// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Magic link (email sign-in) handlers.

use axum::{extract::State, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

use keyrack_core::audit::{ActionResult, AuditAction, AuditLog, AuditResource};
use keyrack_core::UserId;

use crate::error::{ApiError, ApiResult};
use crate::extractors::ClientIp;
use crate::response::{ApiResponse, AuthResponse};
use crate::state::AppState;

// =============================================================================
// Issue
// =============================================================================

/// Magic link request body.
#[derive(Debug, Deserialize)]
pub struct IssueMagicLinkRequest {
    /// Email address to send the link to.
    pub email: String,
}

/// Issue response. The message is identical whether or not the account
/// exists, so the endpoint cannot be used to enumerate emails.
#[derive(Debug, Serialize)]
pub struct IssueMagicLinkResponse {
    /// Uniform acknowledgement.
    pub message: String,
    /// The signed token. A real deployment would email this instead of
    /// returning it; the playground hands it back so the flow can be
    /// exercised without a mail server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// POST /api/v1/magic-links
///
/// Issues a single-use sign-in token for the account behind an email.
pub async fn issue(
    State(state): State<AppState>,
    Json(request): Json<IssueMagicLinkRequest>,
) -> ApiResult<impl IntoResponse> {
    if !request.email.contains('@') {
        return Err(ApiError::bad_request("A valid email address is required"));
    }

    let token = match state.users().find_by_email(&request.email).await {
        Ok(user) if !user.disabled => {
            let token = state.magic_link_manager.issue(user.id.to_string())?;

            let audit_log = AuditLog::new(
                AuditAction::MagicLinkIssue,
                AuditResource::user(user.id.to_string()),
                ActionResult::Success,
            );
            let logger = state.audit().clone();
            tokio::spawn(async move {
                if let Err(e) = logger.log(audit_log).await {
                    tracing::warn!(error = %e, "Failed to log magic link issue");
                }
            });

            Some(token)
        }
        // Unknown or disabled accounts get the same acknowledgement.
        _ => None,
    };

    Ok(Json(ApiResponse::success(IssueMagicLinkResponse {
        message: "If the account exists, a sign-in link has been issued".to_string(),
        token,
    })))
}

// =============================================================================
// Redeem
// =============================================================================

/// Redemption request body.
#[derive(Debug, Deserialize)]
pub struct RedeemMagicLinkRequest {
    /// The token from the link.
    pub token: String,
}

/// POST /api/v1/magic-links/redeem
///
/// Redeems a magic link token for a JWT pair. Tokens are single-use;
/// redeeming consumes them even when the account lookup fails.
pub async fn redeem(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    Json(request): Json<RedeemMagicLinkRequest>,
) -> ApiResult<impl IntoResponse> {
    let user_id = state.magic_link_manager.redeem(&request.token)?;

    let invalid = || ApiError::unauthorized("Invalid or expired magic link");
    let id = UserId::parse(&user_id).ok_or_else(invalid)?;
    let user = state.users().get(id).await.map_err(|_| invalid())?;
    if user.disabled {
        return Err(invalid());
    }

    let pair = state.jwt().issue_pair(&user, Vec::new())?;

    let audit_log = AuditLog::new(
        AuditAction::MagicLinkRedeem,
        AuditResource::user(&user_id),
        ActionResult::Success,
    )
    .with_user(&user_id, client_ip);
    let logger = state.audit().clone();
    tokio::spawn(async move {
        if let Err(e) = logger.log(audit_log).await {
            tracing::warn!(error = %e, "Failed to log magic link redemption");
        }
    });

    tracing::info!(user_id = %user.id, "Magic link redeemed");

    Ok(Json(ApiResponse::success(
        AuthResponse::new(pair.access_token, pair.expires_in)
            .with_refresh_token(pair.refresh_token),
    )))
}
