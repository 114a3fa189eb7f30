// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Social login (OAuth2 authorization-code) handlers.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use keyrack_core::audit::{ActionResult, AuditAction, AuditLog, AuditResource};
use keyrack_core::{StoreError, User};

use crate::auth::ProviderUser;
use crate::error::{ApiError, ApiResult};
use crate::extractors::ClientIp;
use crate::response::{ApiResponse, AuthResponse};
use crate::state::AppState;

/// GET /api/v1/oauth/providers
///
/// Lists the configured provider IDs.
pub async fn providers(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let providers: Vec<String> = state
        .oauth_manager
        .provider_ids()
        .into_iter()
        .map(str::to_string)
        .collect();

    Ok(Json(ApiResponse::success(serde_json::json!({
        "providers": providers
    }))))
}

/// GET /api/v1/oauth/{provider}/authorize
///
/// Builds the provider authorize URL with a fresh single-use state. The
/// playground returns the URL as JSON instead of a 302 so clients can
/// inspect it.
pub async fn authorize(
    State(state): State<AppState>,
    Path(provider): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let redirect = state.oauth_manager.authorize(&provider)?;

    Ok(Json(ApiResponse::success(redirect)))
}

/// Provider callback query parameters.
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    /// Authorization code from the provider.
    pub code: String,
    /// The state minted at authorize time.
    pub state: String,
}

/// GET /api/v1/oauth/{provider}/callback
///
/// Validates the state, exchanges the code, links or creates the local
/// account, and returns a JWT pair.
pub async fn callback(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    Path(provider): Path<String>,
    Query(params): Query<CallbackParams>,
) -> ApiResult<impl IntoResponse> {
    let provider_user = state
        .oauth_manager
        .callback(&provider, &params.code, &params.state)
        .await?;

    let user = upsert_provider_user(&state, &provider, provider_user).await?;
    if user.disabled {
        return Err(ApiError::unauthorized("Account is disabled"));
    }

    let pair = state.jwt().issue_pair(&user, Vec::new())?;

    let audit_log = AuditLog::new(
        AuditAction::OauthLogin,
        AuditResource::user(user.id.to_string()),
        ActionResult::Success,
    )
    .with_user(user.id.to_string(), client_ip)
    .with_details(serde_json::json!({ "provider": provider }));
    let logger = state.audit().clone();
    tokio::spawn(async move {
        if let Err(e) = logger.log(audit_log).await {
            tracing::warn!(error = %e, "Failed to log social login");
        }
    });

    tracing::info!(user_id = %user.id, provider = %provider, "Social login");

    Ok(Json(ApiResponse::success(
        AuthResponse::new(pair.access_token, pair.expires_in)
            .with_refresh_token(pair.refresh_token),
    )))
}

/// Links a provider identity to a local account.
///
/// Accounts match on the provider email when the provider shares one;
/// otherwise a passwordless account keyed to the provider identity is
/// created. Username collisions fall back to a provider-qualified name.
async fn upsert_provider_user(
    state: &AppState,
    provider: &str,
    provider_user: ProviderUser,
) -> ApiResult<User> {
    if let Some(email) = &provider_user.email {
        if let Ok(existing) = state.users().find_by_email(email).await {
            return Ok(existing);
        }
    }

    let email = provider_user
        .email
        .clone()
        .unwrap_or_else(|| format!("{}@{}.local", provider_user.id, provider));

    let user = User::new(&provider_user.username, &email)
        .with_role(state.rbac().default_role())
        .with_attribute(
            "oauth_provider",
            serde_json::Value::String(provider.to_string()),
        )
        .with_attribute(
            "oauth_subject",
            serde_json::Value::String(provider_user.id.clone()),
        );

    match state.users().create(user).await {
        Ok(user) => Ok(user),
        Err(StoreError::Conflict { .. }) => {
            // Username taken by an unrelated local account.
            let user = User::new(
                format!("{}:{}", provider, provider_user.username),
                &email,
            )
            .with_role(state.rbac().default_role())
            .with_attribute(
                "oauth_provider",
                serde_json::Value::String(provider.to_string()),
            )
            .with_attribute(
                "oauth_subject",
                serde_json::Value::String(provider_user.id),
            );
            Ok(state.users().create(user).await?)
        }
        Err(e) => Err(e.into()),
    }
}
