// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Health check handlers.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::response::{ComponentStatus, HealthResponse, ReadinessResponse};
use crate::state::AppState;

/// GET /health
///
/// Liveness probe. Always healthy while the process is up.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse::healthy())
}

/// GET /ready
///
/// Readiness probe. Reports each component; any unhealthy component flips
/// the status to 503.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let mut components = Vec::new();

    let user_count = state.users().count().await;
    components.push(ComponentStatus {
        name: "user_store".to_string(),
        healthy: true,
        message: Some(format!("{} users", user_count)),
    });

    components.push(ComponentStatus {
        name: "sessions".to_string(),
        healthy: true,
        message: Some(format!("{} active sessions", state.sessions().len())),
    });

    let audit_healthy = state.audit().health_check().await;
    components.push(ComponentStatus {
        name: "audit_logger".to_string(),
        healthy: audit_healthy,
        message: (!audit_healthy).then(|| "Audit logger unavailable".to_string()),
    });

    components.push(ComponentStatus {
        name: "oauth_providers".to_string(),
        healthy: true,
        message: Some(format!(
            "{} providers configured",
            state.oauth_manager.provider_ids().len()
        )),
    });

    let ready = components.iter().all(|c| c.healthy);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(ReadinessResponse { ready, components }))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_is_ok() {
        let response = health().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
