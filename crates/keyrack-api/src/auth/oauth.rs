// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OAuth2-style social login.
//!
//! The authorize step returns the provider URL as JSON instead of a 302,
//! with a random single-use `state` stored server-side. The callback
//! validates the state, exchanges the code through [`ProviderClient`], and
//! returns the provider's view of the user for local upsert.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};

// =============================================================================
// Provider Configuration
// =============================================================================

/// A configured OAuth provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthProvider {
    /// Provider ID used in URLs, e.g. `github`.
    pub id: String,
    /// OAuth client ID.
    pub client_id: String,
    /// OAuth client secret.
    #[serde(skip_serializing)]
    pub client_secret: String,
    /// Provider authorize endpoint.
    pub authorize_url: String,
    /// Provider token endpoint.
    pub token_url: String,
    /// Provider user-info endpoint.
    pub userinfo_url: String,
    /// Scopes requested at authorization.
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Redirect URI registered with the provider.
    pub redirect_uri: String,
}

/// OAuth subsystem configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthConfig {
    /// Configured providers.
    pub providers: Vec<OAuthProvider>,
    /// State lifetime in seconds.
    pub state_ttl_secs: u64,
}

// =============================================================================
// Provider Client
// =============================================================================

/// Tokens returned by the provider's token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderTokens {
    /// Access token for the user-info call.
    pub access_token: String,
}

/// The provider's view of the authenticated user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderUser {
    /// Stable provider-side user ID.
    pub id: String,
    /// Username or handle.
    pub username: String,
    /// Email, when the provider shares one.
    #[serde(default)]
    pub email: Option<String>,
}

/// Talks to the provider's token and user-info endpoints.
///
/// Mocked in tests; [`HttpProviderClient`] is the real implementation.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Exchanges an authorization code for tokens.
    async fn exchange_code(
        &self,
        provider: &OAuthProvider,
        code: &str,
    ) -> ApiResult<ProviderTokens>;

    /// Fetches the user behind an access token.
    async fn fetch_user(
        &self,
        provider: &OAuthProvider,
        access_token: &str,
    ) -> ApiResult<ProviderUser>;
}

/// HTTP provider client backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpProviderClient {
    http: reqwest::Client,
}

impl HttpProviderClient {
    /// Creates a client with default settings.
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }
}

impl Default for HttpProviderClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderClient for HttpProviderClient {
    async fn exchange_code(
        &self,
        provider: &OAuthProvider,
        code: &str,
    ) -> ApiResult<ProviderTokens> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", provider.client_id.as_str()),
            ("client_secret", provider.client_secret.as_str()),
            ("redirect_uri", provider.redirect_uri.as_str()),
        ];

        let response = self
            .http
            .post(&provider.token_url)
            .header(axum::http::header::ACCEPT, "application/json")
            .form(&params)
            .send()
            .await
            .map_err(|e| exchange_failed(&provider.id, e))?;

        if !response.status().is_success() {
            tracing::warn!(
                provider = %provider.id,
                status = %response.status(),
                "Token exchange rejected by provider"
            );
            return Err(ApiError::service_unavailable(
                "Provider token exchange failed",
            ));
        }

        response
            .json::<ProviderTokens>()
            .await
            .map_err(|e| exchange_failed(&provider.id, e))
    }

    async fn fetch_user(
        &self,
        provider: &OAuthProvider,
        access_token: &str,
    ) -> ApiResult<ProviderUser> {
        let response = self
            .http
            .get(&provider.userinfo_url)
            .bearer_auth(access_token)
            .header(axum::http::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| exchange_failed(&provider.id, e))?;

        if !response.status().is_success() {
            return Err(ApiError::service_unavailable(
                "Provider user-info request failed",
            ));
        }

        response
            .json::<ProviderUser>()
            .await
            .map_err(|e| exchange_failed(&provider.id, e))
    }
}

fn exchange_failed(provider: &str, err: impl std::fmt::Display) -> ApiError {
    tracing::warn!(provider = %provider, error = %err, "Provider request failed");
    ApiError::service_unavailable("Provider request failed")
}

// =============================================================================
// OAuthManager
// =============================================================================

#[derive(Debug, Clone)]
struct StateRecord {
    provider_id: String,
    expires_at: DateTime<Utc>,
}

/// The authorize URL handed back to the client.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizeRedirect {
    /// Fully built provider authorize URL.
    pub url: String,
    /// The state parameter embedded in it.
    pub state: String,
}

/// Provider registry and state store.
#[derive(Clone)]
pub struct OAuthManager {
    providers: Arc<HashMap<String, OAuthProvider>>,
    states: Arc<DashMap<String, StateRecord>>,
    client: Arc<dyn ProviderClient>,
    state_ttl_secs: u64,
}

impl OAuthManager {
    /// Creates a manager with the HTTP provider client.
    pub fn new(config: OAuthConfig) -> Self {
        Self::with_client(config, Arc::new(HttpProviderClient::new()))
    }

    /// Creates a manager with a custom provider client.
    pub fn with_client(config: OAuthConfig, client: Arc<dyn ProviderClient>) -> Self {
        let providers = config
            .providers
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();

        Self {
            providers: Arc::new(providers),
            states: Arc::new(DashMap::new()),
            client,
            state_ttl_secs: if config.state_ttl_secs == 0 {
                600
            } else {
                config.state_ttl_secs
            },
        }
    }

    /// Returns the configured provider IDs.
    pub fn provider_ids(&self) -> Vec<&str> {
        self.providers.keys().map(|s| s.as_str()).collect()
    }

    /// Builds the authorize URL for a provider, minting a fresh state.
    pub fn authorize(&self, provider_id: &str) -> ApiResult<AuthorizeRedirect> {
        let provider = self.provider(provider_id)?;

        let state = generate_state();
        self.states.insert(
            state.clone(),
            StateRecord {
                provider_id: provider.id.clone(),
                expires_at: Utc::now() + chrono::Duration::seconds(self.state_ttl_secs as i64),
            },
        );

        let url = format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}",
            provider.authorize_url,
            urlencoding::encode(&provider.client_id),
            urlencoding::encode(&provider.redirect_uri),
            urlencoding::encode(&provider.scopes.join(" ")),
            urlencoding::encode(&state),
        );

        Ok(AuthorizeRedirect { url, state })
    }

    /// Handles the provider callback: validates the single-use state, then
    /// exchanges the code and fetches the provider user.
    pub async fn callback(
        &self,
        provider_id: &str,
        code: &str,
        state: &str,
    ) -> ApiResult<ProviderUser> {
        let provider = self.provider(provider_id)?;

        let (_, record) = self
            .states
            .remove(state)
            .ok_or_else(invalid_state)?;

        if record.provider_id != provider.id || Utc::now() >= record.expires_at {
            return Err(invalid_state());
        }

        let tokens = self.client.exchange_code(provider, code).await?;
        self.client.fetch_user(provider, &tokens.access_token).await
    }

    fn provider(&self, provider_id: &str) -> ApiResult<&OAuthProvider> {
        self.providers
            .get(provider_id)
            .ok_or_else(|| ApiError::not_found(format!("OAuth provider '{}'", provider_id)))
    }
}

impl std::fmt::Debug for OAuthManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthManager")
            .field("providers", &self.provider_ids())
            .field("pending_states", &self.states.len())
            .finish()
    }
}

fn generate_state() -> String {
    let mut bytes = [0u8; 24];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn invalid_state() -> ApiError {
    ApiError::unauthorized("Invalid or expired OAuth state")
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    struct MockClient;

    #[async_trait]
    impl ProviderClient for MockClient {
        async fn exchange_code(
            &self,
            _provider: &OAuthProvider,
            code: &str,
        ) -> ApiResult<ProviderTokens> {
            if code == "good-code" {
                Ok(ProviderTokens {
                    access_token: "provider-access-token".to_string(),
                })
            } else {
                Err(ApiError::service_unavailable("Provider request failed"))
            }
        }

        async fn fetch_user(
            &self,
            _provider: &OAuthProvider,
            access_token: &str,
        ) -> ApiResult<ProviderUser> {
            assert_eq!(access_token, "provider-access-token");
            Ok(ProviderUser {
                id: "prov-42".to_string(),
                username: "alice".to_string(),
                email: Some("alice@example.com".to_string()),
            })
        }
    }

    fn test_provider() -> OAuthProvider {
        OAuthProvider {
            id: "github".to_string(),
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
            authorize_url: "https://github.example/login/oauth/authorize".to_string(),
            token_url: "https://github.example/login/oauth/access_token".to_string(),
            userinfo_url: "https://api.github.example/user".to_string(),
            scopes: vec!["read:user".to_string()],
            redirect_uri: "http://localhost:8080/api/v1/oauth/github/callback".to_string(),
        }
    }

    fn manager() -> OAuthManager {
        OAuthManager::with_client(
            OAuthConfig {
                providers: vec![test_provider()],
                state_ttl_secs: 600,
            },
            Arc::new(MockClient),
        )
    }

    #[test]
    fn test_authorize_builds_url_with_state() {
        let manager = manager();
        let redirect = manager.authorize("github").unwrap();

        assert!(redirect.url.starts_with("https://github.example/login/oauth/authorize?"));
        assert!(redirect.url.contains("client_id=client-id"));
        assert!(redirect.url.contains(&format!("state={}", redirect.state)));
    }

    #[test]
    fn test_unknown_provider_is_404() {
        let manager = manager();
        let err = manager.authorize("gitlab").unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_callback_happy_path() {
        let manager = manager();
        let redirect = manager.authorize("github").unwrap();

        let user = manager
            .callback("github", "good-code", &redirect.state)
            .await
            .unwrap();
        assert_eq!(user.username, "alice");
    }

    #[tokio::test]
    async fn test_state_is_single_use() {
        let manager = manager();
        let redirect = manager.authorize("github").unwrap();

        manager
            .callback("github", "good-code", &redirect.state)
            .await
            .unwrap();

        let err = manager
            .callback("github", "good-code", &redirect.state)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_state_rejected() {
        let manager = manager();
        let err = manager
            .callback("github", "good-code", "made-up-state")
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_exchange_failure_maps_to_503() {
        let manager = manager();
        let redirect = manager.authorize("github").unwrap();

        let err = manager
            .callback("github", "bad-code", &redirect.state)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::SERVICE_UNAVAILABLE);
    }
}
