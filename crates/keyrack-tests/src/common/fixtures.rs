// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Pre-built test configurations and credentials.

use keyrack_api::auth::{JwtConfig, OAuthProvider};
use keyrack_api::middleware::RateLimitConfig;
use keyrack_api::ApiConfig;

/// Demo account credentials seeded by `seed_demo_users`.
pub mod demo {
    /// The seeded admin account.
    pub const ADMIN: (&str, &str) = ("admin", "admin-pass-1234");
    /// The seeded member account.
    pub const MEMBER: (&str, &str) = ("member", "member-pass-1234");
    /// The seeded viewer account.
    pub const VIEWER: (&str, &str) = ("viewer", "viewer-pass-1234");
    /// The tenant the demo accounts belong to.
    pub const TENANT: &str = "demo";
}

/// A password that satisfies the registration policy.
pub const VALID_PASSWORD: &str = "correct-horse-battery-9";

/// Creates a test configuration with demo users seeded and rate
/// limiting disabled.
pub fn test_config() -> ApiConfig {
    let mut config = ApiConfig::default();
    config.jwt = JwtConfig::new("integration-test-secret-that-is-long-enough!");
    config.magic_link.secret = "integration-test-magic-link-secret".to_string();
    config.seed_demo_users = true;
    config.rate_limit = RateLimitConfig::disabled();
    config.oauth.providers.push(oauth_test_provider());
    config
}

/// A provider definition for exercising the OAuth endpoints.
///
/// The endpoints point at an unroutable host, so only the redirect
/// construction and state handling can be tested against it.
pub fn oauth_test_provider() -> OAuthProvider {
    OAuthProvider {
        id: "acme".to_string(),
        client_id: "keyrack-test-client".to_string(),
        client_secret: "keyrack-test-secret".to_string(),
        authorize_url: "https://acme.invalid/oauth/authorize".to_string(),
        token_url: "https://acme.invalid/oauth/token".to_string(),
        userinfo_url: "https://acme.invalid/oauth/userinfo".to_string(),
        scopes: vec!["profile".to_string(), "email".to_string()],
        redirect_uri: "http://localhost:8080/api/v1/oauth/acme/callback".to_string(),
    }
}
