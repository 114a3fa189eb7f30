// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Authentication Integration Tests
//!
//! End-to-end tests for the authentication flows, driven through the full
//! router with all middleware attached:
//!
//! - Registration, login, refresh, logout
//! - Server-side sessions
//! - TOTP enrollment and verification
//! - Magic links
//! - Passkeys
//! - OAuth authorization redirects
//!
//! ## Test Categories
//!
//! - `test_register_*` / `test_login_*`: Credential flows
//! - `test_refresh_*` / `test_logout_*`: Token lifecycle
//! - `test_session_*`: Server-side sessions
//! - `test_totp_*` / `test_magic_link_*` / `test_passkey_*` / `test_oauth_*`:
//!   Alternative factors and flows

use axum::http::StatusCode;
use keyrack_api::auth::webauthn::sign_challenge;
use keyrack_tests::prelude::*;
use serde_json::json;

// =============================================================================
// Public Endpoints
// =============================================================================

#[tokio::test]
async fn test_health_and_ready_are_public() {
    init_test_logging();
    let app = TestApp::spawn();

    let health = app.get("/health", None).await;
    health.assert_status(StatusCode::OK);

    let ready = app.get("/ready", None).await;
    ready.assert_status(StatusCode::OK);
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    let mut config = test_config();
    config.max_body_size = 256;
    let app = TestApp::with_config(config);

    let response = app
        .post(
            "/api/v1/auth/register",
            None,
            json!({
                "username": unique_username("pad"),
                "email": "pad@test.keyrack.dev",
                "password": "x".repeat(1024),
            }),
        )
        .await;
    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
}

// =============================================================================
// Registration
// =============================================================================

#[tokio::test]
async fn test_register_creates_account() {
    let app = TestApp::spawn();
    let username = unique_username("alice");

    let response = app
        .post(
            "/api/v1/auth/register",
            None,
            json!({
                "username": username,
                "email": format!("{}@test.keyrack.dev", username),
                "password": VALID_PASSWORD,
            }),
        )
        .await;

    response.assert_status(StatusCode::CREATED);
    let data = response.data();
    assert_eq!(data["username"], username);
    // The profile never exposes the password hash
    assert!(data.get("password_hash").is_none());
}

#[tokio::test]
async fn test_register_duplicate_username_conflicts() {
    let app = TestApp::spawn();
    let username = unique_username("bob");
    app.register(&username, VALID_PASSWORD).await;

    let response = app
        .post(
            "/api/v1/auth/register",
            None,
            json!({
                "username": username,
                "email": format!("{}-other@test.keyrack.dev", username),
                "password": VALID_PASSWORD,
            }),
        )
        .await;

    response.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_register_rejects_invalid_input() {
    let app = TestApp::spawn();

    // Bad email
    let response = app
        .post(
            "/api/v1/auth/register",
            None,
            json!({
                "username": unique_username("carol"),
                "email": "not-an-email",
                "password": VALID_PASSWORD,
            }),
        )
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    // Password too short
    let response = app
        .post(
            "/api/v1/auth/register",
            None,
            json!({
                "username": unique_username("dave"),
                "email": "dave@test.keyrack.dev",
                "password": "short",
            }),
        )
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

// =============================================================================
// Login
// =============================================================================

#[tokio::test]
async fn test_login_returns_token_pair() {
    let app = TestApp::spawn();

    let response = app
        .post(
            "/api/v1/auth/login",
            None,
            json!({ "username": demo::ADMIN.0, "password": demo::ADMIN.1 }),
        )
        .await;

    response.assert_status(StatusCode::OK);
    let data = response.data();
    assert_eq!(data["token_type"], "Bearer");
    assert!(data["token"].as_str().is_some());
    assert!(data["refresh_token"].as_str().is_some());
    assert!(data["expires_in"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn test_login_accepts_email_as_identifier() {
    let app = TestApp::spawn();

    let response = app
        .post(
            "/api/v1/auth/login",
            None,
            json!({ "username": "admin@keyrack.dev", "password": demo::ADMIN.1 }),
        )
        .await;

    response.assert_status(StatusCode::OK);
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = TestApp::spawn();

    let wrong_password = app
        .post(
            "/api/v1/auth/login",
            None,
            json!({ "username": demo::ADMIN.0, "password": "definitely-wrong" }),
        )
        .await;
    wrong_password.assert_status(StatusCode::UNAUTHORIZED);

    let unknown_user = app
        .post(
            "/api/v1/auth/login",
            None,
            json!({ "username": "no-such-user", "password": "definitely-wrong" }),
        )
        .await;
    unknown_user.assert_status(StatusCode::UNAUTHORIZED);

    // Same message either way, so usernames cannot be probed
    assert_eq!(wrong_password.error(), unknown_user.error());
}

// =============================================================================
// Current User
// =============================================================================

#[tokio::test]
async fn test_me_requires_authentication() {
    let app = TestApp::spawn();

    let response = app.get("/api/v1/auth/me", None).await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_returns_identity() {
    let app = TestApp::spawn();
    let token = app.login(demo::ADMIN.0, demo::ADMIN.1).await;

    let response = app.get("/api/v1/auth/me", Some(&token)).await;
    response.assert_status(StatusCode::OK);

    let data = response.data();
    assert!(data["user_id"].as_str().is_some());
    assert!(data["roles"]
        .as_array()
        .unwrap()
        .iter()
        .any(|r| r == "admin"));
    assert_eq!(data["method"], "jwt");
}

// =============================================================================
// Refresh and Logout
// =============================================================================

#[tokio::test]
async fn test_refresh_rotates_tokens() {
    let app = TestApp::spawn();
    let (_, refresh) = app.login_with_refresh(demo::MEMBER.0, demo::MEMBER.1).await;

    let response = app
        .post("/api/v1/auth/refresh", None, json!({ "refresh_token": refresh }))
        .await;
    response.assert_status(StatusCode::OK);

    // The new access token authenticates
    let new_token = response.data()["token"].as_str().unwrap().to_string();
    let me = app.get("/api/v1/auth/me", Some(&new_token)).await;
    me.assert_status(StatusCode::OK);

    // The consumed refresh token is revoked
    let replay = app
        .post("/api/v1/auth/refresh", None, json!({ "refresh_token": refresh }))
        .await;
    replay.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_rejects_access_token() {
    let app = TestApp::spawn();
    let (access, _) = app.login_with_refresh(demo::MEMBER.0, demo::MEMBER.1).await;

    let response = app
        .post("/api/v1/auth/refresh", None, json!({ "refresh_token": access }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_revokes_refresh_token() {
    let app = TestApp::spawn();
    let (access, refresh) = app.login_with_refresh(demo::MEMBER.0, demo::MEMBER.1).await;

    let response = app
        .post(
            "/api/v1/auth/logout",
            Some(&access),
            json!({ "refresh_token": refresh }),
        )
        .await;
    response.assert_status(StatusCode::OK);

    let replay = app
        .post("/api/v1/auth/refresh", None, json!({ "refresh_token": refresh }))
        .await;
    replay.assert_status(StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Password Change
// =============================================================================

#[tokio::test]
async fn test_change_password_flow() {
    let app = TestApp::spawn();
    let username = unique_username("erin");
    app.register(&username, VALID_PASSWORD).await;
    let token = app.login(&username, VALID_PASSWORD).await;

    let new_password = "a-brand-new-password-42";

    // Wrong current password is rejected
    let rejected = app
        .post(
            "/api/v1/auth/change-password",
            Some(&token),
            json!({ "current_password": "wrong", "new_password": new_password }),
        )
        .await;
    rejected.assert_status(StatusCode::UNAUTHORIZED);

    // Correct current password succeeds
    let accepted = app
        .post(
            "/api/v1/auth/change-password",
            Some(&token),
            json!({ "current_password": VALID_PASSWORD, "new_password": new_password }),
        )
        .await;
    accepted.assert_status(StatusCode::OK);

    // Old credential no longer works, new one does
    let old = app
        .post(
            "/api/v1/auth/login",
            None,
            json!({ "username": username, "password": VALID_PASSWORD }),
        )
        .await;
    old.assert_status(StatusCode::UNAUTHORIZED);

    app.login(&username, new_password).await;
}

#[tokio::test]
async fn test_change_password_rejects_unchanged_password() {
    let app = TestApp::spawn();
    let username = unique_username("frank");
    app.register(&username, VALID_PASSWORD).await;
    let token = app.login(&username, VALID_PASSWORD).await;

    let response = app
        .post(
            "/api/v1/auth/change-password",
            Some(&token),
            json!({ "current_password": VALID_PASSWORD, "new_password": VALID_PASSWORD }),
        )
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    // The credential is untouched
    app.login(&username, VALID_PASSWORD).await;
}

// =============================================================================
// Sessions
// =============================================================================

#[tokio::test]
async fn test_session_create_and_inspect() {
    let app = TestApp::spawn();

    let created = app
        .post(
            "/api/v1/sessions",
            None,
            json!({ "username": demo::VIEWER.0, "password": demo::VIEWER.1 }),
        )
        .await;
    created.assert_status(StatusCode::CREATED);
    let session_id = created.data()["session_id"].as_str().unwrap().to_string();

    let current = app
        .request_with_session(
            axum::http::Method::GET,
            "/api/v1/sessions/current",
            &session_id,
            None,
        )
        .await;
    current.assert_status(StatusCode::OK);
    assert_eq!(current.data()["id"], session_id.as_str());
}

#[tokio::test]
async fn test_session_create_rejects_bad_credentials() {
    let app = TestApp::spawn();

    let response = app
        .post(
            "/api/v1/sessions",
            None,
            json!({ "username": demo::VIEWER.0, "password": "nope" }),
        )
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_revocation() {
    let app = TestApp::spawn();

    let created = app
        .post(
            "/api/v1/sessions",
            None,
            json!({ "username": demo::VIEWER.0, "password": demo::VIEWER.1 }),
        )
        .await;
    let session_id = created.data()["session_id"].as_str().unwrap().to_string();

    let revoked = app
        .request_with_session(
            axum::http::Method::DELETE,
            "/api/v1/sessions/current",
            &session_id,
            None,
        )
        .await;
    revoked.assert_status(StatusCode::OK);

    // Revoked session no longer authenticates
    let after = app
        .request_with_session(
            axum::http::Method::GET,
            "/api/v1/sessions/current",
            &session_id,
            None,
        )
        .await;
    after.assert_status(StatusCode::UNAUTHORIZED);
}

// =============================================================================
// TOTP
// =============================================================================

#[tokio::test]
async fn test_totp_enrollment_lifecycle() {
    let app = TestApp::spawn();
    let token = app.login(demo::MEMBER.0, demo::MEMBER.1).await;

    let me = app.get("/api/v1/auth/me", Some(&token)).await;
    let user_id = me.data()["user_id"].as_str().unwrap().to_string();

    // Enroll
    let enrolled = app.post("/api/v1/totp/enroll", Some(&token), json!({})).await;
    enrolled.assert_status(StatusCode::CREATED);
    let data = enrolled.data();
    assert!(!data["secret"].as_str().unwrap().is_empty());
    assert!(data["otpauth_url"].as_str().unwrap().starts_with("otpauth://"));

    // Pending but not yet activated
    let status = app.get("/api/v1/totp", Some(&token)).await;
    assert_eq!(status.data()["enrolled"], true);
    assert_eq!(status.data()["activated"], false);

    // Activate with the current code
    let code = app.state.totp_manager.current_code(&user_id).unwrap();
    let activated = app
        .post("/api/v1/totp/activate", Some(&token), json!({ "code": code }))
        .await;
    activated.assert_status(StatusCode::OK);

    let status = app.get("/api/v1/totp", Some(&token)).await;
    assert_eq!(status.data()["activated"], true);

    // Verify a fresh code
    let code = app.state.totp_manager.current_code(&user_id).unwrap();
    let verified = app
        .post("/api/v1/totp/verify", Some(&token), json!({ "code": code }))
        .await;
    verified.assert_status(StatusCode::OK);

    // Re-enrolling an activated factor conflicts
    let again = app.post("/api/v1/totp/enroll", Some(&token), json!({})).await;
    again.assert_status(StatusCode::CONFLICT);

    // Remove is idempotent
    let removed = app.delete("/api/v1/totp", Some(&token)).await;
    assert_eq!(removed.data()["removed"], true);
    let removed = app.delete("/api/v1/totp", Some(&token)).await;
    assert_eq!(removed.data()["removed"], false);
}

#[tokio::test]
async fn test_totp_rejects_wrong_code() {
    let app = TestApp::spawn();
    let token = app.login(demo::MEMBER.0, demo::MEMBER.1).await;

    app.post("/api/v1/totp/enroll", Some(&token), json!({})).await;

    let response = app
        .post("/api/v1/totp/activate", Some(&token), json!({ "code": "000000" }))
        .await;
    assert_ne!(response.status, StatusCode::OK);
}

// =============================================================================
// Magic Links
// =============================================================================

#[tokio::test]
async fn test_magic_link_issue_and_redeem() {
    let app = TestApp::spawn();

    let issued = app
        .post(
            "/api/v1/magic-links",
            None,
            json!({ "email": "member@keyrack.dev" }),
        )
        .await;
    issued.assert_status(StatusCode::OK);
    let token = issued.data()["token"].as_str().unwrap().to_string();

    let redeemed = app
        .post("/api/v1/magic-links/redeem", None, json!({ "token": token }))
        .await;
    redeemed.assert_status(StatusCode::OK);
    assert!(redeemed.data()["token"].as_str().is_some());

    // Single use
    let replay = app
        .post("/api/v1/magic-links/redeem", None, json!({ "token": token }))
        .await;
    replay.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_magic_link_does_not_leak_accounts() {
    let app = TestApp::spawn();

    let known = app
        .post(
            "/api/v1/magic-links",
            None,
            json!({ "email": "member@keyrack.dev" }),
        )
        .await;
    known.assert_status(StatusCode::OK);

    let unknown = app
        .post(
            "/api/v1/magic-links",
            None,
            json!({ "email": "ghost@keyrack.dev" }),
        )
        .await;
    unknown.assert_status(StatusCode::OK);

    // Same acknowledgement message; only the playground token differs
    assert_eq!(known.data()["message"], unknown.data()["message"]);
    assert!(unknown.data().get("token").map_or(true, |t| t.is_null()));
}

// =============================================================================
// Passkeys
// =============================================================================

const PASSKEY_MATERIAL: &str = "test-passkey-key-material";

/// Runs the full registration ceremony and returns the credential ID.
async fn register_passkey(app: &TestApp, token: &str) -> String {
    let start = app
        .post("/api/v1/passkeys/register/start", Some(token), json!({}))
        .await;
    start.assert_status(StatusCode::OK);
    let challenge = start.data()["challenge"].as_str().unwrap().to_string();

    let credential_id = format!("cred-{}", uuid::Uuid::now_v7().simple());
    let finish = app
        .post(
            "/api/v1/passkeys/register/finish",
            Some(token),
            json!({
                "challenge": challenge,
                "credential_id": credential_id,
                "public_key": PASSKEY_MATERIAL,
            }),
        )
        .await;
    finish.assert_status(StatusCode::CREATED);
    credential_id
}

#[tokio::test]
async fn test_passkey_registration_and_login() {
    let app = TestApp::spawn();
    let token = app.login(demo::MEMBER.0, demo::MEMBER.1).await;
    let credential_id = register_passkey(&app, &token).await;

    // The credential is listed
    let listed = app.get("/api/v1/passkeys", Some(&token)).await;
    assert!(listed.data()["credentials"]
        .as_array()
        .unwrap()
        .iter()
        .any(|c| c == credential_id.as_str()));

    // Assertion ceremony
    let start = app
        .post(
            "/api/v1/passkeys/login/start",
            None,
            json!({ "username": demo::MEMBER.0 }),
        )
        .await;
    start.assert_status(StatusCode::OK);
    let challenge = start.data()["challenge"].as_str().unwrap().to_string();
    assert!(start.data()["allow_credentials"]
        .as_array()
        .unwrap()
        .iter()
        .any(|c| c == credential_id.as_str()));

    let signature = sign_challenge(PASSKEY_MATERIAL, &challenge).unwrap();
    let finish = app
        .post(
            "/api/v1/passkeys/login/finish",
            None,
            json!({
                "challenge": challenge,
                "credential_id": credential_id,
                "signature": signature,
                "counter": 1,
            }),
        )
        .await;
    finish.assert_status(StatusCode::OK);
    assert!(finish.data()["token"].as_str().is_some());
}

#[tokio::test]
async fn test_passkey_unknown_user_still_gets_challenge() {
    let app = TestApp::spawn();

    let start = app
        .post(
            "/api/v1/passkeys/login/start",
            None,
            json!({ "username": "no-such-user" }),
        )
        .await;
    start.assert_status(StatusCode::OK);
    assert!(!start.data()["challenge"].as_str().unwrap().is_empty());
    assert!(start.data()["allow_credentials"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_passkey_counter_regression_rejected() {
    let app = TestApp::spawn();
    let token = app.login(demo::MEMBER.0, demo::MEMBER.1).await;
    let credential_id = register_passkey(&app, &token).await;

    // First assertion at counter 5
    let start = app
        .post(
            "/api/v1/passkeys/login/start",
            None,
            json!({ "username": demo::MEMBER.0 }),
        )
        .await;
    let challenge = start.data()["challenge"].as_str().unwrap().to_string();
    let signature = sign_challenge(PASSKEY_MATERIAL, &challenge).unwrap();
    app.post(
        "/api/v1/passkeys/login/finish",
        None,
        json!({
            "challenge": challenge,
            "credential_id": credential_id,
            "signature": signature,
            "counter": 5,
        }),
    )
    .await
    .assert_status(StatusCode::OK);

    // A replayed counter signals a cloned authenticator and is refused
    let start = app
        .post(
            "/api/v1/passkeys/login/start",
            None,
            json!({ "username": demo::MEMBER.0 }),
        )
        .await;
    let challenge = start.data()["challenge"].as_str().unwrap().to_string();
    let signature = sign_challenge(PASSKEY_MATERIAL, &challenge).unwrap();
    let regressed = app
        .post(
            "/api/v1/passkeys/login/finish",
            None,
            json!({
                "challenge": challenge,
                "credential_id": credential_id,
                "signature": signature,
                "counter": 5,
            }),
        )
        .await;
    regressed.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_passkey_cannot_remove_someone_elses_credential() {
    let app = TestApp::spawn();
    let member_token = app.login(demo::MEMBER.0, demo::MEMBER.1).await;
    let credential_id = register_passkey(&app, &member_token).await;

    let viewer_token = app.login(demo::VIEWER.0, demo::VIEWER.1).await;
    let response = app
        .delete(
            &format!("/api/v1/passkeys/{}", credential_id),
            Some(&viewer_token),
        )
        .await;
    // 404, not 403: the endpoint does not confirm the credential exists
    response.assert_status(StatusCode::NOT_FOUND);
}

// =============================================================================
// OAuth
// =============================================================================

#[tokio::test]
async fn test_oauth_provider_listing() {
    let app = TestApp::spawn();
    let token = app.login(demo::VIEWER.0, demo::VIEWER.1).await;

    let response = app.get("/api/v1/oauth/providers", Some(&token)).await;
    response.assert_status(StatusCode::OK);
    assert!(response.data()["providers"]
        .as_array()
        .unwrap()
        .iter()
        .any(|p| p == "acme"));
}

#[tokio::test]
async fn test_oauth_authorize_builds_redirect() {
    let app = TestApp::spawn();

    let response = app.get("/api/v1/oauth/acme/authorize", None).await;
    response.assert_status(StatusCode::OK);

    let data = response.data();
    let url = data["url"].as_str().unwrap();
    assert!(url.starts_with("https://acme.invalid/oauth/authorize"));
    assert!(url.contains("state="));
    assert!(url.contains("client_id=keyrack-test-client"));
    assert!(!data["state"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_oauth_unknown_provider_not_found() {
    let app = TestApp::spawn();

    let response = app.get("/api/v1/oauth/nope/authorize", None).await;
    response.assert_status(StatusCode::NOT_FOUND);
}
