// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! In-process HTTP harness.
//!
//! [`TestApp`] builds the full router (all middleware included) and drives
//! it with `tower::ServiceExt::oneshot`, so tests exercise the same stack
//! a live server would without binding a socket. The underlying
//! [`AppState`] is kept alongside the router for white-box assertions,
//! like reading the current TOTP code during an enrollment test.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use keyrack_api::{ApiConfig, ApiServer, AppState};

use super::fixtures::test_config;

// =============================================================================
// TestApp
// =============================================================================

/// An in-process instance of the full API.
pub struct TestApp {
    /// The application state backing the router.
    pub state: AppState,
    router: Router,
}

impl TestApp {
    /// Builds an app with the default test configuration.
    pub fn spawn() -> Self {
        Self::with_config(test_config())
    }

    /// Builds an app with a custom configuration.
    pub fn with_config(config: ApiConfig) -> Self {
        let state = AppState::builder()
            .config(config)
            .build()
            .expect("failed to build test state");
        let router = ApiServer::new(state.clone()).router();
        Self { state, router }
    }

    /// Sends a request and collects the JSON response.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json");

        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let body = match body {
            Some(value) => Body::from(serde_json::to_vec(&value).expect("serialize body")),
            None => Body::empty(),
        };

        let request = builder.body(body).expect("build request");
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router never fails");

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("collect body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }

    /// Sends a request authenticated with an `X-Session-Id` header.
    pub async fn request_with_session(
        &self,
        method: Method,
        path: &str,
        session_id: &str,
        body: Option<Value>,
    ) -> TestResponse {
        let builder = Request::builder()
            .method(method)
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .header("X-Session-Id", session_id);

        let body = match body {
            Some(value) => Body::from(serde_json::to_vec(&value).expect("serialize body")),
            None => Body::empty(),
        };

        let request = builder.body(body).expect("build request");
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router never fails");

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("collect body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }

    /// GET without a body.
    pub async fn get(&self, path: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, path, token, None).await
    }

    /// POST with a JSON body.
    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::POST, path, token, Some(body)).await
    }

    /// PUT with a JSON body.
    pub async fn put(&self, path: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::PUT, path, token, Some(body)).await
    }

    /// DELETE without a body.
    pub async fn delete(&self, path: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::DELETE, path, token, None).await
    }

    /// Logs in and returns the access token.
    ///
    /// Panics if the credentials are rejected; use the raw endpoints for
    /// negative login tests.
    pub async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .post(
                "/api/v1/auth/login",
                None,
                serde_json::json!({ "username": username, "password": password }),
            )
            .await;
        assert_eq!(
            response.status,
            StatusCode::OK,
            "login failed: {}",
            response.body
        );
        response.data()["token"]
            .as_str()
            .expect("access token in login response")
            .to_string()
    }

    /// Logs in and returns the full token pair `(access, refresh)`.
    pub async fn login_with_refresh(&self, username: &str, password: &str) -> (String, String) {
        let response = self
            .post(
                "/api/v1/auth/login",
                None,
                serde_json::json!({ "username": username, "password": password }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK);
        let data = response.data();
        (
            data["token"].as_str().expect("access token").to_string(),
            data["refresh_token"]
                .as_str()
                .expect("refresh token")
                .to_string(),
        )
    }

    /// Registers a fresh user and returns `(username, email)`.
    pub async fn register(&self, username: &str, password: &str) -> (String, String) {
        let email = format!("{}@test.keyrack.dev", username);
        let response = self
            .post(
                "/api/v1/auth/register",
                None,
                serde_json::json!({
                    "username": username,
                    "email": email,
                    "password": password,
                }),
            )
            .await;
        assert_eq!(
            response.status,
            StatusCode::CREATED,
            "register failed: {}",
            response.body
        );
        (username.to_string(), email)
    }
}

// =============================================================================
// TestResponse
// =============================================================================

/// A collected response: status plus decoded JSON envelope.
pub struct TestResponse {
    /// HTTP status code.
    pub status: StatusCode,
    /// Decoded response body. `Null` when the body was empty.
    pub body: Value,
}

impl TestResponse {
    /// Returns the `data` field of a success envelope.
    ///
    /// Panics if the envelope indicates failure.
    pub fn data(&self) -> &Value {
        assert_eq!(
            self.body["success"],
            Value::Bool(true),
            "expected success envelope, got: {}",
            self.body
        );
        &self.body["data"]
    }

    /// Returns the error message of a failure envelope.
    pub fn error(&self) -> &str {
        assert_eq!(
            self.body["success"],
            Value::Bool(false),
            "expected error envelope, got: {}",
            self.body
        );
        self.body["error"]["message"]
            .as_str()
            .expect("error message")
    }

    /// Returns the error code of a failure envelope.
    pub fn error_code(&self) -> &str {
        self.body["error"]["code"].as_str().expect("error code")
    }

    /// Asserts the response carries the given status.
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status, expected,
            "unexpected status, body: {}",
            self.body
        );
        self
    }
}
