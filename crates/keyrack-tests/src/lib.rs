// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # keyrack Integration Tests
//!
//! This crate provides integration tests for the keyrack authentication
//! and authorization playground. It includes test utilities, fixtures,
//! and an in-process HTTP harness.
//!
//! ## Module Structure
//!
//! - [`common`]: Shared test utilities and helpers
//!   - `fixtures`: Pre-built configurations and demo credentials
//!   - `harness`: In-process HTTP harness built on `tower::ServiceExt`
//!
//! ## Running Tests
//!
//! ```bash
//! # Run all integration tests
//! cargo test -p keyrack-tests
//!
//! # Run specific test suite
//! cargo test -p keyrack-tests --test integration_auth
//! cargo test -p keyrack-tests --test integration_authz
//!
//! # Run with verbose output
//! cargo test -p keyrack-tests -- --nocapture
//! ```
//!
//! ## Test Categories
//!
//! ### Auth Tests (`integration_auth.rs`)
//! - Registration, login, and token refresh
//! - Server-side sessions
//! - TOTP enrollment and verification
//! - Magic links, passkeys, and OAuth
//!
//! ### Authz Tests (`integration_authz.rs`)
//! - RBAC checks and role administration
//! - ABAC rules, PBAC policies, and ACL entries
//! - Scope coverage and tenant membership
//!
//! ## Writing New Tests
//!
//! ```rust,ignore
//! use keyrack_tests::prelude::*;
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let app = TestApp::spawn();
//!     let token = app.login(demo::ADMIN.0, demo::ADMIN.1).await;
//!     let response = app.get("/api/v1/auth/me", Some(&token)).await;
//!     assert_eq!(response.status, axum::http::StatusCode::OK);
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod common;

/// Re-export commonly used items for convenience.
pub mod prelude {
    pub use crate::common::fixtures::*;
    pub use crate::common::harness::*;
    pub use crate::common::{init_test_logging, unique_username};
}
