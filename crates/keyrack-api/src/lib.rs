// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # keyrack-api
//!
//! REST API server for the keyrack authentication and authorization
//! playground.
//!
//! This crate provides the HTTP surface: JWT and session authentication,
//! TOTP, magic links, passkeys, social login, and check endpoints for every
//! authorization model in [`authz`], with rate limiting and audit logging
//! in the middleware stack.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod auth;
pub mod authz;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod server;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use server::{ApiServer, ApiServerBuilder};
pub use state::{AppState, AppStateBuilder};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
