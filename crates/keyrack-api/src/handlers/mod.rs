// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! HTTP request handlers.
//!
//! Handlers are thin: they validate input, call the managers and engines on
//! [`AppState`](crate::state::AppState), and wrap the result in the response
//! envelope. Authentication and permission gates live in the middleware and
//! router, not here.

mod auth;
mod authz;
mod health;
mod magic_link;
mod oauth;
mod session;
mod totp;
mod webauthn;

pub use auth::*;
pub use authz::*;
pub use health::*;
pub use magic_link::*;
pub use oauth::*;
pub use session::*;
pub use totp::*;
pub use webauthn::*;
