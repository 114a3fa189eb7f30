// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Authentication flows.
//!
//! This module provides:
//! - JWT token management and validation
//! - Server-side sessions with sliding renewal
//! - TOTP two-factor enrollment
//! - Single-use magic links
//! - WebAuthn-style passkeys
//! - OAuth2-style social login
//! - Authentication context

mod claims;
mod context;
mod jwt;
pub mod magic_link;
pub mod oauth;
pub mod session;
pub mod totp;
pub mod webauthn;

pub use claims::{Claims, ClaimsBuilder, TokenUse};
pub use context::{AuthContext, AuthMethod};
pub use jwt::{JwtConfig, JwtManager, TokenPair};
pub use magic_link::{MagicLinkConfig, MagicLinkManager, MagicLinkRecord};
pub use oauth::{
    AuthorizeRedirect, HttpProviderClient, OAuthConfig, OAuthManager, OAuthProvider,
    ProviderClient, ProviderTokens, ProviderUser,
};
pub use session::{SessionConfig, SessionManager, SessionRecord};
pub use totp::{TotpConfig, TotpManager, TotpProvisioning};
pub use webauthn::{
    AssertionError, AssertionVerifier, HmacAssertionVerifier, PasskeyConfig, PasskeyCredential,
    PasskeyManager,
};
