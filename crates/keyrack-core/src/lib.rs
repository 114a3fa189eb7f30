// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # keyrack-core
//!
//! Core domain library for keyrack, an authentication and authorization
//! playground service.
//!
//! This crate contains everything the HTTP layer builds on:
//!
//! - **Types**: [`User`], [`UserId`] and related domain records
//! - **Passwords**: Argon2id hashing and the password policy
//! - **Stores**: the [`UserStore`] trait with a thread-safe in-memory
//!   implementation
//! - **Audit**: structured audit logging behind the [`AuditLogger`] trait
//! - **Errors**: the [`CoreError`] hierarchy
//!
//! # Example
//!
//! ```rust,ignore
//! use keyrack_core::{InMemoryUserStore, PasswordHasher, User, UserStore};
//!
//! let hasher = PasswordHasher::new();
//! let store = InMemoryUserStore::new();
//!
//! let user = User::new("alice", "alice@example.com")
//!     .with_password_hash(hasher.hash("a strong password")?);
//! store.create(user).await?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod audit;
pub mod error;
pub mod password;
pub mod store;
pub mod types;

// Re-export the most commonly used types at the crate root.
pub use audit::{
    ActionResult, AuditAction, AuditContext, AuditFilter, AuditLog, AuditLogger, AuditResource,
    AuditSeverity, InMemoryAuditLogger, NoOpAuditLogger,
};
pub use error::{CoreError, CoreResult, PasswordError, StoreError, StoreResult};
pub use password::PasswordHasher;
pub use store::{InMemoryUserStore, UserStore};
pub use types::{User, UserId, UserProfile};

/// The library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
