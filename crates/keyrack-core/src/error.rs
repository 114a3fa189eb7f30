// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Unified error hierarchy for keyrack.
//!
//! This module defines the error type system shared by the core library:
//!
//! - Provides clear, descriptive error messages
//! - Supports error chaining for traceability
//! - Distinguishes between client mistakes and server faults
//! - Supports structured logging
//!
//! # Error Hierarchy
//!
//! ```text
//! CoreError (root)
//! ├── StoreError      - Record store operations
//! ├── PasswordError   - Password hashing and verification
//! └── AuditError      - Audit logging (defined in the audit module)
//! ```

use std::fmt;
use thiserror::Error;

use crate::audit::AuditError;

// =============================================================================
// CoreError - Root Error Type
// =============================================================================

/// The root error type for keyrack's core library.
///
/// All errors in the core crate can be converted to this type, providing a
/// unified error handling interface for the API layer above.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Record store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Password hashing/verification error.
    #[error("Password error: {0}")]
    Password(#[from] PasswordError),

    /// Audit logging error.
    #[error("Audit error: {0}")]
    Audit(#[from] AuditError),
}

impl CoreError {
    /// Returns the error type as a string for logging/metrics.
    pub fn error_type(&self) -> &'static str {
        match self {
            CoreError::Store(_) => "store",
            CoreError::Password(_) => "password",
            CoreError::Audit(_) => "audit",
        }
    }

    /// Returns a user-friendly error message.
    ///
    /// This message is suitable for display to end users and avoids
    /// exposing internal implementation details.
    pub fn user_message(&self) -> String {
        match self {
            CoreError::Store(e) => e.user_message(),
            CoreError::Password(_) => "Credential processing failed".to_string(),
            CoreError::Audit(_) => "Audit logging failed".to_string(),
        }
    }
}

// =============================================================================
// StoreError
// =============================================================================

/// Record store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Record not found.
    #[error("Record not found: {kind}/{id}")]
    NotFound {
        /// The record kind (user, session, policy, ...).
        kind: String,
        /// The record identifier.
        id: String,
    },

    /// Record already exists.
    #[error("Record already exists: {kind}/{id}")]
    Conflict {
        /// The record kind.
        kind: String,
        /// The conflicting identifier.
        id: String,
    },

    /// Store capacity exceeded.
    #[error("Store capacity exceeded: {current}/{max} records")]
    CapacityExceeded {
        /// Current record count.
        current: usize,
        /// Maximum record count.
        max: usize,
    },

    /// Backend failure.
    #[error("Store backend error: {message}")]
    Backend {
        /// Error message.
        message: String,
        /// Underlying error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl StoreError {
    /// Creates a not found error.
    pub fn not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// Creates a conflict error.
    pub fn conflict(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self::Conflict {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// Creates a backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a backend error with a source.
    pub fn backend_with<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns `true` if the error indicates a missing record.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    /// Returns the error type for logging/metrics.
    pub fn error_type(&self) -> &'static str {
        match self {
            StoreError::NotFound { .. } => "not_found",
            StoreError::Conflict { .. } => "conflict",
            StoreError::CapacityExceeded { .. } => "capacity_exceeded",
            StoreError::Backend { .. } => "backend",
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            StoreError::NotFound { kind, .. } => format!("{} not found", kind),
            StoreError::Conflict { kind, .. } => format!("{} already exists", kind),
            StoreError::CapacityExceeded { current, max } => {
                format!("Store capacity exceeded ({}/{})", current, max)
            }
            StoreError::Backend { .. } => "A storage error occurred".to_string(),
        }
    }
}

// =============================================================================
// PasswordError
// =============================================================================

/// Password hashing and verification errors.
#[derive(Debug, Error)]
pub enum PasswordError {
    /// Hashing failed.
    #[error("Password hashing failed: {message}")]
    HashFailed {
        /// Error message.
        message: String,
    },

    /// The stored hash could not be parsed.
    #[error("Invalid password hash")]
    InvalidHash,

    /// Verification failed (wrong password).
    #[error("Password verification failed")]
    VerifyFailed,

    /// Password violates the policy.
    #[error("Password policy violation: {message}")]
    PolicyViolation {
        /// Error message.
        message: String,
    },
}

impl PasswordError {
    /// Creates a hash failed error.
    pub fn hash_failed(message: impl Into<String>) -> Self {
        Self::HashFailed {
            message: message.into(),
        }
    }

    /// Creates a policy violation error.
    pub fn policy(message: impl Into<String>) -> Self {
        Self::PolicyViolation {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a wrong-password failure rather than an
    /// internal fault.
    pub fn is_mismatch(&self) -> bool {
        matches!(self, PasswordError::VerifyFailed)
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// A Result type with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

/// A Result type with StoreError.
pub type StoreResult<T> = Result<T, StoreError>;

/// A Result type with PasswordError.
pub type PasswordResult<T> = Result<T, PasswordError>;

// =============================================================================
// Error Context Extension
// =============================================================================

/// Extension trait for adding context to errors.
pub trait ErrorContext<T, E> {
    /// Adds context to an error.
    fn context(self, message: impl Into<String>) -> Result<T, ContextError<E>>;

    /// Adds context using a closure.
    fn with_context<F, M>(self, f: F) -> Result<T, ContextError<E>>
    where
        F: FnOnce() -> M,
        M: Into<String>;
}

impl<T, E: std::error::Error> ErrorContext<T, E> for Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T, ContextError<E>> {
        self.map_err(|e| ContextError {
            message: message.into(),
            source: e,
        })
    }

    fn with_context<F, M>(self, f: F) -> Result<T, ContextError<E>>
    where
        F: FnOnce() -> M,
        M: Into<String>,
    {
        self.map_err(|e| ContextError {
            message: f().into(),
            source: e,
        })
    }
}

/// An error with additional context.
#[derive(Debug)]
pub struct ContextError<E> {
    message: String,
    source: E,
}

impl<E: std::error::Error> fmt::Display for ContextError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.message, self.source)
    }
}

impl<E: std::error::Error + 'static> std::error::Error for ContextError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_not_found() {
        let error = StoreError::not_found("user", "u-123");
        assert!(error.is_not_found());
        assert_eq!(error.error_type(), "not_found");
    }

    #[test]
    fn test_store_error_conflict() {
        let error = StoreError::conflict("user", "alice");
        assert!(!error.is_not_found());
        assert!(error.to_string().contains("alice"));
    }

    #[test]
    fn test_core_error_conversion() {
        let store_error = StoreError::not_found("session", "s-1");
        let core_error: CoreError = store_error.into();
        assert_eq!(core_error.error_type(), "store");
    }

    #[test]
    fn test_password_error_mismatch() {
        assert!(PasswordError::VerifyFailed.is_mismatch());
        assert!(!PasswordError::InvalidHash.is_mismatch());
    }

    #[test]
    fn test_error_context() {
        let result: Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "missing"));

        let with_context = result.context("Failed to load users");
        let error = with_context.unwrap_err();
        assert!(error.to_string().contains("Failed to load users"));
    }
}
