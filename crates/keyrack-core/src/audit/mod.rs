// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Audit logging for security and compliance.
//!
//! Every authentication attempt, token event, and authorization change in
//! keyrack produces an audit entry. The logging system is designed around a
//! small set of principles:
//!
//! - **Extensibility**: New logger implementations can be added via the
//!   [`AuditLogger`] trait
//! - **Queryability**: Loggers may support filtered queries over past entries
//! - **Safety**: Sensitive values are masked before they reach a logger
//!
//! # Components
//!
//! - [`AuditLogger`]: Core trait for audit logger implementations
//! - [`AuditLog`]: Structured audit log entry with rich metadata
//! - [`InMemoryAuditLogger`]: Capacity-bound logger used by the playground
//! - [`NoOpAuditLogger`]: Discards everything; used when auditing is disabled
//!
//! # Example
//!
//! ```rust,ignore
//! use keyrack_core::audit::{AuditLogger, AuditLog, InMemoryAuditLogger};
//!
//! let logger = InMemoryAuditLogger::with_capacity(10_000);
//! logger.log(AuditLog::login("admin", None, true)).await?;
//! ```

mod error;
mod memory_logger;
mod types;

// Re-export all public types
pub use error::{AuditError, AuditResult};
pub use memory_logger::InMemoryAuditLogger;
pub use types::{
    ActionResult, AuditAction, AuditContext, AuditFilter, AuditLog, AuditLogBuilder,
    AuditResource, AuditSeverity, SensitiveValue,
};

use async_trait::async_trait;

// =============================================================================
// Core Trait
// =============================================================================

/// Trait for audit logger implementations.
///
/// This trait defines the core interface that all audit loggers must implement.
/// It is designed to be async-first and supports both logging and querying.
#[async_trait]
pub trait AuditLogger: Send + Sync {
    /// Logs an audit entry.
    ///
    /// This method should be non-blocking where possible.
    async fn log(&self, entry: AuditLog) -> AuditResult<()>;

    /// Logs multiple audit entries in a batch.
    ///
    /// The default implementation calls `log` for each entry, but implementations
    /// may override this for better performance.
    async fn log_batch(&self, entries: Vec<AuditLog>) -> AuditResult<()> {
        for entry in entries {
            self.log(entry).await?;
        }
        Ok(())
    }

    /// Queries audit logs with the given filter.
    ///
    /// Not all logger implementations support querying; those that don't
    /// return `AuditError::QueryNotSupported`.
    async fn query(&self, filter: AuditFilter) -> AuditResult<Vec<AuditLog>>;

    /// Flushes any buffered logs.
    ///
    /// This should be called before shutdown to ensure all logs are persisted.
    async fn flush(&self) -> AuditResult<()>;

    /// Returns the logger name for identification.
    fn name(&self) -> &str {
        "audit_logger"
    }

    /// Returns `true` if this logger supports querying.
    fn supports_query(&self) -> bool {
        false
    }

    /// Returns `true` if this logger is healthy.
    async fn health_check(&self) -> bool {
        true
    }
}

// =============================================================================
// No-Op Logger
// =============================================================================

/// A no-op audit logger that discards all entries.
///
/// Useful when audit logging is disabled or for testing.
#[derive(Debug, Default, Clone)]
pub struct NoOpAuditLogger;

impl NoOpAuditLogger {
    /// Creates a new no-op logger.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuditLogger for NoOpAuditLogger {
    async fn log(&self, _entry: AuditLog) -> AuditResult<()> {
        Ok(())
    }

    async fn query(&self, _filter: AuditFilter) -> AuditResult<Vec<AuditLog>> {
        Ok(Vec::new())
    }

    async fn flush(&self) -> AuditResult<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "noop"
    }
}

// =============================================================================
// Tests
// =============================================================================
