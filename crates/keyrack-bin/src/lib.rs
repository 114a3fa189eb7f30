// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # keyrack-bin
//!
//! CLI binary for the keyrack authentication and authorization playground.
//!
//! This crate provides the main binary entry point for keyrack, including:
//!
//! - CLI argument parsing with clap
//! - Server runtime orchestration
//! - Graceful shutdown handling
//! - Logging initialization
//! - Command implementations (run, validate, version, gen-secret, health)
//!
//! ## Usage
//!
//! ```bash
//! # Start the server (default command)
//! keyrack
//!
//! # Start with custom config
//! keyrack -c /etc/keyrack/keyrack.toml
//!
//! # Validate configuration
//! keyrack validate
//!
//! # Show version
//! keyrack version
//!
//! # Generate a signing secret
//! keyrack gen-secret
//!
//! # Check a running instance
//! keyrack health
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod shutdown;

// =============================================================================
// Re-exports
// =============================================================================

pub use cli::{Cli, Commands};
pub use error::{BinError, BinResult};
pub use logging::init_logging;
pub use runtime::{RuntimeBuilder, ServiceRuntime};
pub use shutdown::{ShutdownCoordinator, ShutdownSignal};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
