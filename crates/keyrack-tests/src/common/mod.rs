// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Common Test Utilities
//!
//! This module provides shared test utilities and helpers for integration
//! tests.
//!
//! ## Module Structure
//!
//! - `fixtures`: Pre-built configurations and demo credentials
//! - `harness`: In-process HTTP harness for driving the router

pub mod fixtures;
pub mod harness;

// Re-exports for convenience
pub use fixtures::*;
pub use harness::*;

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Initialize test logging. Call this at the start of each test module.
pub fn init_test_logging() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("warn,keyrack=debug")),
            )
            .with_test_writer()
            .init();
    });
}

/// Generate a unique username for test isolation.
pub fn unique_username(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::now_v7().simple())
}
