// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Server runtime orchestration.
//!
//! This module provides the core runtime that wires all keyrack components
//! together:
//!
//! - Configuration loading and validation
//! - Audit logger setup
//! - API server with security middleware
//! - Graceful shutdown coordination

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use keyrack_api::{ApiConfig, ApiServerBuilder};
use keyrack_core::{AuditLog, AuditLogger, InMemoryAuditLogger, NoOpAuditLogger};

use crate::error::{BinError, BinResult};
use crate::shutdown::ShutdownCoordinator;

// =============================================================================
// Configuration Loading
// =============================================================================

/// Loads and parses the configuration file.
pub fn load_config(path: impl AsRef<Path>) -> BinResult<ApiConfig> {
    let path = path.as_ref();

    let raw = std::fs::read_to_string(path).map_err(|e| {
        BinError::Configuration(format!("Failed to read {}: {}", path.display(), e))
    })?;

    let config: ApiConfig = toml::from_str(&raw).map_err(|e| {
        BinError::Configuration(format!("Failed to parse {}: {}", path.display(), e))
    })?;

    Ok(config)
}

// =============================================================================
// ServiceRuntime
// =============================================================================

/// The main runtime that orchestrates the keyrack server.
///
/// The runtime is responsible for:
/// - Validating the configuration
/// - Initializing components in the correct order
/// - Running the API server
/// - Coordinating graceful shutdown
pub struct ServiceRuntime {
    config: ApiConfig,
    shutdown: ShutdownCoordinator,
}

impl ServiceRuntime {
    /// Creates a new runtime from a validated configuration.
    pub fn new(config: ApiConfig) -> Self {
        Self {
            config,
            shutdown: ShutdownCoordinator::new(),
        }
    }

    /// Returns a handle to the shutdown coordinator.
    pub fn shutdown_coordinator(&self) -> ShutdownCoordinator {
        self.shutdown.clone()
    }

    /// Runs the server until shutdown is signaled.
    pub async fn run(self) -> BinResult<()> {
        info!("Starting keyrack v{}", keyrack_core::VERSION);

        self.config
            .validate()
            .map_err(BinError::Configuration)?;

        // Audit logger
        let audit_logger = self.create_audit_logger();

        // API server
        let addr = self.config.socket_addr();
        let server = ApiServerBuilder::new()
            .config(self.config.clone())
            .audit_logger(audit_logger.clone())
            .build()?;

        // Log startup
        let startup_log = AuditLog::system_start(keyrack_core::VERSION).with_details(
            serde_json::json!({
                "bind_address": addr.to_string(),
                "seed_demo_users": self.config.seed_demo_users,
                "oauth_providers": self.config.oauth.providers.len(),
            }),
        );
        if let Err(e) = audit_logger.log(startup_log).await {
            warn!("Failed to log startup event: {}", e);
        }

        // Wait for OS signals in the background, then drive the server's
        // graceful shutdown from the same coordinator.
        let signal = self.shutdown.shutdown_signal();
        let coordinator = self.shutdown.clone();
        tokio::spawn(async move {
            coordinator.wait_for_shutdown().await;
        });

        info!("keyrack is ready ({})", addr);
        let result = server.run_with_shutdown(signal.wait()).await;

        // Log shutdown
        let shutdown_log = AuditLog::system_shutdown(Some("Shutdown signal received".to_string()));
        if let Err(e) = audit_logger.log(shutdown_log).await {
            warn!("Failed to log shutdown event: {}", e);
        }

        info!("keyrack shutdown complete");

        result.map_err(BinError::from)
    }

    /// Creates the audit logger based on configuration.
    fn create_audit_logger(&self) -> Arc<dyn AuditLogger> {
        if !self.config.audit.enabled {
            info!("Audit logging disabled");
            return Arc::new(NoOpAuditLogger);
        }

        info!(
            "Audit logging enabled (in-memory, max {} entries)",
            self.config.audit.max_entries
        );
        Arc::new(InMemoryAuditLogger::with_capacity(
            self.config.audit.max_entries,
        ))
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for constructing the service runtime.
pub struct RuntimeBuilder {
    config_path: Option<std::path::PathBuf>,
    config: Option<ApiConfig>,
    port_override: Option<u16>,
    seed_demo_users: bool,
}

impl RuntimeBuilder {
    /// Creates a new runtime builder.
    pub fn new() -> Self {
        Self {
            config_path: None,
            config: None,
            port_override: None,
            seed_demo_users: false,
        }
    }

    /// Sets the configuration file path.
    pub fn config_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the configuration directly.
    pub fn config(mut self, config: ApiConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Overrides the listen port from the configuration.
    pub fn port(mut self, port: Option<u16>) -> Self {
        self.port_override = port;
        self
    }

    /// Forces demo user seeding regardless of configuration.
    pub fn seed_demo_users(mut self, seed: bool) -> Self {
        self.seed_demo_users = seed;
        self
    }

    /// Builds the runtime.
    pub fn build(self) -> BinResult<ServiceRuntime> {
        let mut config = match self.config {
            Some(cfg) => cfg,
            None => {
                let path = self
                    .config_path
                    .ok_or_else(|| BinError::Configuration("No configuration provided".into()))?;
                load_config(&path)?
            }
        };

        if let Some(port) = self.port_override {
            config.port = port;
        }
        if self.seed_demo_users {
            config.seed_demo_users = true;
        }

        Ok(ServiceRuntime::new(config))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use keyrack_api::auth::JwtConfig;

    fn test_config() -> ApiConfig {
        let mut config = ApiConfig::default();
        config.jwt = JwtConfig::new("a-test-secret-that-is-long-enough!!!");
        config.magic_link.secret = "magic-link-test-secret".to_string();
        config
    }

    #[test]
    fn test_runtime_builder() {
        let runtime = RuntimeBuilder::new()
            .config(test_config())
            .port(Some(9090))
            .build()
            .unwrap();

        assert_eq!(runtime.config.port, 9090);
    }

    #[test]
    fn test_runtime_builder_seed_override() {
        let mut config = test_config();
        config.seed_demo_users = false;

        let runtime = RuntimeBuilder::new()
            .config(config)
            .seed_demo_users(true)
            .build()
            .unwrap();

        assert!(runtime.config.seed_demo_users);
    }

    #[test]
    fn test_runtime_builder_requires_config() {
        let result = RuntimeBuilder::new().build();
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("/nonexistent/keyrack.toml");
        assert!(matches!(result, Err(BinError::Configuration(_))));
    }

    #[test]
    fn test_load_config_from_toml() {
        let dir = std::env::temp_dir().join("keyrack-runtime-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("keyrack.toml");
        std::fs::write(
            &path,
            r#"
port = 9999

[jwt]
secret = "a-test-secret-that-is-long-enough!!!"

[magic_link]
secret = "another-test-secret"
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.port, 9999);
        assert_eq!(config.jwt.secret, "a-test-secret-that-is-long-enough!!!");

        let _ = std::fs::remove_file(&path);
    }
}
