// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! API server configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::auth::{JwtConfig, MagicLinkConfig, OAuthConfig, PasskeyConfig, SessionConfig, TotpConfig};
use crate::middleware::RateLimitConfig;

// =============================================================================
// ApiConfig
// =============================================================================

/// Configuration for the API server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host address.
    pub host: IpAddr,
    /// Server port.
    pub port: u16,
    /// Base path for API endpoints. Informational: routes are mounted at
    /// `/api/v1` and this value is reported by tooling (validate, health),
    /// not used to remount the router.
    pub base_path: String,
    /// CORS configuration.
    pub cors: CorsConfig,
    /// JWT configuration.
    pub jwt: JwtConfig,
    /// Server-side session configuration.
    pub session: SessionConfig,
    /// TOTP configuration.
    pub totp: TotpConfig,
    /// Magic link configuration.
    pub magic_link: MagicLinkConfig,
    /// Passkey configuration.
    pub passkey: PasskeyConfig,
    /// OAuth provider configuration.
    pub oauth: OAuthConfig,
    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,
    /// Audit logging configuration.
    pub audit: AuditConfig,
    /// Whether to seed the in-memory store with demo accounts.
    pub seed_demo_users: bool,
    /// Request timeout.
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,
    /// Graceful shutdown timeout.
    #[serde(with = "duration_secs")]
    pub shutdown_timeout: Duration,
    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 8080,
            base_path: "/api/v1".to_string(),
            cors: CorsConfig::default(),
            jwt: JwtConfig::default(),
            session: SessionConfig::default(),
            totp: TotpConfig::default(),
            magic_link: MagicLinkConfig::default(),
            passkey: PasskeyConfig::default(),
            oauth: OAuthConfig::default(),
            rate_limit: RateLimitConfig::default(),
            audit: AuditConfig::default(),
            seed_demo_users: true,
            request_timeout: Duration::from_secs(30),
            shutdown_timeout: Duration::from_secs(30),
            max_body_size: 1024 * 1024, // 1MB
        }
    }
}

impl ApiConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the socket address to bind to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Sets the host address.
    pub fn with_host(mut self, host: IpAddr) -> Self {
        self.host = host;
        self
    }

    /// Sets the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the JWT configuration.
    pub fn with_jwt(mut self, jwt: JwtConfig) -> Self {
        self.jwt = jwt;
        self
    }

    /// Sets the rate limit configuration.
    pub fn with_rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    /// Validates the configuration.
    ///
    /// The JWT secret must be usable and the magic-link signing key must be
    /// set; both default to empty and have to come from config or flags.
    pub fn validate(&self) -> Result<(), String> {
        self.jwt.validate().map_err(|e| e.to_string())?;
        if self.magic_link.secret.is_empty() {
            return Err("magic_link.secret must be set".to_string());
        }
        if self.base_path.is_empty() || !self.base_path.starts_with('/') {
            return Err("base_path must start with '/'".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// CorsConfig
// =============================================================================

/// CORS (Cross-Origin Resource Sharing) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Allowed origins.
    pub allowed_origins: Vec<String>,
    /// Allowed methods.
    pub allowed_methods: Vec<String>,
    /// Allowed headers.
    pub allowed_headers: Vec<String>,
    /// Whether to allow credentials.
    pub allow_credentials: bool,
    /// Max age for preflight cache (seconds).
    pub max_age: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
            allowed_methods: vec![
                "GET".to_string(),
                "POST".to_string(),
                "PUT".to_string(),
                "DELETE".to_string(),
                "OPTIONS".to_string(),
            ],
            allowed_headers: vec![
                "Content-Type".to_string(),
                "Authorization".to_string(),
                "X-Session-Id".to_string(),
                "X-Request-ID".to_string(),
            ],
            allow_credentials: false,
            max_age: 3600,
        }
    }
}

impl CorsConfig {
    /// Creates a permissive CORS configuration for development.
    pub fn permissive() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
            allowed_methods: vec![
                "GET".to_string(),
                "POST".to_string(),
                "PUT".to_string(),
                "DELETE".to_string(),
                "PATCH".to_string(),
                "OPTIONS".to_string(),
                "HEAD".to_string(),
            ],
            allowed_headers: vec!["*".to_string()],
            allow_credentials: true,
            max_age: 86400,
        }
    }

    /// Creates a restrictive CORS configuration for production.
    pub fn strict(origins: Vec<String>) -> Self {
        Self {
            allowed_origins: origins,
            allowed_methods: vec!["GET".to_string(), "POST".to_string()],
            allowed_headers: vec![
                "Content-Type".to_string(),
                "Authorization".to_string(),
                "X-Session-Id".to_string(),
            ],
            allow_credentials: true,
            max_age: 3600,
        }
    }
}

// =============================================================================
// AuditConfig
// =============================================================================

/// Audit logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Whether audit logging is enabled.
    pub enabled: bool,
    /// Path to the audit log file.
    pub log_path: Option<PathBuf>,
    /// Actions to audit.
    pub audit_actions: AuditActions,
    /// Maximum number of entries kept by the in-memory logger.
    pub max_entries: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_path: None,
            audit_actions: AuditActions::default(),
            max_entries: 10_000,
        }
    }
}

impl AuditConfig {
    /// Creates a minimal audit configuration.
    pub fn minimal() -> Self {
        Self {
            enabled: true,
            audit_actions: AuditActions::security_only(),
            ..Default::default()
        }
    }

    /// Creates a comprehensive audit configuration.
    pub fn comprehensive() -> Self {
        Self {
            enabled: true,
            audit_actions: AuditActions::all(),
            ..Default::default()
        }
    }
}

// =============================================================================
// AuditActions
// =============================================================================

/// Configuration for which actions to audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditActions {
    /// Audit authentication attempts (all flows).
    pub authentication: bool,
    /// Audit authorization check evaluations.
    pub authorization_checks: bool,
    /// Audit write operations (policy/role/ACL/tenant administration).
    pub write_operations: bool,
    /// Audit read operations.
    pub read_operations: bool,
    /// Audit system events (start, shutdown, health).
    pub system_events: bool,
}

impl Default for AuditActions {
    fn default() -> Self {
        Self {
            authentication: true,
            authorization_checks: true,
            write_operations: true,
            read_operations: false,
            system_events: true,
        }
    }
}

impl AuditActions {
    /// Creates a configuration that audits all actions.
    pub fn all() -> Self {
        Self {
            authentication: true,
            authorization_checks: true,
            write_operations: true,
            read_operations: true,
            system_events: true,
        }
    }

    /// Creates a configuration that only audits security-related actions.
    pub fn security_only() -> Self {
        Self {
            authentication: true,
            authorization_checks: false,
            write_operations: true,
            read_operations: false,
            system_events: false,
        }
    }

    /// Creates a configuration that audits nothing.
    pub fn none() -> Self {
        Self {
            authentication: false,
            authorization_checks: false,
            write_operations: false,
            read_operations: false,
            system_events: false,
        }
    }
}

// =============================================================================
// duration_secs module for Duration
// =============================================================================

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // Serialize as seconds
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// =============================================================================
// Tests
// =============================================================================
