// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `health` command.

use std::time::Duration;

use crate::cli::{Cli, HealthArgs, OutputFormat};
use crate::error::{BinError, BinResult};
use crate::runtime::load_config;

/// Executes the `health` command to check a running instance.
pub async fn health_check(cli: &Cli, args: HealthArgs) -> BinResult<()> {
    let config_path = &cli.config;
    let timeout = Duration::from_secs(args.timeout);

    // Load configuration
    let config = if config_path.exists() {
        load_config(config_path).ok()
    } else {
        None
    };

    let mut checks = Vec::new();

    // Check 1: Configuration file
    let config_check = HealthCheck {
        name: "Configuration".to_string(),
        status: if config.is_some() {
            HealthStatus::Healthy
        } else if config_path.exists() {
            HealthStatus::Unhealthy("Configuration file is invalid".to_string())
        } else {
            HealthStatus::Unhealthy("Configuration file not found".to_string())
        },
        latency_ms: None,
    };
    checks.push(config_check);

    // Check 2: Secrets
    let secrets_check = if let Some(ref cfg) = config {
        let status = if cfg.jwt.secret.is_empty() {
            HealthStatus::Unhealthy("JWT secret is not configured".to_string())
        } else if cfg.magic_link.secret.is_empty() {
            HealthStatus::Warning("Magic link secret is not configured".to_string())
        } else {
            HealthStatus::Healthy
        };
        HealthCheck {
            name: "Secrets".to_string(),
            status,
            latency_ms: None,
        }
    } else {
        HealthCheck {
            name: "Secrets".to_string(),
            status: HealthStatus::Unknown,
            latency_ms: None,
        }
    };
    checks.push(secrets_check);

    // Check 3: API endpoint (if running)
    let api_check = if let Some(ref cfg) = config {
        let addr = cfg.socket_addr();
        let start = std::time::Instant::now();

        let status = match tokio::time::timeout(timeout, check_tcp_endpoint(addr)).await {
            Ok(Ok(())) => HealthStatus::Healthy,
            Ok(Err(e)) => HealthStatus::Unhealthy(format!("Connection failed: {}", e)),
            Err(_) => HealthStatus::Unhealthy("Timeout".to_string()),
        };

        HealthCheck {
            name: "API Server".to_string(),
            status,
            latency_ms: Some(start.elapsed().as_millis() as u64),
        }
    } else {
        HealthCheck {
            name: "API Server".to_string(),
            status: HealthStatus::Unknown,
            latency_ms: None,
        }
    };
    checks.push(api_check);

    // Output results
    let all_healthy = checks
        .iter()
        .all(|c| matches!(c.status, HealthStatus::Healthy | HealthStatus::Warning(_)));

    match args.format {
        OutputFormat::Text => {
            println!("keyrack Health Check");
            println!("====================");
            println!();

            for check in &checks {
                let (icon, status_text) = match &check.status {
                    HealthStatus::Healthy => ("✓", "healthy".to_string()),
                    HealthStatus::Unhealthy(msg) => ("✗", format!("unhealthy: {}", msg)),
                    HealthStatus::Warning(msg) => ("⚠", format!("warning: {}", msg)),
                    HealthStatus::Unknown => ("?", "unknown".to_string()),
                };

                let latency = check
                    .latency_ms
                    .map(|ms| format!(" ({}ms)", ms))
                    .unwrap_or_default();

                println!("{} {}: {}{}", icon, check.name, status_text, latency);
            }

            println!();
            if all_healthy {
                println!("Overall: ✓ Healthy");
            } else {
                println!("Overall: ✗ Unhealthy");
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "healthy": all_healthy,
                "checks": checks.iter().map(|c| {
                    serde_json::json!({
                        "name": c.name,
                        "status": match &c.status {
                            HealthStatus::Healthy => "healthy",
                            HealthStatus::Unhealthy(_) => "unhealthy",
                            HealthStatus::Warning(_) => "warning",
                            HealthStatus::Unknown => "unknown",
                        },
                        "message": match &c.status {
                            HealthStatus::Unhealthy(msg) => Some(msg.clone()),
                            HealthStatus::Warning(msg) => Some(msg.clone()),
                            _ => None,
                        },
                        "latency_ms": c.latency_ms,
                    })
                }).collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&output).unwrap());
        }
    }

    if all_healthy {
        Ok(())
    } else {
        Err(BinError::Health(
            "One or more health checks failed".to_string(),
        ))
    }
}

/// Checks if a TCP endpoint accepts connections.
async fn check_tcp_endpoint(addr: std::net::SocketAddr) -> Result<(), String> {
    match tokio::net::TcpStream::connect(addr).await {
        Ok(_) => Ok(()),
        Err(e) => Err(e.to_string()),
    }
}

/// Health check result.
struct HealthCheck {
    name: String,
    status: HealthStatus,
    latency_ms: Option<u64>,
}

/// Health check status.
enum HealthStatus {
    Healthy,
    Unhealthy(String),
    Warning(String),
    Unknown,
}
