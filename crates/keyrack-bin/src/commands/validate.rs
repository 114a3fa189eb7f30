// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `validate` command.

use crate::cli::{Cli, OutputFormat, ValidateArgs};
use crate::error::{BinError, BinResult};
use crate::runtime::load_config;

/// Executes the `validate` command to validate configuration.
pub fn validate(cli: &Cli, args: ValidateArgs) -> BinResult<()> {
    let config_path = &cli.config;

    // Check if file exists
    if !config_path.exists() {
        return Err(BinError::Configuration(format!(
            "Configuration file not found: {}",
            config_path.display()
        )));
    }

    // Load and validate configuration
    let config = load_config(config_path)?;
    config.validate().map_err(|e| {
        BinError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    // Collect validation warnings
    let mut warnings: Vec<String> = Vec::new();

    if config.seed_demo_users {
        warnings.push(
            "Demo user seeding is enabled; disable seed_demo_users outside of demos".to_string(),
        );
    }

    if config.cors.allow_credentials
        && config.cors.allowed_origins.iter().any(|o| o == "*")
    {
        warnings.push(
            "CORS allows credentials with a wildcard origin; browsers will reject this"
                .to_string(),
        );
    }

    if !config.audit.enabled {
        warnings.push("Audit logging is disabled".to_string());
    }

    if config.oauth.providers.is_empty() {
        warnings.push("No OAuth providers configured; /oauth endpoints will return 404"
            .to_string());
    }

    // Output results based on format
    match args.format {
        OutputFormat::Text => {
            println!("✓ Configuration is valid: {}", config_path.display());
            println!();
            println!("Summary:");
            println!("  Listen:          {}", config.socket_addr());
            println!("  Base path:       {}", config.base_path);
            println!("  Demo users:      {}", if config.seed_demo_users { "seeded" } else { "not seeded" });
            println!("  OAuth providers: {}", config.oauth.providers.len());
            println!("  Audit:           {}", if config.audit.enabled { "enabled" } else { "disabled" });

            if !warnings.is_empty() {
                println!();
                println!("Warnings:");
                for warning in &warnings {
                    println!("  ⚠ {}", warning);
                }
            }

            if args.show_config {
                println!();
                println!("Parsed configuration:");
                println!(
                    "{}",
                    serde_json::to_string_pretty(&config)
                        .unwrap_or_else(|_| "(serialization error)".to_string())
                );
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "valid": true,
                "config_path": config_path.display().to_string(),
                "summary": {
                    "listen": config.socket_addr().to_string(),
                    "base_path": config.base_path,
                    "seed_demo_users": config.seed_demo_users,
                    "oauth_provider_count": config.oauth.providers.len(),
                    "audit_enabled": config.audit.enabled,
                },
                "warnings": warnings,
                "config": if args.show_config { Some(&config) } else { None },
            });
            println!("{}", serde_json::to_string_pretty(&output).unwrap());
        }
    }

    // In strict mode, treat warnings as errors
    if args.strict && !warnings.is_empty() {
        return Err(BinError::Configuration(format!(
            "Strict mode: {} warning(s) found",
            warnings.len()
        )));
    }

    Ok(())
}
