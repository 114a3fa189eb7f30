// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI argument parsing and command definitions.
//!
//! This module provides the command-line interface for keyrack using clap.
//! It supports multiple subcommands for different operations:
//!
//! - `run`: Start the server (default)
//! - `validate`: Validate configuration file
//! - `version`: Show version information
//! - `gen-secret`: Generate a random signing secret
//! - `health`: Check a running instance

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

// =============================================================================
// Main CLI Structure
// =============================================================================

/// keyrack - authentication and authorization playground
///
/// A self-contained REST service that demonstrates common authentication
/// flows (JWT, sessions, TOTP, magic links, passkeys, OAuth) and
/// authorization models (RBAC, ABAC, PBAC, ACL, scopes, tenants).
#[derive(Parser, Debug)]
#[command(
    name = "keyrack",
    author = "Sylvex <contact@sylvex.io>",
    version = keyrack_core::VERSION,
    about = "Authentication and authorization playground server",
    long_about = None,
    propagate_version = true
)]
pub struct Cli {
    /// Configuration file path
    #[arg(
        short,
        long,
        default_value = "keyrack.toml",
        env = "KEYRACK_CONFIG",
        global = true
    )]
    pub config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        short,
        long,
        default_value = "info",
        env = "KEYRACK_LOG_LEVEL",
        global = true
    )]
    pub log_level: String,

    /// Log format (text, json, compact)
    #[arg(long, default_value = "text", env = "KEYRACK_LOG_FORMAT", global = true)]
    pub log_format: LogFormat,

    /// Enable quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

// =============================================================================
// Subcommands
// =============================================================================

/// Available subcommands for the keyrack CLI.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the server
    ///
    /// This is the default command when no subcommand is specified.
    /// It starts the keyrack REST API server with all configured flows.
    Run(RunArgs),

    /// Validate the configuration file
    ///
    /// Parses and validates the configuration file without starting the
    /// server. Useful for checking configuration before deployment.
    Validate(ValidateArgs),

    /// Show detailed version information
    ///
    /// Displays version information for all components including
    /// build metadata.
    Version,

    /// Generate a random signing secret
    ///
    /// Generates a cryptographically secure secret suitable for the
    /// `jwt.secret` and `magic_link.secret` configuration values.
    #[command(name = "gen-secret")]
    GenSecret(GenSecretArgs),

    /// Check a running instance
    ///
    /// Checks the configuration and probes the API server, reporting
    /// the status of each component.
    Health(HealthArgs),
}

// =============================================================================
// Command Arguments
// =============================================================================

/// Arguments for the `run` command.
#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// Override the listen port from the configuration file
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Seed the demo users regardless of configuration
    #[arg(long, env = "KEYRACK_SEED_DEMO_USERS")]
    pub seed_demo_users: bool,
}

/// Arguments for the `validate` command.
#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    /// Show parsed configuration after validation
    #[arg(short, long)]
    pub show_config: bool,

    /// Output format for validation results
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// Strict mode: treat warnings as errors
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for the `gen-secret` command.
#[derive(Args, Debug, Clone)]
pub struct GenSecretArgs {
    /// Output format for the secret
    #[arg(short, long, default_value = "base64")]
    pub format: SecretFormat,

    /// Number of random bytes to generate
    #[arg(long, default_value = "48")]
    pub length: usize,

    /// Output file path (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the `health` command.
#[derive(Args, Debug, Clone)]
pub struct HealthArgs {
    /// Output format for health check results
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// Timeout for health checks in seconds
    #[arg(short, long, default_value = "10")]
    pub timeout: u64,
}

// =============================================================================
// Enums
// =============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for structured logging
    Json,
    /// Compact format for minimal output
    Compact,
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for programmatic parsing
    Json,
}

/// Secret output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum SecretFormat {
    /// Base64 encoded
    #[default]
    Base64,
    /// Hexadecimal encoded
    Hex,
}

// =============================================================================
// Helper Methods
// =============================================================================

impl Cli {
    /// Parse CLI arguments from the command line.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the effective command, defaulting to `Run` if none specified.
    pub fn effective_command(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or_else(|| Commands::Run(RunArgs::default()))
    }

    /// Check if verbose logging is enabled.
    pub fn is_verbose(&self) -> bool {
        self.verbose && !self.quiet
    }

    /// Get the effective log level based on flags.
    pub fn effective_log_level(&self) -> &str {
        if self.quiet {
            "warn"
        } else if self.verbose {
            "debug"
        } else {
            &self.log_level
        }
    }
}

impl Default for ValidateArgs {
    fn default() -> Self {
        Self {
            show_config: false,
            format: OutputFormat::Text,
            strict: false,
        }
    }
}

impl Default for GenSecretArgs {
    fn default() -> Self {
        Self {
            format: SecretFormat::Base64,
            length: 48,
            output: None,
        }
    }
}

impl Default for HealthArgs {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            timeout: 10,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command() {
        let cli = Cli::parse_from(["keyrack"]);
        assert!(cli.command.is_none());
        matches!(cli.effective_command(), Commands::Run(_));
    }

    #[test]
    fn test_run_command() {
        let cli = Cli::parse_from(["keyrack", "run"]);
        assert!(matches!(cli.command, Some(Commands::Run(_))));
    }

    #[test]
    fn test_run_port_override() {
        let cli = Cli::parse_from(["keyrack", "run", "-p", "9090"]);
        if let Some(Commands::Run(args)) = cli.command {
            assert_eq!(args.port, Some(9090));
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn test_validate_command() {
        let cli = Cli::parse_from(["keyrack", "validate", "--show-config"]);
        if let Some(Commands::Validate(args)) = cli.command {
            assert!(args.show_config);
        } else {
            panic!("Expected Validate command");
        }
    }

    #[test]
    fn test_config_path() {
        let cli = Cli::parse_from(["keyrack", "-c", "/etc/keyrack/keyrack.toml"]);
        assert_eq!(cli.config, PathBuf::from("/etc/keyrack/keyrack.toml"));
    }

    #[test]
    fn test_log_level() {
        let cli = Cli::parse_from(["keyrack", "-l", "debug"]);
        assert_eq!(cli.log_level, "debug");
    }

    #[test]
    fn test_quiet_mode() {
        let cli = Cli::parse_from(["keyrack", "-q"]);
        assert!(cli.quiet);
        assert_eq!(cli.effective_log_level(), "warn");
    }

    #[test]
    fn test_verbose_mode() {
        let cli = Cli::parse_from(["keyrack", "-v"]);
        assert!(cli.verbose);
        assert_eq!(cli.effective_log_level(), "debug");
    }

    #[test]
    fn test_gen_secret_command() {
        let cli = Cli::parse_from(["keyrack", "gen-secret", "-f", "hex"]);
        if let Some(Commands::GenSecret(args)) = cli.command {
            assert_eq!(args.format, SecretFormat::Hex);
            assert_eq!(args.length, 48);
        } else {
            panic!("Expected GenSecret command");
        }
    }
}
