// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `gen-secret` command.

use base64::Engine;
use rand::RngCore;

use crate::cli::{Cli, GenSecretArgs, SecretFormat};
use crate::error::{BinError, BinResult};

/// Minimum number of random bytes for a useful signing secret.
const MIN_SECRET_BYTES: usize = 32;

/// Executes the `gen-secret` command to generate a signing secret.
pub fn gen_secret(_cli: &Cli, args: GenSecretArgs) -> BinResult<()> {
    if args.length < MIN_SECRET_BYTES {
        return Err(BinError::Configuration(format!(
            "Secret length must be at least {} bytes (got {})",
            MIN_SECRET_BYTES, args.length
        )));
    }

    let mut bytes = vec![0u8; args.length];
    rand::rngs::OsRng.fill_bytes(&mut bytes);

    let output = match args.format {
        SecretFormat::Base64 => base64::engine::general_purpose::STANDARD.encode(&bytes),
        SecretFormat::Hex => hex_encode(&bytes),
    };

    if let Some(path) = &args.output {
        std::fs::write(path, &output)
            .map_err(|e| BinError::Io(format!("Failed to write secret file: {}", e)))?;
        eprintln!("Secret written to: {}", path.display());
    } else {
        println!("{}", output);
    }

    eprintln!();
    eprintln!("Store this secret securely! Use it in keyrack.toml as:");
    eprintln!("  [jwt]");
    eprintln!("  secret = \"<secret>\"");
    eprintln!();
    eprintln!("  [magic_link]");
    eprintln!("  secret = \"<secret>\"");

    Ok(())
}

fn hex_encode(data: &[u8]) -> String {
    data.iter().map(|b| format!("{:02x}", b)).collect()
}

// =============================================================================
// Tests
// =============================================================================
