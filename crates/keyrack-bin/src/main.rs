// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! keyrack - authentication and authorization playground
//!
//! Main binary entry point for the keyrack server.

use keyrack_bin::cli::Cli;
use keyrack_bin::error::report_error_and_exit;
use keyrack_bin::{commands, logging};

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    logging::init_logging(cli.effective_log_level(), cli.log_format);

    if let Err(error) = commands::execute(cli).await {
        report_error_and_exit(error);
    }
}
