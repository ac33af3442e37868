// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! polter - run a target's binary, fresh.
//!
//! `polter <target> [args...]` consults the target's build state and the
//! version-control status, waits for or triggers a rebuild when needed,
//! then executes the binary with the given arguments, forwarding its
//! exit code.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use clap::Parser;
use std::time::Duration;

use poltergeist::exit_error::ExitError;
use poltergeist::runner::{self, RunnerArgs, DEFAULT_WAIT_TIMEOUT};

#[derive(Parser)]
#[command(
    name = "polter",
    version,
    about = "Run a Poltergeist target's binary, rebuilding it first if stale"
)]
struct Cli {
    /// Target whose binary to run
    target: String,

    /// Seconds to wait on an in-flight or triggered build
    #[arg(long)]
    timeout: Option<u64>,

    /// Arguments forwarded to the binary
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = runner::run(RunnerArgs {
        target: cli.target,
        binary_args: cli.args,
        timeout: cli
            .timeout
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_WAIT_TIMEOUT),
    })
    .await;

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            let code = e.downcast_ref::<ExitError>().map_or(1, |e| e.code);
            let message = e.to_string();
            if !message.is_empty() {
                eprintln!("polter: {message}");
            }
            std::process::exit(code);
        }
    }
}
