//! buildpack-notify entry point
//!
//! Parses flags, installs logging, runs the selected mode and renders fatal
//! errors with operator guidance before exiting non-zero.

use anyhow::Result;
use buildpack_notify::cli;
use buildpack_notify::core::error::user_friendly_error;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.init_logging();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
