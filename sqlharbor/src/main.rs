//! Connection profile and metadata browser.
//!
//! Every command prints one JSON document on stdout. Logs go to stderr.
//!
//! # Security Guarantees
//! - Passwords and TLS keys are masked in all output
//! - Database credentials never reach logs or error messages

use clap::Parser;
use sqlharbor::{Cli, run};
use sqlharbor_core::logging::init_logging;
use tracing::error;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.global.verbose, cli.global.quiet)?;

    let output = run(&cli).await.inspect_err(|e| error!("{:#}", e))?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
