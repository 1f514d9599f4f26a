//! Binary crate for the `converter` command-line tool.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Interactive configuration
//! - Wiring stdin/stdout to the conversion session

use clap::Parser;

mod cli;
mod log;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cmd = cli::Cli::parse();
    log::init_logging(cmd.verbose);

    let result = cmd.run().await;
    if let Err(e) = &result {
        tracing::error!(error = %e, "Command failed");
    }
    result
}
