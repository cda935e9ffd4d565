//! Student records command-line tool.
//!
//! Runs exactly one operation against the student table and exits.
//!
//! # Exit codes
//! - `0` the operation ran, including input mistakes and missing records
//! - `1` the database server or network failed
//! - `2` the configuration or credentials are wrong

use clap::Parser;
use std::process::ExitCode;
use studentctl::Cli;
use studentctl_core::init_logging;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    init_logging(cli.global.verbose, cli.global.quiet)?;

    let code = studentctl::run(&cli).await?;
    Ok(ExitCode::from(code))
}
