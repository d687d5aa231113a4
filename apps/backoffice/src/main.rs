//! # Pharmadesk Back Office Entry Point
//!
//! See `lib.rs` for the startup sequence.

use std::process::ExitCode;

use clap::Parser;
use pharmadesk_backoffice::cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match pharmadesk_backoffice::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
