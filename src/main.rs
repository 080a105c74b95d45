//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `stock_watch` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//! - User-facing output formatting
//!
//! All core functionality is implemented in the library crate.

use anyhow::{Context, Result};
use clap::Parser;
use std::process;

use stock_watch::initialization::init_logger_with;
use stock_watch::{run_monitor, Opt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file (if it exists)
    // Try loading from current directory first, then from the executable's directory
    if dotenvy::dotenv().is_err() {
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let env_path = exe_dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                }
            }
        }
    }

    let opt = Opt::parse();

    let log_level = opt.log_level.clone();
    let log_format = opt.log_format.clone();
    init_logger_with(log_level.into(), log_format).context("Failed to initialize logger")?;

    match run_monitor(opt).await {
        Ok(report) => {
            println!(
                "✅ Ran {} check{} ({} failed), announced {} restock{}, {} notification{} delivered in {:.1}s",
                report.checks,
                if report.checks == 1 { "" } else { "s" },
                report.failed_checks,
                report.restocks,
                if report.restocks == 1 { "" } else { "s" },
                report.delivered,
                if report.delivered == 1 { "" } else { "s" },
                report.elapsed_seconds
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("stock_watch error: {:#}", e);
            process::exit(1);
        }
    }
}
