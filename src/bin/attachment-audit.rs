//! Thin CLI entry point: argument parsing and dispatch only
//!
//! All business logic lives in the `attachment_audit` library crate;
//! this binary's only job is wiring `clap` arguments to `cli::*` calls,
//! initializing logging, and translating the outcome to an exit code.

use attachment_audit::config::Config;
use attachment_audit::orchestrator::Scanner;
use attachment_audit::{cli, error::Error};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

/// Duplicate attachment audit scanner for on-premise issue trackers
#[derive(Parser, Debug)]
#[command(name = "attachment-audit", version, about)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "attachment-audit.toml")]
    config: PathBuf,

    /// Resume a specific scan id instead of starting/auto-resuming
    #[arg(long, value_name = "SCAN_ID")]
    resume: Option<String>,

    /// Reset one scan (or every incomplete scan, if no id is given)
    #[arg(long, value_name = "SCAN_ID", num_args = 0..=1, default_missing_value = "")]
    reset: Option<String>,

    /// List all scans with a summary and exit
    #[arg(long)]
    list: bool,

    /// Delete completed scans older than N days (default 30) and exit
    #[arg(long, value_name = "DAYS", num_args = 0..=1, default_missing_value = "30")]
    cleanup: Option<i64>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match run().await {
        Ok(()) => ExitCode::from(0),
        Err(Error::Interrupted) => {
            tracing::warn!("scan interrupted by user");
            ExitCode::from(130)
        }
        Err(e) => {
            tracing::error!(error = %e, "fatal error");
            ExitCode::from(1)
        }
    }
}

async fn run() -> attachment_audit::error::Result<()> {
    let args = Args::parse();

    let config_text = tokio::fs::read_to_string(&args.config).await.map_err(Error::Io)?;
    let config = Config::from_toml(&config_text)?;
    let scanner = Scanner::new(config).await?;

    if args.list {
        for line in cli::list(&scanner).await? {
            println!("{line}");
        }
        return Ok(());
    }

    if let Some(scan_id) = args.reset {
        let scan_id = if scan_id.is_empty() { None } else { Some(scan_id.as_str()) };
        cli::reset(&scanner, scan_id).await?;
        println!("reset complete");
        return Ok(());
    }

    if let Some(days) = args.cleanup {
        let removed = cli::cleanup(&scanner, days).await?;
        println!("removed {removed} completed scan(s) older than {days} days");
        return Ok(());
    }

    let run_future = async {
        match &args.resume {
            Some(scan_id) => cli::resume(&scanner, scan_id).await,
            None => cli::scan(&scanner).await,
        }
    };
    tokio::pin!(run_future);

    let result = tokio::select! {
        result = &mut run_future => result,
        _ = tokio::signal::ctrl_c() => {
            scanner.request_shutdown();
            run_future.await
        }
    };

    let document = result?;
    println!(
        "scan {} completed: {} files, {} duplicates, {} bytes wasted",
        document.scan.id, document.stats.total_files, document.stats.duplicate_files, document.stats.duplicate_size
    );
    Ok(())
}
