//! # attachment-audit
//!
//! A resumable, checkpointed scanner that walks an on-premise issue
//! tracker's attachments, fingerprints their content, and reports
//! duplicate storage waste.
//!
//! ## Design Philosophy
//!
//! attachment-audit is designed to be:
//! - **Resumable** - a scan checkpoints its pagination offset and running
//!   totals to SQLite and can pick back up after a crash or Ctrl+C
//! - **Rate-limited and bounded** - a single configurable requests/second
//!   ceiling and a bounded download worker pool, so a scan never overruns
//!   the tracker it's auditing
//! - **Library-first** - no CLI coupling baked into the core; the binary
//!   in `src/bin/` is a thin wrapper over [`orchestrator::Scanner`]
//! - **Event-driven** - consumers subscribe to a broadcast channel of
//!   [`types::Event`] for live progress, no polling required
//!
//! ## Quick Start
//!
//! ```no_run
//! use attachment_audit::config::Config;
//! use attachment_audit::orchestrator::Scanner;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_toml(&std::fs::read_to_string("attachment-audit.toml")?)?;
//!     let scanner = Scanner::new(config).await?;
//!
//!     // Subscribe to progress/lifecycle events
//!     let mut events = scanner.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("event: {:?}", event);
//!         }
//!     });
//!
//!     let result = scanner.start().await?;
//!     println!("{} duplicate groups found", result.duplicate_groups.len());
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Library-level operations the command-line surface dispatches to
pub mod cli;
/// HTTP client for the remote issue-tracker's REST API
pub mod client;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Content hashing (streamed SHA-256 plus the URL-hash fallback)
pub mod hasher;
/// Scan driver: classification, progress, and the resumable main loop
pub mod orchestrator;
/// Bounded concurrent download pool
pub mod pool;
/// Outbound request rate limiting
pub mod rate_limiter;
/// Wire DTOs for the remote issue-tracker's REST API
pub mod remote;
/// Retry logic with exponential backoff
pub mod retry;
/// SQLite persistence layer
pub mod store;
/// Core domain types and events
pub mod types;

// Re-export commonly used types
pub use config::{Config, Credentials};
pub use error::{Error, Result, ScanError};
pub use orchestrator::Scanner;
pub use retry::IsRetryable;
pub use store::Store;
pub use types::{
    Checkpoint, DuplicateGroup, Event, FallbackReason, HashSource, Location, QuickWin,
    ResultDocument, Scan, ScanStatistics, ScanStatus,
};

/// Run a scanner with graceful signal handling.
///
/// Waits for a termination signal and then calls
/// [`Scanner::request_shutdown`], letting the in-flight scan loop finish
/// its current batch and write a final checkpoint before returning.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal
///   registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use attachment_audit::{Scanner, Config, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config::from_toml(&std::fs::read_to_string("attachment-audit.toml")?)?;
///     let scanner = Scanner::new(config).await?;
///
///     let scan = scanner.start();
///     tokio::pin!(scan);
///
///     tokio::select! {
///         result = &mut scan => { result?; }
///         () = run_with_shutdown(&scanner) => { scan.await?; }
///     }
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(scanner: &Scanner) {
    wait_for_signal().await;
    scanner.request_shutdown();
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("received SIGTERM signal");
            } else {
                tracing::error!("could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to listen for Ctrl+C signal");
        }
    }
}
