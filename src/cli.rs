//! Library-level operations the command-line surface dispatches to
//!
//! Kept separate from [`crate::bin`] so the binary stays a thin argument
//! parser: every operation here takes a [`Scanner`] and returns a
//! [`Result`], with no `std::process::exit` or terminal I/O.

use crate::error::Result;
use crate::orchestrator::Scanner;
use crate::types::ResultDocument;

/// Start a fresh scan, or auto-resume the most recent incomplete one
pub async fn scan(scanner: &Scanner) -> Result<ResultDocument> {
    scanner.start().await
}

/// Resume a specific scan by id
pub async fn resume(scanner: &Scanner, scan_id: &str) -> Result<ResultDocument> {
    scanner.resume(scan_id).await
}

/// Reset one scan, or every incomplete scan when `scan_id` is `None`
pub async fn reset(scanner: &Scanner, scan_id: Option<&str>) -> Result<()> {
    scanner.reset(scan_id).await
}

/// Print a one-line summary of every scan
pub async fn list(scanner: &Scanner) -> Result<Vec<String>> {
    let scans = scanner.list_scans().await?;
    Ok(scans
        .iter()
        .map(|scan| {
            format!(
                "{}  {:<10} {}/{} issues  started {}",
                scan.id,
                scan.status.as_str(),
                scan.processed_issues,
                scan.total_issues,
                scan.started_at.to_rfc3339()
            )
        })
        .collect())
}

/// Delete completed scans older than `days`, returning the count removed
pub async fn cleanup(scanner: &Scanner, days: i64) -> Result<u64> {
    scanner.cleanup(days).await
}
