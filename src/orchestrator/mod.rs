//! Scan driver
//!
//! `Scanner` is the crate root type, analogous to the teacher's
//! `UsenetDownloader`: it owns the collaborators (`Client`, `Store`,
//! `DownloadPool`) and a broadcast event channel, and exposes the
//! library-level operations the CLI surface calls into.
//!
//! ## Submodules
//!
//! - [`classify`] — the canonical-vs-duplicate classification rule
//! - [`progress`] — progress signal and quick-win computation

pub mod classify;
pub mod progress;

use crate::client::{Client, build_predicate};
use crate::config::Config;
use crate::error::{Error, Result, ScanError};
use crate::pool::{DownloadPool, WorkerOutcome};
use crate::remote::flatten_issue;
use crate::store::Store;
use crate::types::{Checkpoint, DuplicateGroup, Event, FallbackReason, HashSource, ResultDocument, Scan, ScanStatistics, ScanStatus};
use chrono::Utc;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

const SEARCH_FIELDS: &str = "key,project,status,updated,attachment";
const SCAN_ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const SCAN_ID_LENGTH: usize = 8;
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Drives one scan from start (or resume) to completion
pub struct Scanner {
    client: Arc<Client>,
    store: Arc<Store>,
    pool: DownloadPool,
    config: Arc<Config>,
    events: broadcast::Sender<Event>,
    cancel: CancellationToken,
}

impl Scanner {
    /// Build a scanner from configuration: connects the HTTP client and the
    /// SQLite store, and wires the bounded download pool
    pub async fn new(config: Config) -> Result<Self> {
        let config = Arc::new(config);
        let client = Arc::new(Client::new(&config.remote, &config.scan, crate::config::RetryConfig::default())?);
        let store = Arc::new(Store::open(&config.storage.database_path).await?);
        let cancel = CancellationToken::new();
        let pool = DownloadPool::new(
            client.clone(),
            config.scan.worker_count,
            config.scan.max_file_bytes,
            config.scan.download_timeout(),
            config.scan.use_content_hash,
            cancel.clone(),
        );
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            client,
            store,
            pool,
            config,
            events,
            cancel,
        })
    }

    /// Subscribe to scan progress/lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Request cooperative cancellation of the in-progress scan
    pub fn request_shutdown(&self) {
        self.cancel.cancel();
    }

    /// Start a fresh scan, or auto-resume the most recent incomplete one
    pub async fn start(&self) -> Result<ResultDocument> {
        if let Some(scan) = self.store.find_resumable_scan().await? {
            return self.resume(&scan.id).await;
        }
        self.start_fresh().await
    }

    /// Start a brand-new scan, ignoring any resumable scan
    pub async fn start_fresh(&self) -> Result<ResultDocument> {
        let predicate = build_predicate(&self.config.filters);
        let total_issues = self.client.count(&predicate).await?;
        let scan_id = generate_scan_id();
        let scan = Scan::new(scan_id, total_issues, predicate, self.config.redacted_snapshot());

        self.store.create_scan(&scan).await?;
        let _ = self.events.send(Event::ScanStarted {
            scan_id: scan.id.clone(),
            total_issues: scan.total_issues,
        });

        self.drive(scan, ScanStatistics::default(), HashMap::new(), 0, None).await
    }

    /// Resume a specific scan by id
    pub async fn resume(&self, scan_id: &str) -> Result<ResultDocument> {
        let scan = self
            .store
            .get_scan(scan_id)
            .await?
            .ok_or_else(|| Error::Scan(ScanError::NotFound(scan_id.to_string())))?;

        if scan.status != ScanStatus::Running {
            return Err(Error::Scan(ScanError::InvalidState {
                id: scan.id.clone(),
                status: scan.status.as_str().to_string(),
                operation: "resume".to_string(),
            }));
        }

        let stats = self.store.get_stats(&scan.id).await?;
        let catalog = self.store.get_groups(&scan.id).await?;
        let checkpoint = self.store.get_checkpoint(&scan.id).await?;

        let (offset, last_issue_key) = match checkpoint {
            Some(Checkpoint { next_offset, last_issue_key, .. }) => (next_offset, last_issue_key),
            None => (scan.processed_issues, None),
        };

        let _ = self.events.send(Event::ScanStarted {
            scan_id: scan.id.clone(),
            total_issues: scan.total_issues,
        });

        self.drive(scan, stats, catalog, offset, last_issue_key).await
    }

    /// Reset a scan (or every incomplete scan, if `scan_id` is `None`) back
    /// to a fresh `Running` state with no progress
    pub async fn reset(&self, scan_id: Option<&str>) -> Result<()> {
        match scan_id {
            Some(id) => self.store.reset_scan(id).await,
            None => {
                for scan in self.store.list_scans().await? {
                    if scan.status == ScanStatus::Running {
                        self.store.reset_scan(&scan.id).await?;
                    }
                }
                Ok(())
            }
        }
    }

    /// Enumerate every scan with its summary state
    pub async fn list_scans(&self) -> Result<Vec<Scan>> {
        self.store.list_scans().await
    }

    /// Delete completed scans older than `days`
    pub async fn cleanup(&self, days: i64) -> Result<u64> {
        let cutoff = Utc::now() - chrono::Duration::days(days);
        self.store.delete_completed_before(cutoff).await
    }

    async fn drive(
        &self,
        mut scan: Scan,
        mut stats: ScanStatistics,
        mut catalog: HashMap<String, DuplicateGroup>,
        mut offset: i64,
        mut last_issue_key: Option<String>,
    ) -> Result<ResultDocument> {
        let mut issues_since_checkpoint: i64 = 0;

        loop {
            if self.cancel.is_cancelled() {
                self.store
                    .save_progress(&scan, &stats, &catalog, offset, last_issue_key.as_deref())
                    .await?;
                let _ = self.events.send(Event::ScanInterrupted { scan_id: scan.id.clone() });
                return Err(Error::Interrupted);
            }

            let page = self
                .client
                .search(&scan.predicate, offset, self.config.scan.page_size, SEARCH_FIELDS)
                .await
                .map_err(|e| {
                    ScanError::PageFetchFailed {
                        offset,
                        reason: e.to_string(),
                    }
                });

            let page = match page {
                Ok(page) => page,
                Err(scan_error) => {
                    // best-effort checkpoint before surfacing the error; the scan
                    // remains resumable even if this second write also fails
                    let _ = self
                        .store
                        .save_progress(&scan, &stats, &catalog, offset, last_issue_key.as_deref())
                        .await;
                    return Err(Error::Scan(scan_error));
                }
            };

            if page.issues.is_empty() {
                break;
            }

            let page_len = page.issues.len() as i64;

            for issue in &page.issues {
                last_issue_key = Some(issue.key.clone());

                let batch = flatten_issue(issue);
                if batch.is_empty() {
                    continue;
                }

                let outcomes = self.pool.run_batch(batch).await;
                for outcome in outcomes {
                    match outcome {
                        WorkerOutcome::Hashed { meta, fingerprint, source } => {
                            classify::classify_attachment(&mut catalog, &mut stats, &meta, &fingerprint);
                            if let Some(message) = fallback_warning(&source) {
                                let _ = self.events.send(Event::AttachmentWarning {
                                    scan_id: scan.id.clone(),
                                    attachment_id: meta.attachment.id.clone(),
                                    message,
                                });
                            }
                        }
                        WorkerOutcome::Dropped { attachment_id, reason } => {
                            let _ = self.events.send(Event::AttachmentWarning {
                                scan_id: scan.id.clone(),
                                attachment_id,
                                message: reason,
                            });
                        }
                    }
                }
            }

            scan.processed_issues += page_len;
            // Advance by the page's actual length, not the configured page
            // size: a page shorter than page_size does not mean the result
            // set is exhausted until an empty page is returned.
            offset += page_len;
            issues_since_checkpoint += page_len;

            let _ = self
                .events
                .send(progress::progress_event(&scan.id, scan.processed_issues, scan.total_issues, &stats));

            if issues_since_checkpoint >= self.config.storage.checkpoint_interval as i64 {
                self.store
                    .save_progress(&scan, &stats, &catalog, offset, last_issue_key.as_deref())
                    .await?;
                let _ = self.events.send(Event::Checkpointed {
                    scan_id: scan.id.clone(),
                    next_offset: offset,
                });
                issues_since_checkpoint = 0;
            }
        }

        let completed_at = Utc::now();
        let duration_seconds = (completed_at - scan.started_at).num_seconds().max(0);
        scan.status = ScanStatus::Completed;
        scan.completed_at = Some(completed_at);
        scan.duration_seconds = Some(duration_seconds);

        self.store
            .save_progress(&scan, &stats, &catalog, offset, last_issue_key.as_deref())
            .await?;
        self.store.complete_scan(&scan.id, completed_at, duration_seconds).await?;

        let quick_wins = progress::quick_wins(&catalog);
        let _ = self.events.send(Event::ScanCompleted {
            scan_id: scan.id.clone(),
            duration_seconds,
        });

        Ok(ResultDocument {
            scan,
            stats,
            duplicate_groups: catalog,
            quick_wins,
        })
    }
}

fn fallback_warning(source: &HashSource) -> Option<String> {
    match source {
        HashSource::Content => None,
        // The configured fast path, not a failure: nothing to warn about.
        HashSource::UrlOnly => None,
        HashSource::OversizeSkip => Some("attachment exceeds max_file_bytes, used url hash".to_string()),
        HashSource::UrlFallback { reason } => Some(match reason {
            FallbackReason::Truncated => "download truncated, used url hash".to_string(),
            FallbackReason::Timeout => "download timed out, used url hash".to_string(),
            FallbackReason::OtherIo => "download failed, used url hash".to_string(),
        }),
    }
}

fn generate_scan_id() -> String {
    let mut rng = rand::thread_rng();
    (0..SCAN_ID_LENGTH)
        .map(|_| SCAN_ID_ALPHABET[rng.gen_range(0..SCAN_ID_ALPHABET.len())] as char)
        .collect()
}
