//! Bounded concurrent download + hash fan-out
//!
//! Per-item failures never abort a batch: each attachment's fallback ladder
//! (oversize skip -> content hash -> truncated/timeout/other-io -> URL hash
//! -> drop) is handled independently, grounded directly on
//! `_download_and_hash_single` from the original tool's error-handling fix.

use crate::client::Client;
use crate::hasher::{hash_stream, hash_url};
use crate::remote::AttachmentMeta;
use crate::types::{FallbackReason, HashSource};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// The outcome of fingerprinting a single attachment
#[derive(Clone, Debug)]
pub enum WorkerOutcome {
    /// A fingerprint was produced, by whatever means
    Hashed {
        /// The attachment's metadata and issue context
        meta: AttachmentMeta,
        /// Lowercase hex content fingerprint
        fingerprint: String,
        /// How the fingerprint was derived
        source: HashSource,
    },
    /// No fingerprint could be produced; the attachment is excluded from
    /// this batch's results
    Dropped {
        /// The attachment id that was dropped
        attachment_id: String,
        /// Why it was dropped
        reason: String,
    },
}

/// Bounded concurrent fan-out over a batch of attachments
pub struct DownloadPool {
    client: Arc<Client>,
    semaphore: Arc<Semaphore>,
    max_file_bytes: u64,
    download_timeout: Duration,
    use_content_hash: bool,
    cancel: CancellationToken,
}

impl DownloadPool {
    /// Build a pool bounded to `worker_count` concurrent downloads
    pub fn new(
        client: Arc<Client>,
        worker_count: usize,
        max_file_bytes: u64,
        download_timeout: Duration,
        use_content_hash: bool,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            semaphore: Arc::new(Semaphore::new(worker_count)),
            max_file_bytes,
            download_timeout,
            use_content_hash,
            cancel,
        }
    }

    /// Fingerprint every attachment in `batch`, fanned out over the
    /// semaphore-bounded worker set
    ///
    /// Returns one [`WorkerOutcome`] per surviving attachment, in whatever
    /// order tasks complete (unspecified, per design). Always runs the
    /// batch to completion: the driver checks cancellation only at page
    /// boundaries, between calls to this method, so that a page's issues
    /// are never partially classified while its checkpoint still advances
    /// past all of them.
    pub async fn run_batch(&self, batch: Vec<AttachmentMeta>) -> Vec<WorkerOutcome> {
        let mut tasks = Vec::with_capacity(batch.len());

        for meta in batch {
            let permit = self.semaphore.clone().acquire_owned().await.expect("semaphore never closed");
            let client = self.client.clone();
            let max_file_bytes = self.max_file_bytes;
            let download_timeout = self.download_timeout;
            let use_content_hash = self.use_content_hash;

            tasks.push(tokio::spawn(async move {
                let _permit = permit;
                fingerprint_one(&client, meta, max_file_bytes, download_timeout, use_content_hash).await
            }));
        }

        let mut outcomes = Vec::with_capacity(tasks.len());
        for task in tasks {
            match task.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => tracing::error!(error = %e, "download worker task panicked"),
            }
        }
        outcomes
    }

    /// Awaits all in-flight workers and stops accepting new batches
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let _ = self
            .semaphore
            .acquire_many(self.semaphore.available_permits() as u32)
            .await;
    }
}

async fn fingerprint_one(
    client: &Client,
    meta: AttachmentMeta,
    max_file_bytes: u64,
    download_timeout: Duration,
    use_content_hash: bool,
) -> WorkerOutcome {
    let attachment_id = meta.attachment.id.clone();

    if meta.attachment.size > max_file_bytes {
        tracing::info!(
            attachment_id = %attachment_id,
            size = meta.attachment.size,
            max = max_file_bytes,
            "attachment exceeds max_file_bytes, using url hash without fetching"
        );
        return WorkerOutcome::Hashed {
            fingerprint: hash_url(&meta.attachment.content),
            source: HashSource::OversizeSkip,
            meta,
        };
    }

    if !use_content_hash {
        return WorkerOutcome::Hashed {
            fingerprint: hash_url(&meta.attachment.content),
            source: HashSource::UrlOnly,
            meta,
        };
    }

    match client.download(&meta.attachment.content, download_timeout).await {
        Ok(stream) => match hash_stream(stream).await {
            Ok((fingerprint, total_bytes)) if total_bytes >= meta.attachment.size => WorkerOutcome::Hashed {
                fingerprint,
                source: HashSource::Content,
                meta,
            },
            Ok((_fingerprint, total_bytes)) => {
                tracing::warn!(
                    attachment_id = %attachment_id,
                    received = total_bytes,
                    declared = meta.attachment.size,
                    "download truncated, falling back to url hash"
                );
                WorkerOutcome::Hashed {
                    fingerprint: hash_url(&meta.attachment.content),
                    source: HashSource::UrlFallback {
                        reason: FallbackReason::Truncated,
                    },
                    meta,
                }
            }
            Err(e) => {
                // A stream error mid-transfer (e.g. `ChunkedEncodingError`) is
                // the same truncation case as a short-but-clean read above,
                // just surfaced as an error instead of a short byte count.
                tracing::warn!(attachment_id = %attachment_id, error = %e, "download truncated, falling back to url hash");
                WorkerOutcome::Hashed {
                    fingerprint: hash_url(&meta.attachment.content),
                    source: HashSource::UrlFallback {
                        reason: FallbackReason::Truncated,
                    },
                    meta,
                }
            }
        },
        Err(e) => {
            let reason = if is_timeout(&e) {
                FallbackReason::Timeout
            } else {
                FallbackReason::OtherIo
            };
            tracing::warn!(attachment_id = %attachment_id, error = %e, ?reason, "download failed, falling back to url hash");
            WorkerOutcome::Hashed {
                fingerprint: hash_url(&meta.attachment.content),
                source: HashSource::UrlFallback { reason },
                meta,
            }
        }
    }
}

fn is_timeout(error: &crate::error::Error) -> bool {
    matches!(error, crate::error::Error::Network(e) if e.is_timeout())
}
