//! Streaming content fingerprint
//!
//! SHA-256 over a streamed response body, without buffering the whole
//! attachment in memory. Hex formatting uses `format!("{:x}", ...)` directly
//! rather than pulling in a separate hex crate.

use futures::Stream;
use futures::StreamExt;
use sha2::{Digest, Sha256};

/// Error produced while draining a byte stream for hashing
#[derive(Debug, thiserror::Error)]
pub enum StreamHashError {
    /// The underlying stream yielded an error chunk
    #[error("stream error while hashing: {0}")]
    Stream(String),
}

/// Hash a stream of byte chunks, skipping empty chunks
///
/// Returns the lowercase hex digest and the total byte count observed,
/// since callers need both (the count is used to detect truncated
/// transfers against the declared `file_size`).
pub async fn hash_stream<S, E>(mut stream: S) -> Result<(String, u64), StreamHashError>
where
    S: Stream<Item = Result<bytes::Bytes, E>> + Unpin,
    E: std::fmt::Display,
{
    let mut hasher = Sha256::new();
    let mut total: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| StreamHashError::Stream(e.to_string()))?;
        if chunk.is_empty() {
            continue;
        }
        hasher.update(&chunk);
        total += chunk.len() as u64;
    }

    Ok((format!("{:x}", hasher.finalize()), total))
}

/// Hash a content URL as a fallback fingerprint when the bytes themselves
/// could not be fetched
///
/// Distinct fingerprint space from content hashes only in the sense that a
/// URL happening to collide with a real content digest is astronomically
/// unlikely; no separate prefix is used, matching how the original tool's
/// fallback was computed.
pub fn hash_url(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    format!("{:x}", hasher.finalize())
}
