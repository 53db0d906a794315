//! Pooled HTTP client for the remote issue-tracker
//!
//! Two operation classes: JSON API calls (`count`, `search`, `ping`) and
//! streaming attachment downloads (`download`). Every request path acquires
//! the shared [`RateLimiter`] first; the JSON calls are wrapped in
//! [`crate::retry::with_retry`], the streaming download path is not (a
//! partial download is the download pool's problem to classify, not this
//! client's to retry blindly).

use crate::config::{Credentials, RemoteConfig, RetryConfig, ScanConfig};
use crate::error::{Error, RemoteError, Result};
use crate::rate_limiter::RateLimiter;
use crate::remote::SearchPage;
use crate::retry::with_retry;
use bytes::Bytes;
use futures::Stream;
use reqwest::StatusCode;
use std::pin::Pin;
use std::time::Duration;

/// Authenticated, rate-limited, pooled HTTP client
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    credentials: Credentials,
    rate_limiter: RateLimiter,
    retry: RetryConfig,
}

impl Client {
    /// Build a client from configuration
    ///
    /// The connection pool is sized to `2 * worker_count`: one slot per
    /// concurrent download plus headroom for the driver's own
    /// search/count/ping calls interleaved with in-flight downloads.
    pub fn new(remote: &RemoteConfig, scan: &ScanConfig, retry: RetryConfig) -> Result<Self> {
        let credentials = remote.credentials()?;

        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(2 * scan.worker_count)
            .timeout(scan.download_timeout())
            .danger_accept_invalid_certs(!remote.verify_ssl)
            .build()
            .map_err(Error::Network)?;

        Ok(Self {
            http,
            base_url: remote.base_url.trim_end_matches('/').to_string(),
            credentials,
            rate_limiter: RateLimiter::new(scan.rate_limit_per_second),
            retry,
        })
    }

    fn apply_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.credentials {
            Credentials::Bearer(token) => builder.bearer_auth(token),
            Credentials::Basic { username, password } => builder.basic_auth(username, Some(password)),
        }
    }

    /// Returns the total matching issue count for `predicate`
    ///
    /// Implemented as `search` with `page_size = 0`: the remote tracker
    /// returns only the `total` field without issue bodies.
    pub async fn count(&self, predicate: &str) -> Result<i64> {
        let page = self.search(predicate, 0, 0, DEFAULT_FIELDS).await?;
        Ok(page.total)
    }

    /// Fetches one page of matching issues
    pub async fn search(&self, predicate: &str, offset: i64, page_size: i64, fields: &str) -> Result<SearchPage> {
        with_retry(&self.retry, || async {
            self.rate_limiter.acquire().await;

            let response = self
                .apply_auth(self.http.get(format!("{}/rest/api/2/search", self.base_url)))
                .query(&[
                    ("jql", predicate),
                    ("startAt", &offset.to_string()),
                    ("maxResults", &page_size.to_string()),
                    ("fields", fields),
                ])
                .send()
                .await
                .map_err(Error::Network)?;

            let response = classify_status(response).await?;
            response.json::<SearchPage>().await.map_err(|e| {
                Error::Remote(RemoteError::UnexpectedResponse(format!("malformed search response: {e}")))
            })
        })
        .await
    }

    /// Streams an attachment's content bytes
    ///
    /// Not wrapped in retry: a failure partway through a stream should be
    /// classified by the caller (truncated vs timeout vs other) rather than
    /// silently retried here.
    pub async fn download(&self, url: &str, timeout: Duration) -> Result<Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>> {
        self.rate_limiter.acquire().await;

        let response = self
            .apply_auth(self.http.get(url))
            .timeout(timeout)
            .send()
            .await
            .map_err(Error::Network)?;

        let response = classify_status(response).await?;
        Ok(Box::pin(response.bytes_stream()))
    }

    /// Authenticated self-check; `Ok(())` iff the remote tracker returns 200
    pub async fn ping(&self) -> Result<()> {
        with_retry(&self.retry, || async {
            self.rate_limiter.acquire().await;

            let response = self
                .apply_auth(self.http.get(format!("{}/rest/api/2/myself", self.base_url)))
                .send()
                .await
                .map_err(Error::Network)?;

            classify_status(response).await?;
            Ok(())
        })
        .await
    }
}

const DEFAULT_FIELDS: &str = "key,project,status,updated,attachment";

async fn classify_status(response: reqwest::Response) -> Result<reqwest::Response> {
    match response.status() {
        status if status.is_success() => Ok(response),
        StatusCode::UNAUTHORIZED => Err(Error::Remote(RemoteError::Authentication)),
        StatusCode::FORBIDDEN => Err(Error::Remote(RemoteError::Authorization)),
        StatusCode::TOO_MANY_REQUESTS => Err(Error::Remote(RemoteError::RateLimited)),
        status if status.is_server_error() => {
            Err(Error::Remote(RemoteError::Transport(format!("server error {status}"))))
        }
        status => Err(Error::Remote(RemoteError::UnexpectedResponse(format!("status {status}")))),
    }
}

/// Build the final predicate string from configured filters
///
/// Exactly the logic in `fix_jql.py`'s `build_jql_query`: a custom predicate
/// overrides everything (an ordering clause is appended if it lacks one);
/// otherwise AND-combine project/date filters, defaulting to a 20-year
/// lookback when neither date bound is set, and always append the ordering
/// clause. The ordering clause is mandatory: stable pagination depends on
/// every page request returning issues in the same total order.
pub fn build_predicate(filters: &crate::config::FilterConfig) -> String {
    if let Some(custom) = &filters.custom_predicate {
        let mut predicate = custom.clone();
        if !predicate.to_uppercase().contains("ORDER BY") {
            predicate.push_str(" ORDER BY created DESC");
        }
        return predicate;
    }

    let mut parts = Vec::new();

    if !filters.projects.is_empty() {
        parts.push(format!("project in ({})", filters.projects.join(", ")));
    }

    if let Some(date_from) = &filters.date_from {
        parts.push(format!("created >= '{date_from}'"));
    }

    if let Some(date_to) = &filters.date_to {
        parts.push(format!("created <= '{date_to}'"));
    }

    if filters.date_from.is_none() && filters.date_to.is_none() {
        parts.push("created >= -7300d".to_string());
    }

    let mut predicate = if parts.is_empty() {
        "created >= -7300d".to_string()
    } else {
        parts.join(" AND ")
    };
    predicate.push_str(" ORDER BY created DESC");
    predicate
}
