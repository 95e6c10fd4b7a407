//! Conditional HTTP fetch client.
//!
//! One `HttpFetcher` is built per source kind with that kind's timeout,
//! user agent and accept header. It sends the stored cache validators and
//! reports the response as a `FetchOutcome`; it never touches source state.

use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use reqwest::header::{
    ACCEPT, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED, RETRY_AFTER,
};
use reqwest::{Client, Response, StatusCode};
use url::Url;

use crate::config::{RssIngestConfig, YoutubeIngestConfig};
use crate::feed::text::truncate_chars;
use crate::{IngestError, Result};

/// Connect timeout in seconds.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 5;

/// Bytes of an error body kept for diagnostics.
const MAX_ERROR_BODY_BYTES: usize = 4096;

/// Characters of an error body kept in the outcome.
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Accept header for generic syndication feeds.
pub const RSS_ACCEPT: &str =
    "application/rss+xml, application/atom+xml, application/xml;q=0.9, text/xml;q=0.8, */*;q=0.5";

/// Accept header for YouTube channel feeds.
pub const YOUTUBE_ACCEPT: &str = "application/atom+xml, application/xml;q=0.9, */*;q=0.5";

/// One conditional GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Target URL.
    pub url: String,
    /// Sent as `If-None-Match`.
    pub etag: Option<String>,
    /// Sent as `If-Modified-Since`.
    pub last_modified: Option<String>,
}

impl FetchRequest {
    /// Create an unconditional request.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            etag: None,
            last_modified: None,
        }
    }

    /// Attach stored validators.
    pub fn with_validators(mut self, etag: Option<String>, last_modified: Option<String>) -> Self {
        self.etag = etag.filter(|v| !v.trim().is_empty());
        self.last_modified = last_modified.filter(|v| !v.trim().is_empty());
        self
    }
}

/// Result of one fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// 304: content unchanged since the stored validators.
    NotModified,
    /// 429, 502 or 503: the origin asked us to back off.
    Throttled {
        /// Response status.
        status: u16,
        /// `Retry-After` header, if any.
        retry_after: Option<String>,
    },
    /// Any other non-success status.
    HttpError {
        /// Response status.
        status: u16,
        /// Start of the response body.
        body: String,
    },
    /// 2xx with the full body.
    Success {
        /// Response body.
        body: Bytes,
        /// Returned `ETag`.
        etag: Option<String>,
        /// Returned `Last-Modified`.
        last_modified: Option<String>,
    },
}

/// Network seam used by the source strategies.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    /// Perform one conditional GET.
    ///
    /// Transport failures (connect, timeout, oversize body) are returned as
    /// errors; every HTTP response maps to an outcome.
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchOutcome>;
}

/// Settings for one `HttpFetcher`.
#[derive(Debug, Clone)]
pub struct FetcherSettings {
    /// User agent.
    pub user_agent: String,
    /// Total request timeout.
    pub timeout: Duration,
    /// Accept header.
    pub accept: String,
    /// Largest body accepted.
    pub max_body_bytes: u64,
}

impl FetcherSettings {
    /// Settings for RSS/Atom feeds.
    pub fn rss(config: &RssIngestConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            timeout: config.request_timeout(),
            accept: RSS_ACCEPT.to_string(),
            max_body_bytes: config.max_feed_size_bytes,
        }
    }

    /// Settings for YouTube channel feeds.
    pub fn youtube(config: &YoutubeIngestConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            timeout: config.request_timeout(),
            accept: YOUTUBE_ACCEPT.to_string(),
            max_body_bytes: config.max_feed_size_bytes,
        }
    }
}

/// `reqwest` implementation of `FeedFetcher`.
pub struct HttpFetcher {
    client: Client,
    accept: String,
    max_body_bytes: u64,
}

impl HttpFetcher {
    /// Build the client.
    pub fn new(settings: FetcherSettings) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS).min(settings.timeout))
            .timeout(settings.timeout)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(settings.user_agent)
            .gzip(true)
            .deflate(true)
            .build()
            .map_err(|e| IngestError::Http(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            accept: settings.accept,
            max_body_bytes: settings.max_body_bytes,
        })
    }

    async fn read_body(&self, mut response: Response) -> Result<Bytes> {
        if let Some(content_length) = response.content_length() {
            if content_length > self.max_body_bytes {
                return Err(too_large(content_length, self.max_body_bytes));
            }
        }

        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await? {
            if (body.len() + chunk.len()) as u64 > self.max_body_bytes {
                return Err(too_large(
                    (body.len() + chunk.len()) as u64,
                    self.max_body_bytes,
                ));
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body.freeze())
    }
}

#[async_trait]
impl FeedFetcher for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchOutcome> {
        let url = validate_url(&request.url)?;

        let mut builder = self.client.get(url).header(ACCEPT, self.accept.as_str());
        if let Some(etag) = &request.etag {
            builder = builder.header(IF_NONE_MATCH, etag.as_str());
        }
        if let Some(last_modified) = &request.last_modified {
            builder = builder.header(IF_MODIFIED_SINCE, last_modified.as_str());
        }

        let response = builder.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_MODIFIED {
            return Ok(FetchOutcome::NotModified);
        }
        if is_throttle_status(status) {
            return Ok(FetchOutcome::Throttled {
                status: status.as_u16(),
                retry_after: header_value(&response, RETRY_AFTER),
            });
        }
        if !status.is_success() {
            return Ok(FetchOutcome::HttpError {
                status: status.as_u16(),
                body: read_error_body(response).await,
            });
        }

        let etag = header_value(&response, ETAG);
        let last_modified = header_value(&response, LAST_MODIFIED);
        let body = self.read_body(response).await?;

        Ok(FetchOutcome::Success {
            body,
            etag,
            last_modified,
        })
    }
}

/// Statuses treated as a request to back off rather than a failure.
pub fn is_throttle_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS | StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE
    )
}

/// Accept only absolute http(s) URLs with a host.
pub fn validate_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url.trim())
        .map_err(|e| IngestError::Validation(format!("invalid URL {url:?}: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(IngestError::Validation(format!(
                "unsupported URL scheme: {other}"
            )))
        }
    }

    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(IngestError::Validation(format!("URL has no host: {url}")));
    }

    Ok(parsed)
}

fn header_value(response: &Response, name: reqwest::header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

async fn read_error_body(mut response: Response) -> String {
    let mut body = Vec::new();
    // Best effort: a broken error body still leaves the status to report.
    while let Ok(Some(chunk)) = response.chunk().await {
        body.extend_from_slice(&chunk);
        if body.len() >= MAX_ERROR_BODY_BYTES {
            break;
        }
    }
    let text = String::from_utf8_lossy(&body);
    truncate_chars(text.trim(), MAX_ERROR_BODY_CHARS)
}

fn too_large(size: u64, max: u64) -> IngestError {
    IngestError::Validation(format!("feed too large: {size} bytes (max {max} bytes)"))
}
