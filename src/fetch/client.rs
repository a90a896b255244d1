//! HTTP fetcher
//!
//! Retrieves a target document with caching disabled and redirects followed,
//! returning the post-redirect URL alongside the raw document text. All
//! relative URL resolution downstream is done against that final URL.

use crate::error::{FetchError, FetchErrorKind};
use chrono::{DateTime, Utc};
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE as ACCEPT_LANGUAGE_HEADER, CACHE_CONTROL,
    CONTENT_TYPE, EXPIRES, PRAGMA, USER_AGENT,
};
use reqwest::{redirect, Client};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// User agent sent when the caller has not configured one
pub const DEFAULT_USER_AGENT: &str = concat!(
    "Mozilla/5.0 (compatible; site-meta/",
    env!("CARGO_PKG_VERSION"),
    "; metadata checker)"
);

/// Fixed `Accept-Language` preference list
pub const ACCEPT_LANGUAGE: &str = "en-GB-oxendict,en-GB;q=0.9,en;q=0.8,id;q=0.7,en-US;q=0.6";

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8";

/// Content types accepted as HTML documents
const HTML_CONTENT_TYPES: [&str; 2] = ["text/html", "application/xhtml+xml"];

/// Settings supplied by the user for each inspection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSettings {
    /// `User-Agent` header sent to the target site
    pub user_agent: String,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl UserSettings {
    /// Settings with a custom user agent; blank values fall back to the default
    pub fn with_user_agent<S: AsRef<str>>(user_agent: S) -> Self {
        let ua = user_agent.as_ref().trim();
        if ua.is_empty() {
            Self::default()
        } else {
            Self {
                user_agent: ua.to_string(),
            }
        }
    }
}

/// Transport configuration for the fetcher
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Whole-request timeout in milliseconds (default: 15000)
    pub timeout_ms: u64,
    /// Maximum number of body bytes read (default: 5 MiB)
    pub max_document_bytes: usize,
    /// Maximum redirect hops followed (default: 10)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 15_000,
            max_document_bytes: 5 * 1024 * 1024,
            max_redirects: 10,
        }
    }
}

impl FetchConfig {
    /// Create a new config builder
    pub fn builder() -> FetchConfigBuilder {
        FetchConfigBuilder::default()
    }
}

/// Builder for FetchConfig
#[derive(Default)]
pub struct FetchConfigBuilder {
    config: FetchConfig,
}

impl FetchConfigBuilder {
    /// Set request timeout
    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.config.timeout_ms = ms;
        self
    }

    /// Set body size limit
    pub fn max_document_bytes(mut self, bytes: usize) -> Self {
        self.config.max_document_bytes = bytes;
        self
    }

    /// Set redirect limit
    pub fn max_redirects(mut self, hops: usize) -> Self {
        self.config.max_redirects = hops;
        self
    }

    /// Build the config
    pub fn build(self) -> FetchConfig {
        self.config
    }
}

/// A successfully fetched document
#[derive(Debug, Clone, Serialize)]
pub struct FetchResult {
    /// URL after all redirects were followed
    pub final_url: Url,
    /// Document text exactly as received (lossily decoded, size-bounded)
    pub raw_document: String,
    /// HTTP status of the final response
    pub status_code: u16,
    /// `Content-Type` of the final response, if sent
    pub content_type: Option<String>,
    /// When the response was received
    pub fetched_at: DateTime<Utc>,
}

/// HTTP client for target documents.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    /// Creates a fetcher with the default configuration
    pub fn new() -> Result<Self, FetchError> {
        Self::with_config(FetchConfig::default())
    }

    /// Creates a fetcher with a custom configuration
    pub fn with_config(config: FetchConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .redirect(redirect::Policy::limited(config.max_redirects))
            .default_headers(profile_headers())
            .build()
            .map_err(|e| FetchError::from_reqwest("", &e))?;
        Ok(Self { client, config })
    }

    /// Active configuration
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Underlying HTTP client, shared with pass-through handlers
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Fetch a document.
    ///
    /// Dropping the returned future aborts the request.
    #[instrument(skip(self, settings), fields(url = %url))]
    pub async fn fetch(
        &self,
        url: &Url,
        settings: &UserSettings,
    ) -> Result<FetchResult, FetchError> {
        info!("Fetching document");

        let mut response = self
            .client
            .get(url.clone())
            .header(USER_AGENT, settings.user_agent.as_str())
            .send()
            .await
            .map_err(|e| {
                warn!("Request failed: {}", e);
                FetchError::from_reqwest(url.as_str(), &e)
            })?;

        let final_url = response.url().clone();
        let status = response.status();
        if final_url != *url {
            debug!("Redirected to {}", final_url);
        }

        if !status.is_success() {
            warn!("Non-success status {}", status);
            return Err(FetchError::new(
                FetchErrorKind::HttpStatus(status.as_u16()),
                url.as_str(),
                format!("{} returned status {}", final_url, status),
            ));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_string());

        if let Some(ct) = content_type.as_deref() {
            if !is_html_content_type(ct) {
                warn!("Rejecting content type {}", ct);
                return Err(FetchError::new(
                    FetchErrorKind::InvalidContentType(ct.to_string()),
                    url.as_str(),
                    format!("expected an HTML document, got '{}'", ct),
                ));
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| FetchError::from_reqwest(url.as_str(), &e))?
        {
            let room = self.config.max_document_bytes.saturating_sub(body.len());
            if chunk.len() >= room {
                body.extend_from_slice(&chunk[..room]);
                debug!(
                    "Document exceeds {} bytes, truncating",
                    self.config.max_document_bytes
                );
                break;
            }
            body.extend_from_slice(&chunk);
        }

        let raw_document = String::from_utf8_lossy(&body).into_owned();
        info!(
            status = status.as_u16(),
            bytes = raw_document.len(),
            final_url = %final_url,
            "Fetched document"
        );

        Ok(FetchResult {
            final_url,
            raw_document,
            status_code: status.as_u16(),
            content_type,
            fetched_at: Utc::now(),
        })
    }
}

/// Headers sent with every request; the user agent is set per request
fn profile_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
    headers.insert(ACCEPT_LANGUAGE_HEADER, HeaderValue::from_static(ACCEPT_LANGUAGE));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(EXPIRES, HeaderValue::from_static("0"));
    headers
}

/// Whether a `Content-Type` value denotes an HTML document
pub fn is_html_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    HTML_CONTENT_TYPES.contains(&essence.as_str())
}
