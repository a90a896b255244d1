//! Error types for site-meta
//!
//! This module provides the error hierarchy for the inspection pipeline using
//! `thiserror`. Parsing never produces an error: malformed markup degrades to
//! absent fields instead.

use serde::Serialize;
use thiserror::Error;

/// The main error type for site-meta operations
#[derive(Error, Debug)]
pub enum Error {
    /// The supplied URL could not be normalized into an absolute http(s) URL
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    /// The target document could not be fetched
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// HTTP server errors (bind, serve)
    #[error("Server error: {0}")]
    Server(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Error returned by the pipeline entry point.
pub type PipelineError = Error;

/// Errors raised while normalizing user input into a URL
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    /// Nothing was supplied
    #[error("URL cannot be empty")]
    Empty,

    /// The input does not form a valid http(s) URL
    #[error("Invalid URL '{input}': {reason}")]
    InvalidUrl {
        /// The raw input as supplied by the caller
        input: String,
        /// Why it was rejected
        reason: String,
    },

    /// The request's query string could not be read
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

/// Classification of a fetch failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum FetchErrorKind {
    /// Connection, DNS, TLS or body read failure
    Network,
    /// The request did not complete within the configured timeout
    Timeout,
    /// The final response status was outside 200-299
    HttpStatus(u16),
    /// The response was not an HTML document
    InvalidContentType(String),
    /// A relayed body exceeded the size limit (bytes)
    BodyTooLarge(usize),
}

impl FetchErrorKind {
    /// Stable short name, used in logs and API error bodies
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchErrorKind::Network => "network",
            FetchErrorKind::Timeout => "timeout",
            FetchErrorKind::HttpStatus(_) => "http_status",
            FetchErrorKind::InvalidContentType(_) => "invalid_content_type",
            FetchErrorKind::BodyTooLarge(_) => "body_too_large",
        }
    }
}

/// A failed fetch, carrying the URL that triggered it
#[derive(Error, Debug, Clone)]
#[error("{} fetching {url}: {message}", .kind.as_str())]
pub struct FetchError {
    /// What went wrong
    pub kind: FetchErrorKind,
    /// The URL that was requested
    pub url: String,
    /// Human readable detail
    pub message: String,
}

impl FetchError {
    /// Create a new fetch error
    pub fn new<U: Into<String>, M: Into<String>>(
        kind: FetchErrorKind,
        url: U,
        message: M,
    ) -> Self {
        Self {
            kind,
            url: url.into(),
            message: message.into(),
        }
    }

    /// Classify a reqwest failure for the given URL
    pub fn from_reqwest(url: &str, err: &reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            FetchErrorKind::Timeout
        } else {
            FetchErrorKind::Network
        };
        Self::new(kind, url, err.to_string())
    }
}

/// Result type alias for site-meta operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a server error from a string
    pub fn server<S: Into<String>>(msg: S) -> Self {
        Error::Server(msg.into())
    }

    /// Short machine-readable category of this error
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Input(_) => "input",
            Error::Fetch(e) => e.kind.as_str(),
            Error::Server(_) => "server",
            Error::Io(_) => "io",
            Error::Json(_) => "json",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_error_display() {
        let err = InputError::InvalidUrl {
            input: "ftp://x".to_string(),
            reason: "unsupported scheme".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid URL 'ftp://x': unsupported scheme");
        assert_eq!(InputError::Empty.to_string(), "URL cannot be empty");
    }

    #[test]
    fn test_fetch_error_display() {
        let err = FetchError::new(
            FetchErrorKind::HttpStatus(404),
            "https://example.com/missing",
            "status 404 Not Found",
        );
        let msg = err.to_string();
        assert!(msg.starts_with("http_status fetching https://example.com/missing"));
        assert!(msg.contains("404"));
    }

    #[test]
    fn test_error_kind() {
        let err: Error = FetchError::new(FetchErrorKind::Timeout, "https://x.test", "slow").into();
        assert_eq!(err.kind(), "timeout");

        let err: Error = InputError::Empty.into();
        assert_eq!(err.kind(), "input");
        assert!(err.to_string().contains("URL cannot be empty"));
    }

    #[test]
    fn test_fetch_error_kind_serialization() {
        let json = serde_json::to_string(&FetchErrorKind::HttpStatus(500)).unwrap();
        assert_eq!(json, r#"{"kind":"http_status","detail":500}"#);

        let json = serde_json::to_string(&FetchErrorKind::Network).unwrap();
        assert_eq!(json, r#"{"kind":"network"}"#);

        let json = serde_json::to_string(&FetchErrorKind::BodyTooLarge(1024)).unwrap();
        assert_eq!(json, r#"{"kind":"body_too_large","detail":1024}"#);
    }

    #[test]
    fn test_server_error() {
        let err = Error::server("address in use");
        assert_eq!(err.to_string(), "Server error: address in use");
    }
}
