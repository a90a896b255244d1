//! CORS policy for the local inspection server
//!
//! The server is meant to be driven from a browser tab on the same machine,
//! so only loopback origins are admitted:
//!
//! - **Allowed Origins**: loopback hosts (`localhost`, `127.0.0.1`, `[::1]`,
//!   `0.0.0.0`) on any port
//! - **Allowed Methods**: GET, OPTIONS (preflight)
//! - **Allowed Headers**: Content-Type
//! - **Max Age**: 3600 seconds for preflight caching
//!
//! # Example
//!
//! ```rust,ignore
//! use site_meta::cors::cors_layer;
//! use axum::Router;
//!
//! let app = Router::new()
//!     .route("/api/metadata", get(metadata_handler))
//!     .layer(cors_layer());
//! ```

use http::{header::HeaderValue, Method};
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use url::Url;

use crate::fetch::input::is_localhost;

/// Request headers a browser client may send
pub const ALLOWED_HEADERS: [http::header::HeaderName; 1] = [http::header::CONTENT_TYPE];

/// Methods exposed by the inspection API
pub const ALLOWED_METHODS: [Method; 2] = [Method::GET, Method::OPTIONS];

/// Default max age for preflight cache (1 hour)
pub const DEFAULT_MAX_AGE_SECS: u64 = 3600;

/// CORS layer admitting loopback origins only.
///
/// Credentials are allowed so the `userAgent` cookie set by the UI reaches
/// the inspection handlers.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(|origin, _| {
            is_localhost_origin(origin)
        }))
        .allow_methods(ALLOWED_METHODS)
        .allow_headers(ALLOWED_HEADERS)
        .allow_credentials(true)
        .max_age(Duration::from_secs(DEFAULT_MAX_AGE_SECS))
}

/// Checks if the given Origin header names a loopback host.
///
/// The origin must parse as an absolute http(s) URL whose host is a
/// loopback name (see [`is_localhost`]). Lookalikes such as
/// `http://localhost.evil.com` or `http://localhostevil.com` are rejected,
/// as are other private addresses.
///
/// ```rust
/// use http::header::HeaderValue;
/// use site_meta::cors::is_localhost_origin;
///
/// assert!(is_localhost_origin(&HeaderValue::from_static("http://localhost:3050")));
/// assert!(!is_localhost_origin(&HeaderValue::from_static("http://example.com")));
/// ```
pub fn is_localhost_origin(origin: &HeaderValue) -> bool {
    let Ok(origin) = origin.to_str() else {
        return false;
    };
    let Ok(url) = Url::parse(origin) else {
        return false;
    };
    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }
    if url.port() == Some(0) {
        return false;
    }
    is_localhost(&url)
}
