//! Image pass-through
//!
//! `GET /proxy?url=` relays a remote resource (typically an `og:image` or a
//! favicon) so a browser UI can display it without tripping over hotlink
//! protection or mixed content. Bytes and content type are passed through
//! untouched; nothing here looks at metadata. Bodies are bounded by the
//! fetcher's `max_document_bytes`, and larger ones are refused.

use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::{debug, field, instrument, warn, Span};
use url::Url;

use super::inspect::{settings_from_headers, ApiError};
use super::AppState;
use crate::error::{FetchError, FetchErrorKind, InputError};

/// Query string of `/proxy`
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyQuery {
    /// Absolute http(s) URL to relay
    #[serde(default)]
    pub url: String,
}

/// Parse a relay target; only absolute http(s) URLs with a host qualify.
pub fn proxy_target(raw: &str) -> Result<Url, InputError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(InputError::Empty);
    }
    let url = Url::parse(raw).map_err(|e| InputError::InvalidUrl {
        input: raw.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") || !url.has_host() {
        return Err(InputError::InvalidUrl {
            input: raw.to_string(),
            reason: "only absolute http(s) URLs can be proxied".to_string(),
        });
    }
    Ok(url)
}

/// `GET /proxy?url=`
#[instrument(skip_all, fields(url = field::Empty))]
pub async fn proxy_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    query: Result<Query<ProxyQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    Span::current().record("url", query.url.as_str());
    let target = proxy_target(&query.url).map_err(|e| ApiError::new(e.into(), &query.url))?;
    let settings = settings_from_headers(&headers, state.default_settings());

    let fail = |e: reqwest::Error| {
        warn!("Proxy request failed: {}", e);
        ApiError::new(FetchError::from_reqwest(target.as_str(), &e).into(), target.as_str())
    };

    let mut response = state
        .inspector()
        .fetcher()
        .client()
        .get(target.clone())
        .header(header::USER_AGENT, settings.user_agent.as_str())
        .send()
        .await
        .map_err(fail)?;

    let status = response.status();
    if !status.is_success() {
        return Err(ApiError::new(
            FetchError::new(
                FetchErrorKind::HttpStatus(status.as_u16()),
                target.as_str(),
                format!("upstream returned status {}", status),
            )
            .into(),
            target.as_str(),
        ));
    }

    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));

    let limit = state.inspector().fetcher().config().max_document_bytes;
    let too_large = || {
        warn!(limit, "Upstream body exceeds relay limit");
        ApiError::new(
            FetchError::new(
                FetchErrorKind::BodyTooLarge(limit),
                target.as_str(),
                format!("upstream body exceeds {} bytes", limit),
            )
            .into(),
            target.as_str(),
        )
    };
    if response.content_length().is_some_and(|len| len > limit as u64) {
        return Err(too_large());
    }

    let mut bytes = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(fail)? {
        if bytes.len() + chunk.len() > limit {
            return Err(too_large());
        }
        bytes.extend_from_slice(&chunk);
    }
    debug!(bytes = bytes.len(), "Relayed resource");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-store")),
        ],
        bytes,
    )
        .into_response())
}
