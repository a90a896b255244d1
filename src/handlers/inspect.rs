//! Inspection endpoints
//!
//! - `GET /api/metadata?url=` - resolved metadata as JSON
//! - `GET /api/raw?url=[&head_only=true]` - fetched document as plain text
//!
//! The fetch user agent comes from the `userAgent` cookie when present,
//! otherwise from the server defaults.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::{self, Unexpected};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use super::AppState;
use crate::error::{Error, FetchErrorKind, InputError};
use crate::extraction::ResolvedMetadata;
use crate::fetch::UserSettings;
use crate::pipeline::SiteReport;

/// Name of the cookie carrying the user's preferred user agent
pub const USER_AGENT_COOKIE: &str = "userAgent";

/// Query string of the inspection routes
#[derive(Debug, Clone, Deserialize)]
pub struct InspectQuery {
    /// Raw user input, normalized before fetching
    #[serde(default)]
    pub url: String,
    /// `/api/raw` only: return the head-only view
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub head_only: bool,
}

/// Query flag: `1`, `true`, `yes`, `on` or a bare key set it; `0`, `false`, `no`, `off` clear it
fn deserialize_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let Some(value) = Option::<String>::deserialize(deserializer)? else {
        return Ok(false);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(de::Error::invalid_value(Unexpected::Str(&value), &"a boolean flag")),
    }
}

/// Body of `/api/metadata`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataResponse {
    /// URL as normalized from the input
    pub url: String,
    /// URL after redirects
    pub final_url: String,
    /// Status of the final response
    pub status_code: u16,
    /// The resolved record
    pub metadata: ResolvedMetadata,
}

impl From<&SiteReport> for MetadataResponse {
    fn from(report: &SiteReport) -> Self {
        Self {
            url: report.requested_url.to_string(),
            final_url: report.fetch.final_url.to_string(),
            status_code: report.fetch.status_code,
            metadata: report.metadata.clone(),
        }
    }
}

/// JSON error body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human readable message
    pub error: String,
    /// Machine readable category
    pub kind: String,
    /// The input or URL the failure relates to
    pub url: String,
}

/// Pipeline failure rendered as an HTTP response
#[derive(Debug)]
pub struct ApiError {
    error: Error,
    url: String,
}

impl ApiError {
    /// Wrap an error for the given input
    pub fn new(error: Error, url: impl Into<String>) -> Self {
        Self {
            error,
            url: url.into(),
        }
    }

    /// Status code for the wrapped error
    pub fn status(&self) -> StatusCode {
        match &self.error {
            Error::Input(_) => StatusCode::BAD_REQUEST,
            Error::Fetch(e) if e.kind == FetchErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
            Error::Fetch(_) => StatusCode::BAD_GATEWAY,
            Error::Server(_) | Error::Io(_) | Error::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::new(InputError::InvalidQuery(rejection.body_text()).into(), "")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let url = match &self.error {
            Error::Fetch(e) => e.url.clone(),
            _ => self.url,
        };
        let body = ErrorBody {
            error: self.error.to_string(),
            kind: self.error.kind().to_string(),
            url,
        };
        (status, Json(body)).into_response()
    }
}

/// Settings for this request: the `userAgent` cookie overrides the defaults.
pub fn settings_from_headers(headers: &HeaderMap, defaults: &UserSettings) -> UserSettings {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == USER_AGENT_COOKIE)
        .map(|(_, value)| decode_cookie_value(value))
        .filter(|value| !value.trim().is_empty())
        .map(UserSettings::with_user_agent)
        .unwrap_or_else(|| defaults.clone())
}

/// Percent-decode a cookie value as set by `encodeURIComponent`
fn decode_cookie_value(value: &str) -> String {
    let value = value.trim().trim_matches('"');
    // `+` is literal in cookies; escape it so form decoding keeps it
    let escaped = value.replace('+', "%2B");
    url::form_urlencoded::parse(format!("v={}", escaped).as_bytes())
        .next()
        .map(|(_, v)| v.into_owned())
        .unwrap_or_else(|| value.to_string())
}

async fn run_inspection(
    state: &AppState,
    headers: &HeaderMap,
    input: &str,
) -> Result<SiteReport, ApiError> {
    let request_id = Uuid::new_v4();
    let settings = settings_from_headers(headers, state.default_settings());
    let started = Instant::now();

    let span = info_span!("inspection", %request_id, input = %input);
    let outcome = state
        .inspector()
        .inspect(input, &settings)
        .instrument(span)
        .await;

    match outcome {
        Ok(report) => {
            let elapsed = started.elapsed();
            let total = state.record_inspection(elapsed);
            info!(
                %request_id,
                total,
                elapsed_ms = elapsed.as_millis() as u64,
                "Inspection served"
            );
            Ok(report)
        }
        Err(e) => {
            state.record_error();
            warn!(%request_id, kind = e.kind(), "Inspection failed: {}", e);
            Err(ApiError::new(e, input))
        }
    }
}

/// `GET /api/metadata?url=`
pub async fn metadata_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    query: Result<Query<InspectQuery>, QueryRejection>,
) -> Result<Json<MetadataResponse>, ApiError> {
    let Query(query) = query?;
    let report = run_inspection(&state, &headers, &query.url).await?;
    Ok(Json(MetadataResponse::from(&report)))
}

/// `GET /api/raw?url=[&head_only=true]`
pub async fn raw_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    query: Result<Query<InspectQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let report = run_inspection(&state, &headers, &query.url).await?;
    let text = if query.head_only {
        report.head_view()
    } else {
        report.fetch.raw_document
    };
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        text,
    )
        .into_response())
}
