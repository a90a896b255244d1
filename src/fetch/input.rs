//! URL input normalization
//!
//! Turns whatever the user typed ("example.com", "localhost:3000", ":8080",
//! "3000") into an absolute http(s) URL. The pipeline core only ever sees the
//! result of this step.

use crate::error::InputError;
use url::Url;

/// Maximum accepted input length (common URL limit)
pub const MAX_URL_LENGTH: usize = 2048;

/// Normalize and validate a raw user-supplied URL.
///
/// Rules, applied in order:
/// - a bare positive integer is a localhost port;
/// - `localhost...` gets an `http://` prefix;
/// - `:PORT...` is expanded to `http://localhost:PORT...`;
/// - anything else without an `http` prefix gets `http://`.
pub fn parse_url_input(input: &str) -> Result<Url, InputError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(InputError::Empty);
    }
    if trimmed.len() > MAX_URL_LENGTH {
        return Err(invalid(
            trimmed,
            format!("exceeds maximum length of {} characters", MAX_URL_LENGTH),
        ));
    }

    let mut inferred = if is_port_number(trimmed) {
        format!("http://localhost:{}", trimmed)
    } else {
        trimmed.to_string()
    };

    if inferred.starts_with("localhost") {
        inferred = format!("http://{}", inferred);
    }
    if inferred.starts_with(':') {
        inferred = format!("http://localhost{}", inferred);
    }
    if !inferred.starts_with("http") {
        inferred = format!("http://{}", inferred);
    }

    if !inferred.starts_with("http://") && !inferred.starts_with("https://") {
        return Err(invalid(
            trimmed,
            "URL must use http:// or https://, or no protocol at all",
        ));
    }

    let url = Url::parse(&inferred).map_err(|e| invalid(trimmed, e.to_string()))?;
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid(trimmed, "URL has no host"));
    }
    Ok(url)
}

/// Whether the input is a positive integer without leading zeros
fn is_port_number(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some('1'..='9')) && chars.all(|c| c.is_ascii_digit())
}

fn invalid<R: Into<String>>(input: &str, reason: R) -> InputError {
    InputError::InvalidUrl {
        input: input.to_string(),
        reason: reason.into(),
    }
}

/// Check if URL points to the local machine
pub fn is_localhost(url: &Url) -> bool {
    match url.host_str() {
        Some(host) => {
            let host = host.to_ascii_lowercase();
            host == "localhost" || host == "127.0.0.1" || host == "[::1]" || host == "0.0.0.0"
        }
        None => false,
    }
}
