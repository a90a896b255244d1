//! URL resolution helpers
//!
//! Declared URLs are resolved against the document's final (post-redirect)
//! URL using standard relative reference rules.

use url::Url;

/// Resolve a declared URL against `base`.
///
/// Handles absolute, scheme-relative (`//host/x`, inheriting the base scheme),
/// root-relative and path-relative forms. Blank or unparseable values yield
/// `None`.
pub fn resolve_url(base: &Url, value: &str) -> Option<Url> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    base.join(value).ok()
}

/// Conventional `/favicon.ico` at the origin of `base`
pub fn default_favicon(base: &Url) -> Option<Url> {
    if !matches!(base.scheme(), "http" | "https") {
        return None;
    }
    base.join("/favicon.ico").ok()
}
