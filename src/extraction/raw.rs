//! Raw document view
//!
//! Prepares fetched text for a "view source" panel. The untouched document
//! stays on [`FetchResult`](crate::fetch::FetchResult); this only builds the
//! trimmed head-only rendering shown next to the resolved fields.

use crate::extraction::head::head_section;
use regex::Regex;
use std::sync::LazyLock;

static STYLE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style[^>]*>.*?</style>").expect("valid style regex"));

/// Notice prepended to head-only views
pub const HEAD_ONLY_NOTICE: &str = "Only <head> is shown:\n\n";

/// Head-only rendering of a raw document.
///
/// Inline stylesheets are collapsed to `<style>...</style>` and adjacent
/// self-closing tags are split onto separate lines.
pub fn head_only_view(raw_document: &str) -> String {
    let head = head_section(raw_document).replace("/><", "/>\n<");
    let collapsed = STYLE_BLOCK.replace_all(&head, "<style>...</style>");
    format!("{}{}", HEAD_ONLY_NOTICE, collapsed)
}
