//! Head section parsing
//!
//! Turns the head of a raw document into a flat, ordered list of `<meta>`,
//! `<link>` and `<title>` declarations without interpreting them. Parsing is
//! best effort: broken markup yields fewer declarations, never an error.

use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::{debug, instrument};

/// Upper bound on the head text handed to the HTML parser
pub const MAX_HEAD_BYTES: usize = 512 * 1024;

static BODY_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<body").expect("valid body regex"));

static HEAD_TAGS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta, link, title").expect("valid head selector"));

/// Kind of head declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagKind {
    /// `<meta ...>`
    Meta,
    /// `<link ...>`
    Link,
    /// `<title>...</title>`
    Title,
}

impl TagKind {
    fn from_tag_name(name: &str) -> Option<Self> {
        match name {
            "meta" => Some(TagKind::Meta),
            "link" => Some(TagKind::Link),
            "title" => Some(TagKind::Title),
            _ => None,
        }
    }
}

/// One uninterpreted head declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDeclaration {
    /// Which tag this came from
    pub kind: TagKind,
    /// Attributes keyed by lowercased name, values entity-decoded
    pub attributes: BTreeMap<String, String>,
    /// Text content (only `<title>` carries one)
    pub text_content: Option<String>,
}

impl RawDeclaration {
    /// Attribute lookup, case-insensitive on the name
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// The part of a document that precedes the first `<body` marker.
///
/// Returns the whole document when there is no marker.
pub fn head_section(raw_document: &str) -> &str {
    match BODY_OPEN.find(raw_document) {
        Some(m) => &raw_document[..m.start()],
        None => raw_document,
    }
}

/// Longest prefix of `s` no longer than `max` bytes that ends on a char boundary
fn truncate_to_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Parse the head section of a document into declarations, in document order.
#[instrument(skip(raw_document), fields(len = raw_document.len()))]
pub fn parse_head(raw_document: &str) -> Vec<RawDeclaration> {
    let head = head_section(raw_document);
    let bounded = truncate_to_boundary(head, MAX_HEAD_BYTES);
    if bounded.len() < head.len() {
        debug!(
            "Head section is {} bytes, parsing first {}",
            head.len(),
            bounded.len()
        );
    }

    let document = Html::parse_document(bounded);
    let declarations: Vec<RawDeclaration> = document
        .select(&HEAD_TAGS)
        .filter_map(|element| {
            let kind = TagKind::from_tag_name(element.value().name())?;
            let attributes = element
                .value()
                .attrs()
                .map(|(name, value)| (name.to_ascii_lowercase(), value.to_string()))
                .collect();
            let text_content = match kind {
                TagKind::Title => Some(element.text().collect::<String>()),
                _ => None,
            };
            Some(RawDeclaration {
                kind,
                attributes,
                text_content,
            })
        })
        .collect();

    debug!("Parsed {} head declarations", declarations.len());
    declarations
}
