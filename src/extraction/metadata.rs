//! Metadata classification
//!
//! This module sorts raw head declarations into one group per metadata
//! standard: plain HTML `<meta name>`, Open Graph, Twitter Card, link
//! relations and the document title. Values sharing a key are kept in
//! document order; choosing between them is the resolver's job.

use crate::extraction::head::{RawDeclaration, TagKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Values of one metadata standard, keyed by property/name/rel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataGroup<V = String> {
    entries: BTreeMap<String, Vec<V>>,
}

impl<V> Default for MetadataGroup<V> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<V> MetadataGroup<V> {
    /// Create an empty group
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value under `key` (keys are matched case-insensitively)
    pub fn push<K: AsRef<str>>(&mut self, key: K, value: V) {
        self.entries
            .entry(key.as_ref().to_ascii_lowercase())
            .or_default()
            .push(value);
    }

    /// All values for `key`, in document order
    pub fn all(&self, key: &str) -> &[V] {
        self.entries
            .get(&key.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// First value declared for `key`
    pub fn first(&self, key: &str) -> Option<&V> {
        self.all(key).first()
    }

    /// Whether any value exists for `key`
    pub fn contains(&self, key: &str) -> bool {
        !self.all(key).is_empty()
    }

    /// Iterate over keys and their values
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[V])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the group holds no keys
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A `<link>` declaration's resolvable parts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkValue {
    /// The href as written (not yet resolved)
    pub href: String,
    /// Normalized rel list as declared ("shortcut icon")
    pub rel: String,
    /// hreflang attribute
    pub hreflang: Option<String>,
    /// sizes attribute (icons)
    pub sizes: Option<String>,
    /// type attribute
    pub media_type: Option<String>,
    /// Index among all declarations, for ordering across rel values
    pub position: usize,
}

impl LinkValue {
    /// Whether `token` is one of the link's rel tokens
    pub fn has_rel(&self, token: &str) -> bool {
        self.rel.split(' ').any(|t| t.eq_ignore_ascii_case(token))
    }
}

/// Classified metadata of one document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedMetadata {
    /// `<meta name=...>` that are not Twitter Card names
    pub html: MetadataGroup,
    /// `<meta property="og:...">`
    pub open_graph: MetadataGroup,
    /// `<meta name="twitter:...">`
    pub twitter: MetadataGroup,
    /// `<link rel=...>` filed under each of its rel tokens
    pub links: MetadataGroup<LinkValue>,
    /// First non-empty `<title>`
    pub title: Option<String>,
}

/// Metadata extraction functionality
pub struct MetadataExtractor;

impl MetadataExtractor {
    /// Classify declarations into groups
    #[instrument(skip(declarations), fields(count = declarations.len()))]
    pub fn extract(declarations: &[RawDeclaration]) -> ExtractedMetadata {
        let mut extracted = ExtractedMetadata::default();

        for (position, decl) in declarations.iter().enumerate() {
            match decl.kind {
                TagKind::Meta => Self::classify_meta(decl, &mut extracted),
                TagKind::Link => {
                    let (Some(rel), Some(href)) = (decl.attr("rel"), decl.attr("href")) else {
                        continue;
                    };
                    let rel = normalize_rel(rel);
                    let link = LinkValue {
                        href: href.trim().to_string(),
                        rel: rel.clone(),
                        hreflang: decl.attr("hreflang").map(str::to_string),
                        sizes: decl.attr("sizes").map(str::to_string),
                        media_type: decl.attr("type").map(str::to_string),
                        position,
                    };
                    let mut tokens: Vec<&str> = rel.split(' ').filter(|t| !t.is_empty()).collect();
                    tokens.sort_unstable();
                    tokens.dedup();
                    for token in tokens {
                        extracted.links.push(token, link.clone());
                    }
                }
                TagKind::Title => {
                    if extracted.title.is_some() {
                        continue;
                    }
                    let text = decl.text_content.as_deref().unwrap_or_default().trim();
                    if !text.is_empty() {
                        extracted.title = Some(text.to_string());
                    }
                }
            }
        }

        debug!(
            "Extracted groups: html={}, og={}, twitter={}, links={}, title={}",
            extracted.html.len(),
            extracted.open_graph.len(),
            extracted.twitter.len(),
            extracted.links.len(),
            extracted.title.is_some()
        );

        extracted
    }

    fn classify_meta(decl: &RawDeclaration, extracted: &mut ExtractedMetadata) {
        let Some(content) = decl.attr("content") else {
            return;
        };
        let content = content.trim().to_string();

        if let Some(property) = decl.attr("property").map(str::trim) {
            if starts_with_ignore_case(property, "og:") {
                extracted.open_graph.push(property, content);
                return;
            }
        }

        if let Some(name) = decl.attr("name").map(str::trim) {
            if starts_with_ignore_case(name, "twitter:") {
                extracted.twitter.push(name, content);
            } else if !name.is_empty() {
                extracted.html.push(name, content);
            }
        }
    }
}

/// Lowercase and collapse whitespace in a rel value ("Shortcut  Icon" -> "shortcut icon")
fn normalize_rel(rel: &str) -> String {
    rel.split_whitespace()
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len()
        && s.is_char_boundary(prefix.len())
        && s[..prefix.len()].eq_ignore_ascii_case(prefix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::head::parse_head;

    fn extract(doc: &str) -> ExtractedMetadata {
        MetadataExtractor::extract(&parse_head(doc))
    }

    #[test]
    fn test_classification() {
        let meta = extract(
            r##"<title>Page</title>
            <meta property="og:title" content="OG Title">
            <meta name="twitter:card" content="summary_large_image">
            <meta name="description" content="Plain">
            <meta name="theme-color" content="#fff">
            <link rel="canonical" href="/c">"##,
        );

        assert_eq!(meta.title.as_deref(), Some("Page"));
        assert_eq!(meta.open_graph.first("og:title").map(String::as_str), Some("OG Title"));
        assert_eq!(
            meta.twitter.first("twitter:card").map(String::as_str),
            Some("summary_large_image")
        );
        assert_eq!(meta.html.first("description").map(String::as_str), Some("Plain"));
        assert_eq!(meta.html.first("theme-color").map(String::as_str), Some("#fff"));
        assert_eq!(meta.links.first("canonical").map(|l| l.href.as_str()), Some("/c"));
    }

    #[test]
    fn test_duplicates_retained_in_order() {
        let meta = extract(
            r#"<meta property="og:image" content="/a.png">
            <meta property="og:image" content="/b.png">"#,
        );
        assert_eq!(meta.open_graph.all("og:image"), ["/a.png", "/b.png"]);
    }

    #[test]
    fn test_strict_vocabulary_routing() {
        // og: only counts on `property`, twitter: only on `name`
        let meta = extract(
            r#"<meta name="og:title" content="named og">
            <meta property="twitter:title" content="property twitter">
            <meta property="article:author" content="someone">"#,
        );
        assert!(meta.open_graph.is_empty());
        assert!(meta.twitter.is_empty());
        assert_eq!(meta.html.first("og:title").map(String::as_str), Some("named og"));
    }

    #[test]
    fn test_meta_without_content_skipped() {
        let meta = extract(r#"<meta name="description"><meta charset="utf-8">"#);
        assert!(meta.html.is_empty());
    }

    #[test]
    fn test_rel_normalization() {
        let meta = extract(
            r#"<link rel="Shortcut  Icon" href="/s.ico">
            <link rel="icon" href="/i.png" sizes="32x32" type="image/png">
            <link rel="stylesheet">"#,
        );
        let shortcut = meta.links.first("shortcut").unwrap();
        assert_eq!(shortcut.href, "/s.ico");
        assert_eq!(shortcut.rel, "shortcut icon");
        assert_eq!(shortcut.position, 0);

        let icons = meta.links.all("icon");
        assert_eq!(icons.len(), 2);
        assert_eq!(icons[0].href, "/s.ico");
        assert_eq!(icons[1].sizes.as_deref(), Some("32x32"));
        assert_eq!(icons[1].media_type.as_deref(), Some("image/png"));
        assert_eq!(icons[1].position, 1);

        // link without href is dropped
        assert!(!meta.links.contains("stylesheet"));
    }

    #[test]
    fn test_links_filed_under_each_rel_token() {
        let meta = extract(
            r#"<link rel="alternate icon" href="/a.ico">
            <link rel="icon shortcut" href="/b.ico">
            <link rel="icon icon" href="/c.ico">"#,
        );
        let icons: Vec<&str> = meta.links.all("icon").iter().map(|l| l.href.as_str()).collect();
        assert_eq!(icons, ["/a.ico", "/b.ico", "/c.ico"]);
        assert_eq!(meta.links.all("alternate").len(), 1);
        assert!(meta.links.all("alternate")[0].has_rel("ICON"));
        assert_eq!(meta.links.first("shortcut").map(|l| l.rel.as_str()), Some("icon shortcut"));
    }

    #[test]
    fn test_first_non_empty_title_wins() {
        let meta = extract("<title>  </title><title>Second</title>");
        assert_eq!(meta.title.as_deref(), Some("Second"));

        let meta = extract("<title>First</title><title>Second</title>");
        assert_eq!(meta.title.as_deref(), Some("First"));
    }

    #[test]
    fn test_group_keys_case_insensitive() {
        let mut group: MetadataGroup = MetadataGroup::new();
        group.push("OG:Title", "x".to_string());
        assert!(group.contains("og:title"));
        assert_eq!(group.first("og:TITLE").map(String::as_str), Some("x"));
        assert!(group.all("missing").is_empty());
    }

    #[test]
    fn test_extracted_metadata_serialization() {
        let meta = extract(r#"<meta property="og:type" content="website">"#);
        let json = serde_json::to_string(&meta).unwrap();
        assert!(json.contains(r#""open_graph":{"og:type":["website"]}"#));
    }
}
