//! Extraction module tests
//!
//! These tests run the synchronous stages (head parsing, classification,
//! resolution) on realistic documents without any network access.

use pretty_assertions::assert_eq;
use site_meta::extraction::{
    head_only_view, parse_head, Field, FieldSource, MetadataExtractor, ResolvedMetadata,
    Resolver, TagKind, TwitterCardKind, MAX_HEAD_BYTES,
};
use site_meta::resolve_document;
use url::Url;

const BLOG_POST: &str = r##"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>  How we ship  </title>
  <meta name="description" content="Plain description">
  <meta name="keywords" content="rust, http ,  , metadata">
  <meta name="author" content="Jo Writer">
  <meta name="theme-color" content="#0f172a">
  <meta property="og:title" content="How We Ship Software">
  <meta property="og:type" content="article">
  <meta property="og:image" content="/images/cover.png">
  <meta property="og:image:alt" content="A ship">
  <meta property="og:site_name" content="Eng Blog">
  <meta property="og:locale" content="en_GB">
  <meta name="twitter:card" content="summary_large_image">
  <meta name="twitter:site" content="@engblog">
  <meta name="twitter:image" content="https://cdn.example.net/tw.png">
  <link rel="canonical" href="https://blog.example.com/posts/ship">
  <link rel="apple-touch-icon" sizes="180x180" href="/apple.png">
  <link rel="icon" type="image/png" sizes="32x32" href="/favicon-32.png">
  <link rel="icon" type="image/png" sizes="16x16" href="/favicon-16.png">
  <link rel="alternate" hreflang="de" href="/de/posts/ship">
  <link rel="manifest" href="/site.webmanifest">
</head>
<body>
  <meta property="og:title" content="Body override">
  <title>Body title</title>
</body>
</html>"##;

fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

#[test]
fn test_blog_post_record() {
    let resolved = resolve_document(BLOG_POST, &url("https://blog.example.com/posts/ship?ref=x"));

    assert_eq!(resolved.title.as_deref(), Some("How We Ship Software"));
    assert_eq!(resolved.description.as_deref(), Some("Plain description"));
    assert_eq!(
        resolved.image_url.as_deref(),
        Some("https://blog.example.com/images/cover.png")
    );
    assert_eq!(resolved.image_alt.as_deref(), Some("A ship"));
    assert_eq!(resolved.site_name.as_deref(), Some("Eng Blog"));
    assert_eq!(
        resolved.canonical_url.as_deref(),
        Some("https://blog.example.com/posts/ship")
    );
    assert_eq!(
        resolved.favicon_url.as_deref(),
        Some("https://blog.example.com/favicon-32.png")
    );
    assert_eq!(resolved.theme_color.as_deref(), Some("#0f172a"));
    assert_eq!(
        resolved.twitter_card,
        Some(TwitterCardKind::SummaryLargeImage)
    );
    assert_eq!(resolved.locale.as_deref(), Some("en_GB"));
    assert_eq!(resolved.og_type.as_deref(), Some("article"));
    assert_eq!(resolved.author.as_deref(), Some("Jo Writer"));
    assert_eq!(resolved.keywords, vec!["rust", "http", "metadata"]);
    assert_eq!(resolved.twitter_site.as_deref(), Some("@engblog"));
    assert_eq!(
        resolved.manifest_url.as_deref(),
        Some("https://blog.example.com/site.webmanifest")
    );

    let icon_urls: Vec<&str> = resolved.icons.iter().map(|i| i.url.as_str()).collect();
    assert_eq!(
        icon_urls,
        vec![
            "https://blog.example.com/apple.png",
            "https://blog.example.com/favicon-32.png",
            "https://blog.example.com/favicon-16.png",
        ]
    );
    assert_eq!(resolved.alternates.len(), 1);
    assert_eq!(resolved.alternates[0].hreflang.as_deref(), Some("de"));
    assert_eq!(
        resolved.alternates[0].url,
        "https://blog.example.com/de/posts/ship"
    );
}

#[test]
fn test_body_declarations_are_ignored() {
    let declarations = parse_head(BLOG_POST);
    let titles: Vec<_> = declarations
        .iter()
        .filter(|d| d.kind == TagKind::Title)
        .collect();
    assert_eq!(titles.len(), 1);

    let extracted = MetadataExtractor::extract(&declarations);
    assert_eq!(extracted.title.as_deref(), Some("How we ship"));
    assert_eq!(extracted.open_graph.all("og:title").len(), 1);
}

#[test]
fn test_winning_sources() {
    let extracted = MetadataExtractor::extract(&parse_head(BLOG_POST));
    let final_url = url("https://blog.example.com/posts/ship");

    assert_eq!(
        Resolver::winning_source(Field::Title, &extracted, &final_url),
        Some(FieldSource::OpenGraph("og:title"))
    );
    assert_eq!(
        Resolver::winning_source(Field::ImageUrl, &extracted, &final_url),
        Some(FieldSource::OpenGraph("og:image"))
    );
    assert_eq!(
        Resolver::winning_source(Field::Robots, &extracted, &final_url),
        None
    );
}

#[test]
fn test_protocol_relative_and_redirect_base() {
    let doc = r#"<meta property="og:image" content="//cdn.example.com/a.png">
        <meta name="twitter:image" content="img/t.png">"#;
    let resolved = resolve_document(doc, &url("https://example.com/page"));
    assert_eq!(
        resolved.image_url.as_deref(),
        Some("https://cdn.example.com/a.png")
    );

    let doc = r#"<meta name="twitter:image" content="img/t.png">"#;
    let from_input = resolve_document(doc, &url("http://example.com/"));
    let from_final = resolve_document(doc, &url("https://example.com/home/"));
    assert_eq!(
        from_input.image_url.as_deref(),
        Some("http://example.com/img/t.png")
    );
    assert_eq!(
        from_final.image_url.as_deref(),
        Some("https://example.com/home/img/t.png")
    );
}

#[test]
fn test_empty_document() {
    let resolved = resolve_document("", &url("https://x.test/a/b"));
    assert_eq!(
        resolved,
        ResolvedMetadata {
            canonical_url: Some("https://x.test/a/b".to_string()),
            favicon_url: Some("https://x.test/favicon.ico".to_string()),
            ..Default::default()
        }
    );
}

#[test]
fn test_malformed_markup_degrades() {
    let doc = r#"<head><meta property="og:title" content="Unclosed <title>Broken"#;
    let resolved = resolve_document(doc, &url("https://x.test/"));
    assert!(resolved.description.is_none());

    let doc = "<<<>>><meta content><link rel><title></title>";
    let resolved = resolve_document(doc, &url("https://x.test/"));
    assert!(resolved.title.is_none());
    assert!(resolved.icons.is_empty());
}

#[test]
fn test_oversized_head_is_bounded() {
    let mut doc = String::from(r#"<head><meta property="og:title" content="Early">"#);
    doc.push_str(&"<meta name=\"filler\" content=\"x\">".repeat(MAX_HEAD_BYTES / 32 + 10));
    doc.push_str(r#"<meta name="description" content="Too late"></head>"#);
    assert!(doc.len() > MAX_HEAD_BYTES);

    let resolved = resolve_document(&doc, &url("https://x.test/"));
    assert_eq!(resolved.title.as_deref(), Some("Early"));
    assert!(resolved.description.is_none());
}

#[test]
fn test_head_only_view_of_blog_post() {
    let view = head_only_view(BLOG_POST);
    assert!(view.contains("<title>  How we ship  </title>"));
    assert!(!view.contains("Body override"));
}

#[test]
fn test_serialized_record_omits_absent_fields() {
    let resolved = resolve_document("<title>Only</title>", &url("https://x.test/"));
    let json = serde_json::to_value(&resolved).unwrap();
    assert_eq!(json["title"], "Only");
    assert!(json.get("description").is_none());
    assert!(json.get("image_url").is_none());
    assert!(json.get("keywords").is_none());
}
