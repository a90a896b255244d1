//! Metadata resolution
//!
//! Collapses the per-standard groups into one canonical record. Each field has
//! an ordered list of [`FieldSource`]s; the first source yielding a usable
//! value wins. Text values must be non-blank, URL values must resolve against
//! the document's final URL.
//!
//! | Field | Sources, in order |
//! |---|---|
//! | title | `og:title`, `twitter:title`, `<title>`, `name=title` |
//! | description | `og:description`, `twitter:description`, `name=description` |
//! | image_url | `og:image`, `og:image:url`, `twitter:image` |
//! | canonical_url | `rel=canonical`, final URL |
//! | favicon_url | first `rel=icon` / `rel=shortcut icon`, `/favicon.ico` |
//! | twitter_card | `twitter:card`, then `summary` when an image resolved |

use crate::extraction::metadata::{ExtractedMetadata, LinkValue};
use crate::extraction::urls::{default_favicon, resolve_url};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, instrument};
use url::Url;

/// Rel tokens marking a link as an icon, in no particular priority
pub const ICON_RELS: [&str; 3] = ["icon", "apple-touch-icon", "mask-icon"];

/// Rel tokens that can supply the favicon (`icon` also covers `shortcut icon`)
pub const FAVICON_RELS: [&str; 1] = ["icon"];

/// A field of [`ResolvedMetadata`] backed by a precedence chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Page title
    Title,
    /// Page description
    Description,
    /// Preview image
    ImageUrl,
    /// Preview image alt text
    ImageAlt,
    /// Site name
    SiteName,
    /// Canonical URL
    CanonicalUrl,
    /// Favicon
    FaviconUrl,
    /// Browser theme color
    ThemeColor,
    /// Twitter card kind as declared
    TwitterCard,
    /// Open Graph locale
    Locale,
    /// Open Graph type
    OgType,
    /// Open Graph URL
    OgUrl,
    /// Author
    Author,
    /// Robots directives
    Robots,
    /// Twitter @site
    TwitterSite,
    /// Twitter @creator
    TwitterCreator,
    /// Web app manifest
    ManifestUrl,
}

impl Field {
    /// Every field with a precedence chain
    pub const ALL: [Field; 17] = [
        Field::Title,
        Field::Description,
        Field::ImageUrl,
        Field::ImageAlt,
        Field::SiteName,
        Field::CanonicalUrl,
        Field::FaviconUrl,
        Field::ThemeColor,
        Field::TwitterCard,
        Field::Locale,
        Field::OgType,
        Field::OgUrl,
        Field::Author,
        Field::Robots,
        Field::TwitterSite,
        Field::TwitterCreator,
        Field::ManifestUrl,
    ];

    /// Key of this field in the serialized record
    pub fn name(self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Description => "description",
            Field::ImageUrl => "image_url",
            Field::ImageAlt => "image_alt",
            Field::SiteName => "site_name",
            Field::CanonicalUrl => "canonical_url",
            Field::FaviconUrl => "favicon_url",
            Field::ThemeColor => "theme_color",
            Field::TwitterCard => "twitter_card",
            Field::Locale => "locale",
            Field::OgType => "type",
            Field::OgUrl => "og_url",
            Field::Author => "author",
            Field::Robots => "robots",
            Field::TwitterSite => "twitter_site",
            Field::TwitterCreator => "twitter_creator",
            Field::ManifestUrl => "manifest_url",
        }
    }

    /// Whether values of this field are URLs to be resolved
    pub fn is_url(self) -> bool {
        matches!(
            self,
            Field::ImageUrl
                | Field::CanonicalUrl
                | Field::FaviconUrl
                | Field::OgUrl
                | Field::ManifestUrl
        )
    }

    /// Ordered sources consulted for this field
    pub fn precedence(self) -> &'static [FieldSource] {
        use FieldSource::*;
        match self {
            Field::Title => &[
                OpenGraph("og:title"),
                Twitter("twitter:title"),
                DocumentTitle,
                Html("title"),
            ],
            Field::Description => &[
                OpenGraph("og:description"),
                Twitter("twitter:description"),
                Html("description"),
            ],
            Field::ImageUrl => &[
                OpenGraph("og:image"),
                OpenGraph("og:image:url"),
                Twitter("twitter:image"),
            ],
            Field::ImageAlt => &[OpenGraph("og:image:alt"), Twitter("twitter:image:alt")],
            Field::SiteName => &[OpenGraph("og:site_name")],
            Field::CanonicalUrl => &[Link(&["canonical"]), FinalUrl],
            Field::FaviconUrl => &[Link(&FAVICON_RELS), OriginFavicon],
            Field::ThemeColor => &[Html("theme-color")],
            Field::TwitterCard => &[Twitter("twitter:card")],
            Field::Locale => &[OpenGraph("og:locale")],
            Field::OgType => &[OpenGraph("og:type")],
            Field::OgUrl => &[OpenGraph("og:url")],
            Field::Author => &[Html("author")],
            Field::Robots => &[Html("robots")],
            Field::TwitterSite => &[Twitter("twitter:site")],
            Field::TwitterCreator => &[Twitter("twitter:creator")],
            Field::ManifestUrl => &[Link(&["manifest"])],
        }
    }
}

/// Where a candidate value comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    /// `<meta property>` in the Open Graph group
    OpenGraph(&'static str),
    /// `<meta name>` in the Twitter Card group
    Twitter(&'static str),
    /// `<meta name>` in the plain HTML group
    Html(&'static str),
    /// The `<title>` element
    DocumentTitle,
    /// `<link href>` carrying any of these rel tokens, earliest in the document first
    Link(&'static [&'static str]),
    /// The fetched document's final URL
    FinalUrl,
    /// `/favicon.ico` at the final URL's origin
    OriginFavicon,
}

impl FieldSource {
    /// Candidate values from this source, in document order
    pub fn candidates(&self, meta: &ExtractedMetadata, final_url: &Url) -> Vec<String> {
        match self {
            FieldSource::OpenGraph(key) => meta.open_graph.all(key).to_vec(),
            FieldSource::Twitter(key) => meta.twitter.all(key).to_vec(),
            FieldSource::Html(key) => meta.html.all(key).to_vec(),
            FieldSource::DocumentTitle => meta.title.iter().cloned().collect(),
            FieldSource::Link(rels) => links_in_order(meta, rels)
                .into_iter()
                .map(|l| l.href.clone())
                .collect(),
            FieldSource::FinalUrl => vec![final_url.to_string()],
            FieldSource::OriginFavicon => default_favicon(final_url)
                .map(|u| u.to_string())
                .into_iter()
                .collect(),
        }
    }
}

impl fmt::Display for FieldSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldSource::OpenGraph(k) | FieldSource::Twitter(k) => write!(f, "meta[{}]", k),
            FieldSource::Html(k) => write!(f, "meta[name={}]", k),
            FieldSource::DocumentTitle => write!(f, "<title>"),
            FieldSource::Link(rels) => write!(f, "link[rel={}]", rels.join("|")),
            FieldSource::FinalUrl => write!(f, "final url"),
            FieldSource::OriginFavicon => write!(f, "/favicon.ico"),
        }
    }
}

/// Kind of Twitter/X card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TwitterCardKind {
    /// `summary`
    Summary,
    /// `summary_large_image`
    SummaryLargeImage,
    /// `app`
    App,
    /// `player`
    Player,
    /// Any other declared value, kept verbatim
    Other(String),
}

impl TwitterCardKind {
    /// The card value as declared in markup
    pub fn as_str(&self) -> &str {
        match self {
            TwitterCardKind::Summary => "summary",
            TwitterCardKind::SummaryLargeImage => "summary_large_image",
            TwitterCardKind::App => "app",
            TwitterCardKind::Player => "player",
            TwitterCardKind::Other(s) => s,
        }
    }
}

impl From<String> for TwitterCardKind {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "summary" => TwitterCardKind::Summary,
            "summary_large_image" => TwitterCardKind::SummaryLargeImage,
            "app" => TwitterCardKind::App,
            "player" => TwitterCardKind::Player,
            _ => TwitterCardKind::Other(value.trim().to_string()),
        }
    }
}

impl From<TwitterCardKind> for String {
    fn from(kind: TwitterCardKind) -> Self {
        kind.as_str().to_string()
    }
}

/// An icon declared with `<link>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconLink {
    /// Absolute icon URL
    pub url: String,
    /// The rel it was declared with
    pub rel: String,
    /// sizes attribute
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sizes: Option<String>,
    /// type attribute
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

/// A `<link rel="alternate">`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlternateLink {
    /// Absolute URL of the alternate
    pub url: String,
    /// Language of the alternate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hreflang: Option<String>,
    /// Media type (feeds)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

/// The canonical metadata record handed to presentation code.
///
/// Absent fields are `None` and left out of serialized output; URL fields are
/// always absolute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedMetadata {
    /// Page title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Page description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Preview image URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Preview image alt text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_alt: Option<String>,
    /// Site name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
    /// Canonical URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_url: Option<String>,
    /// Favicon URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favicon_url: Option<String>,
    /// Theme color
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme_color: Option<String>,
    /// Twitter card kind
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter_card: Option<TwitterCardKind>,
    /// og:locale
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    /// og:type
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub og_type: Option<String>,
    /// og:url
    #[serde(skip_serializing_if = "Option::is_none")]
    pub og_url: Option<String>,
    /// Author
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Keywords, comma-split
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    /// Robots directives
    #[serde(skip_serializing_if = "Option::is_none")]
    pub robots: Option<String>,
    /// twitter:site handle
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter_site: Option<String>,
    /// twitter:creator handle
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter_creator: Option<String>,
    /// Web app manifest URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest_url: Option<String>,
    /// All declared icons
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub icons: Vec<IconLink>,
    /// Alternate versions of the page
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternates: Vec<AlternateLink>,
}

impl ResolvedMetadata {
    /// The resolved value of `field` as text
    pub fn value(&self, field: Field) -> Option<&str> {
        let value = match field {
            Field::Title => &self.title,
            Field::Description => &self.description,
            Field::ImageUrl => &self.image_url,
            Field::ImageAlt => &self.image_alt,
            Field::SiteName => &self.site_name,
            Field::CanonicalUrl => &self.canonical_url,
            Field::FaviconUrl => &self.favicon_url,
            Field::ThemeColor => &self.theme_color,
            Field::TwitterCard => {
                return self.twitter_card.as_ref().map(TwitterCardKind::as_str);
            }
            Field::Locale => &self.locale,
            Field::OgType => &self.og_type,
            Field::OgUrl => &self.og_url,
            Field::Author => &self.author,
            Field::Robots => &self.robots,
            Field::TwitterSite => &self.twitter_site,
            Field::TwitterCreator => &self.twitter_creator,
            Field::ManifestUrl => &self.manifest_url,
        };
        value.as_deref()
    }
}

/// Pure, synchronous metadata resolution
pub struct Resolver;

impl Resolver {
    /// Resolve groups into the canonical record
    #[instrument(skip(meta), fields(final_url = %final_url))]
    pub fn resolve(meta: &ExtractedMetadata, final_url: &Url) -> ResolvedMetadata {
        let field = |f: Field| Self::resolve_field(f, meta, final_url);

        let image_url = field(Field::ImageUrl);
        let twitter_card = field(Field::TwitterCard)
            .map(TwitterCardKind::from)
            .or_else(|| image_url.as_ref().map(|_| TwitterCardKind::Summary));

        let keywords = Self::first_text(meta, "keywords")
            .map(|k| {
                k.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<String>>()
            })
            .unwrap_or_default();

        let resolved = ResolvedMetadata {
            title: field(Field::Title),
            description: field(Field::Description),
            image_alt: field(Field::ImageAlt),
            image_url,
            site_name: field(Field::SiteName),
            canonical_url: field(Field::CanonicalUrl),
            favicon_url: field(Field::FaviconUrl),
            theme_color: field(Field::ThemeColor),
            twitter_card,
            locale: field(Field::Locale),
            og_type: field(Field::OgType),
            og_url: field(Field::OgUrl),
            author: field(Field::Author),
            keywords,
            robots: field(Field::Robots),
            twitter_site: field(Field::TwitterSite),
            twitter_creator: field(Field::TwitterCreator),
            manifest_url: field(Field::ManifestUrl),
            icons: Self::icons(meta, final_url),
            alternates: Self::alternates(meta, final_url),
        };

        debug!(
            "Resolved metadata: title={:?}, image={:?}",
            resolved.title, resolved.image_url
        );
        resolved
    }

    /// Walk a field's precedence chain and return the first usable value
    pub fn resolve_field(
        field: Field,
        meta: &ExtractedMetadata,
        final_url: &Url,
    ) -> Option<String> {
        field.precedence().iter().find_map(|source| {
            source.candidates(meta, final_url).into_iter().find_map(|value| {
                if field.is_url() {
                    resolve_url(final_url, &value).map(String::from)
                } else {
                    let value = value.trim();
                    (!value.is_empty()).then(|| value.to_string())
                }
            })
        })
    }

    /// The source that supplied a field's value, for inspection views
    pub fn winning_source(
        field: Field,
        meta: &ExtractedMetadata,
        final_url: &Url,
    ) -> Option<FieldSource> {
        field.precedence().iter().copied().find(|source| {
            source.candidates(meta, final_url).iter().any(|value| {
                if field.is_url() {
                    resolve_url(final_url, value).is_some()
                } else {
                    !value.trim().is_empty()
                }
            })
        })
    }

    fn first_text(meta: &ExtractedMetadata, name: &str) -> Option<String> {
        meta.html
            .all(name)
            .iter()
            .map(|v| v.trim())
            .find(|v| !v.is_empty())
            .map(str::to_string)
    }

    fn icons(meta: &ExtractedMetadata, final_url: &Url) -> Vec<IconLink> {
        links_in_order(meta, &ICON_RELS)
            .into_iter()
            .filter_map(|link| {
                Some(IconLink {
                    url: resolve_url(final_url, &link.href)?.into(),
                    rel: link.rel.clone(),
                    sizes: link.sizes.clone(),
                    media_type: link.media_type.clone(),
                })
            })
            .collect()
    }

    fn alternates(meta: &ExtractedMetadata, final_url: &Url) -> Vec<AlternateLink> {
        meta.links
            .all("alternate")
            .iter()
            // `alternate icon` and `alternate stylesheet` are not page versions
            .filter(|link| !link.has_rel("icon") && !link.has_rel("stylesheet"))
            .filter_map(|link| {
                Some(AlternateLink {
                    url: resolve_url(final_url, &link.href)?.into(),
                    hreflang: link.hreflang.clone(),
                    media_type: link.media_type.clone(),
                })
            })
            .collect()
    }
}

/// Links carrying any of `rels`, each once, sorted by document position
fn links_in_order<'a>(meta: &'a ExtractedMetadata, rels: &[&str]) -> Vec<&'a LinkValue> {
    let mut links: Vec<&LinkValue> = rels.iter().flat_map(|rel| meta.links.all(rel)).collect();
    links.sort_by_key(|l| l.position);
    links.dedup_by_key(|l| l.position);
    links
}
