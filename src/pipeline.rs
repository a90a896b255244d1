//! Inspection pipeline
//!
//! Wires the stages together: input normalization, fetch, head parsing,
//! classification and resolution. Only the fetch suspends; everything after
//! it is a pure function of the fetched text and final URL.

use crate::error::Result;
use crate::extraction::{
    head_only_view, parse_head, ExtractedMetadata, MetadataExtractor, ResolvedMetadata, Resolver,
};
use crate::fetch::{parse_url_input, FetchResult, Fetcher, UserSettings};
use serde::Serialize;
use tracing::{info, instrument};
use url::Url;

/// Outcome of one inspection: the canonical record plus the fetch it came from
#[derive(Debug, Clone, Serialize)]
pub struct SiteReport {
    /// URL as normalized from the caller's input
    pub requested_url: Url,
    /// Resolved metadata
    pub metadata: ResolvedMetadata,
    /// Classified declarations the record was resolved from
    #[serde(skip)]
    pub extracted: ExtractedMetadata,
    /// The fetch, including the raw document for "view source" panels
    #[serde(skip)]
    pub fetch: FetchResult,
}

impl SiteReport {
    /// Run the parsing stages over a completed fetch
    pub fn from_fetch(requested_url: Url, fetch: FetchResult) -> Self {
        let extracted = MetadataExtractor::extract(&parse_head(&fetch.raw_document));
        let metadata = Resolver::resolve(&extracted, &fetch.final_url);
        Self {
            requested_url,
            metadata,
            extracted,
            fetch,
        }
    }

    /// The document text exactly as fetched
    pub fn raw_document(&self) -> &str {
        &self.fetch.raw_document
    }

    /// Head-only rendering of the fetched document
    pub fn head_view(&self) -> String {
        head_only_view(&self.fetch.raw_document)
    }
}

/// Stages 2-4: parse, classify and resolve an already fetched document
pub fn resolve_document(raw_document: &str, final_url: &Url) -> ResolvedMetadata {
    let declarations = parse_head(raw_document);
    let extracted = MetadataExtractor::extract(&declarations);
    Resolver::resolve(&extracted, final_url)
}

/// Runs inspections with a shared fetcher
#[derive(Debug, Clone)]
pub struct SiteInspector {
    fetcher: Fetcher,
}

impl SiteInspector {
    /// Inspector with a default fetcher
    pub fn new() -> Result<Self> {
        Ok(Self::with_fetcher(Fetcher::new()?))
    }

    /// Inspector around an existing fetcher
    pub fn with_fetcher(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }

    /// The fetcher used for inspections
    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    /// Normalize `input`, fetch it and resolve its metadata
    #[instrument(skip(self, settings))]
    pub async fn inspect(&self, input: &str, settings: &UserSettings) -> Result<SiteReport> {
        let requested_url = parse_url_input(input)?;
        let fetch = self.fetcher.fetch(&requested_url, settings).await?;
        let report = SiteReport::from_fetch(requested_url, fetch);

        info!(
            final_url = %report.fetch.final_url,
            has_title = report.metadata.title.is_some(),
            has_image = report.metadata.image_url.is_some(),
            "Inspection complete"
        );

        Ok(report)
    }
}

/// Fetch `url` and return its resolved metadata.
///
/// Builds a one-off fetcher; long-running callers should keep a
/// [`SiteInspector`] to reuse connections.
pub async fn get_site_metadata(url: &str, settings: &UserSettings) -> Result<ResolvedMetadata> {
    let inspector = SiteInspector::new()?;
    Ok(inspector.inspect(url, settings).await?.metadata)
}
