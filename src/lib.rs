//! site-meta - website metadata inspection
//!
//! Fetches a web page and reports the metadata it declares in its `<head>`:
//! title and description, Open Graph and Twitter Card properties, icons,
//! canonical and alternate links. Competing declarations are collapsed into
//! one canonical record by fixed precedence rules, with every URL resolved
//! against the final (post-redirect) address.
//!
//! # Architecture
//!
//! ```text
//! input ──▶ fetch::input ──▶ Fetcher ──▶ parse_head ──▶ MetadataExtractor ──▶ Resolver
//!          (normalize)      (HTTP GET)  (RawDeclaration) (per-standard groups) (ResolvedMetadata)
//! ```
//!
//! Only the fetch suspends. Everything after it is a pure function of the
//! fetched text and the final URL, see [`resolve_document`].
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use site_meta::{get_site_metadata, UserSettings};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let metadata = get_site_metadata("example.com", &UserSettings::default()).await?;
//!     println!("{:?}", metadata.title);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod cors;
pub mod error;
pub mod extraction;
pub mod fetch;
pub mod handlers;
pub mod pipeline;

// Re-exports for convenience
pub use config::ServerConfig;
pub use error::{Error, FetchError, FetchErrorKind, InputError, PipelineError, Result};
pub use extraction::{ExtractedMetadata, MetadataExtractor, ResolvedMetadata, Resolver};
pub use fetch::{FetchConfig, FetchResult, Fetcher, UserSettings};
pub use pipeline::{get_site_metadata, resolve_document, SiteInspector, SiteReport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
