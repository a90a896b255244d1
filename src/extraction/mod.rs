//! Metadata extraction module
//!
//! The synchronous stages of the pipeline: head parsing, classification into
//! per-standard groups, and resolution into one canonical record.

pub mod head;
pub mod metadata;
pub mod raw;
pub mod resolve;
pub mod urls;

pub use head::{head_section, parse_head, RawDeclaration, TagKind, MAX_HEAD_BYTES};
pub use metadata::{ExtractedMetadata, LinkValue, MetadataExtractor, MetadataGroup};
pub use raw::head_only_view;
pub use resolve::{
    AlternateLink, Field, FieldSource, IconLink, ResolvedMetadata, Resolver, TwitterCardKind,
};
pub use urls::resolve_url;
