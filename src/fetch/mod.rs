//! Document fetching
//!
//! This module retrieves target documents over HTTP with a fixed request
//! profile, and normalizes raw user input into absolute URLs before any
//! request is made.

pub mod client;
pub mod input;

pub use client::{
    FetchConfig, FetchConfigBuilder, FetchResult, Fetcher, UserSettings, ACCEPT_LANGUAGE,
    DEFAULT_USER_AGENT,
};
pub use input::parse_url_input;
