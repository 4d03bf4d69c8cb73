//! Page fetching, content extraction, and link filtering.
//!
//! This crate provides:
//! - [`link_filter`]: pure URL classification (noise filter, source-code
//!   detection, navigation ranking)
//! - [`fetcher`]: the two-path [`Fetcher`] (direct GET, rendered fallback)
//! - [`renderer`]: rendering backends (headless Chromium, plain HTTP)
//! - [`content`]: primary-content and visible-link extraction from HTML

pub mod content;
pub mod fetcher;
pub mod link_filter;
pub mod renderer;

pub use fetcher::{FetchPath, FetchedPage, Fetcher, PageFetcher, raw_content_url};
pub use link_filter::{
    LinkPriority, RankedLink, has_text_extension, is_code_host, is_same_site, is_source_code,
    is_useful, rank_links,
};
pub use renderer::{ChromiumRenderer, HttpRenderer, Renderer};
