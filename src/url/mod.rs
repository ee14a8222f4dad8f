//! URL handling module for Web-Extractor
//!
//! This module resolves configured and extracted links against the site's
//! base URL and builds page URLs for page-index pagination.

mod resolve;

// Re-export main functions
pub use resolve::{page_url, resolve_url, DEFAULT_PAGE_PARAM, PAGE_PLACEHOLDER};
