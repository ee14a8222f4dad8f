//! Integration tests for Web-Extractor
//!
//! These tests use wiremock to create mock HTTP servers and run whole jobs
//! end-to-end through the HTTP page provider.

mod common;
mod output_tests;
mod scrape_tests;
