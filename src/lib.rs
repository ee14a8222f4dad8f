//! Web-Extractor: a configuration-driven web scraping engine
//!
//! This crate drives a page provider (plain HTTP or headless Chromium) through
//! a declarative job: a chain of entities whose URLs come either from a static
//! seed or from fields extracted by an earlier entity. Rows are extracted with
//! CSS selector expressions, paginated, deduplicated and exported together with
//! a run report.

pub mod config;
pub mod data;
pub mod engine;
pub mod output;
pub mod page;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Web-Extractor operations
#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Timed out after {timeout_ms}ms waiting for '{selector}' on {url}")]
    Timeout {
        url: String,
        selector: String,
        timeout_ms: u64,
    },

    #[error("Page provider error: {0}")]
    Page(String),

    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    #[error("Value conversion failed: {0}")]
    Conversion(#[from] data::ConversionError),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Output error: {0}")]
    Output(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("XLSX error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector in config: {0}")]
    InvalidSelector(String),
}

/// Result type alias for Web-Extractor operations
pub type Result<T> = std::result::Result<T, ExtractorError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::JobSpec;
pub use data::{DataStore, FieldValue, Row, WorkItem};
pub use engine::{Engine, RunOutcome};
pub use state::ItemState;
