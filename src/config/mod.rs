//! Configuration module for Web-Extractor
//!
//! This module handles loading, parsing, and validating TOML job files.
//!
//! # Example
//!
//! ```no_run
//! use web_extractor::config::load_config;
//! use std::path::Path;
//!
//! let job = load_config(Path::new("configs/catalog.toml")).unwrap();
//! println!("Job {} defines {} entities", job.name, job.entities.len());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    AuthConfig, DiscoveryConfig, EntitySpec, FieldSpec, JobSpec, OutputConfig, OutputFormat,
    PaginateConfig, PaginateMode, ReportingConfig, RuntimeConfig, SiteConfig, DEFAULT_USER_AGENT,
};

// Re-export parser functions
pub use parser::{compute_config_hash, job_config_path, load_config, load_config_with_hash};

// Re-export validation helpers
pub use validation::{split_follow_from, validate};
