use crate::config::types::JobSpec;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Loads and parses a job file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML job file
///
/// # Returns
///
/// * `Ok(JobSpec)` - Successfully loaded and validated job
/// * `Err(ConfigError)` - Failed to load, parse, or validate the job
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use web_extractor::config::load_config;
///
/// let job = load_config(Path::new("configs/catalog.toml")).unwrap();
/// println!("Concurrency: {}", job.runtime.concurrency);
/// ```
pub fn load_config(path: &Path) -> Result<JobSpec, ConfigError> {
    let content = std::fs::read_to_string(path)?;

    let job: JobSpec = toml::from_str(&content)?;

    validate(&job)?;

    Ok(job)
}

/// Computes a SHA-256 hash of the job file content
///
/// The hash is recorded in the run report so results can be traced back to
/// the exact configuration that produced them.
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a job and returns both the job and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(JobSpec, String), ConfigError> {
    let job = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((job, hash))
}

/// Resolves a job name to its file inside the config directory
///
/// ```
/// use std::path::Path;
/// use web_extractor::config::job_config_path;
///
/// let path = job_config_path(Path::new("configs"), "catalog");
/// assert_eq!(path, Path::new("configs/catalog.toml"));
/// ```
pub fn job_config_path(config_dir: &Path, job_name: &str) -> PathBuf {
    config_dir.join(format!("{}.toml", job_name))
}
