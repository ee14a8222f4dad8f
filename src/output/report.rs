//! Run report files
//!
//! A run report lives in `<output-dir>/<site>_<job>_reports/` and holds:
//! - `runtime_report.json`: the serialized [`RunSummary`]
//! - `error_report.csv`: one line per recorded error, only when errors exist
//! - `summary.md`: the markdown summary

use crate::config::JobSpec;
use crate::engine::{ErrorRecord, RunOutcome};
use crate::output::markdown::generate_markdown_summary;
use crate::output::traits::RunSummary;
use crate::Result;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process::Command;

pub const RUNTIME_REPORT: &str = "runtime_report.json";
pub const ERROR_REPORT: &str = "error_report.csv";
pub const MARKDOWN_SUMMARY: &str = "summary.md";

/// Directory receiving the report files of a job
pub fn report_dir(job: &JobSpec) -> PathBuf {
    job.output
        .dir
        .join(format!("{}_{}_reports", job.site.name, job.name))
}

/// Short hash of the current git commit, `nogit` outside a repository
pub fn git_commit_hash() -> String {
    Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|hash| hash.trim().to_string())
        .filter(|hash| !hash.is_empty())
        .unwrap_or_else(|| "nogit".to_string())
}

/// Writes the errors as CSV
pub fn write_error_report(errors: &[ErrorRecord], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "timestamp", "entity", "url", "stage", "field", "selector", "message",
    ])?;
    for error in errors {
        writer.write_record([
            error.timestamp.to_rfc3339().as_str(),
            error.entity.as_str(),
            error.url.as_str(),
            error.stage.as_str(),
            error.field.as_deref().unwrap_or_default(),
            error.selector.as_deref().unwrap_or_default(),
            error.message.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes the complete run report
///
/// # Arguments
///
/// * `job` - The job that ran
/// * `outcome` - The finished run
/// * `config_hash` - Hash of the job file
///
/// # Returns
///
/// * `Ok(PathBuf)` - The report directory
/// * `Err(ExtractorError)` - Failed to create the directory or a file
pub fn write_report(job: &JobSpec, outcome: &RunOutcome, config_hash: &str) -> Result<PathBuf> {
    let dir = report_dir(job);
    std::fs::create_dir_all(&dir)?;

    let summary = RunSummary::from_outcome(job, outcome, config_hash);

    let writer = BufWriter::new(File::create(dir.join(RUNTIME_REPORT))?);
    serde_json::to_writer_pretty(writer, &summary)?;

    if outcome.errors.is_empty() {
        tracing::info!("No errors recorded");
    } else {
        write_error_report(&outcome.errors, &dir.join(ERROR_REPORT))?;
        tracing::warn!(
            "{} errors written to {}",
            outcome.errors.len(),
            dir.join(ERROR_REPORT).display()
        );
    }

    generate_markdown_summary(&summary, &outcome.errors, &dir.join(MARKDOWN_SUMMARY))?;

    tracing::info!("Run report written to {}", dir.display());
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_error_report_columns() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(ERROR_REPORT);
        let errors = vec![
            ErrorRecord::navigation("https://x.test/a", "List", "HTTP 500"),
            ErrorRecord::extraction("https://x.test/b", "List", "price", ".price", "bad value"),
        ];

        write_error_report(&errors, &path).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[3], "stage");
        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(&records[0][3], "navigation");
        assert_eq!(&records[0][4], "");
        assert_eq!(&records[1][4], "price");
        assert_eq!(&records[1][5], ".price");
    }

    #[test]
    fn test_git_commit_hash_is_never_empty() {
        assert!(!git_commit_hash().is_empty());
    }
}
