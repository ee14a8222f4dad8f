//! Exporter trait and run summary types
//!
//! This module defines the interface every data exporter implements and the
//! summary record shared by the JSON report, the markdown summary and the
//! console output.

use crate::config::{JobSpec, OutputFormat};
use crate::data::Row;
use crate::engine::{ErrorStage, RunOutcome};
use crate::output::stats::{compute_metrics, PerformanceMetrics};
use crate::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Writes the final table in one file format
pub trait Exporter {
    /// The format this exporter produces
    fn format(&self) -> OutputFormat;

    /// Writes `rows` to `path` with one column per entry of `columns`
    ///
    /// # Arguments
    ///
    /// * `columns` - Column names in output order
    /// * `rows` - The rows to write; missing fields are written as empty/null
    /// * `path` - Destination file, created or truncated
    fn write(&self, columns: &[String], rows: &[Row], path: &Path) -> Result<()>;
}

/// Summary of one run, serialized as `runtime_report.json`
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    // Run metadata
    pub job: String,
    pub site: String,
    pub config_hash: String,
    pub started_at: String,
    pub finished_at: String,
    pub duration_seconds: f64,

    // Work items and pages
    pub items_admitted: usize,
    pub items_skipped: usize,
    pub items_failed: usize,
    pub pages_fetched: usize,

    // Rows
    pub final_entity: String,
    pub final_rows: usize,
    pub duplicates_removed: usize,
    pub rows_per_entity: BTreeMap<String, usize>,
    pub total_rows: usize,

    // Errors
    pub total_errors: usize,
    pub navigation_errors: usize,
    pub extraction_errors: usize,
    pub budget_errors: u32,
    pub error_budget: u32,

    pub performance_metrics: PerformanceMetrics,
}

impl RunSummary {
    /// Creates a new empty summary
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the summary of a finished run
    ///
    /// # Arguments
    ///
    /// * `job` - The job that ran
    /// * `outcome` - What the run produced
    /// * `config_hash` - Hash of the job file
    pub fn from_outcome(job: &JobSpec, outcome: &RunOutcome, config_hash: &str) -> Self {
        let stats = &outcome.statistics;
        let navigation_errors = outcome
            .errors
            .iter()
            .filter(|e| e.stage == ErrorStage::Navigation)
            .count();
        let duration = outcome.finished_at - outcome.started_at;

        Self {
            job: job.name.clone(),
            site: job.site.name.clone(),
            config_hash: config_hash.to_string(),
            started_at: outcome.started_at.to_rfc3339(),
            finished_at: outcome.finished_at.to_rfc3339(),
            duration_seconds: duration.num_milliseconds() as f64 / 1000.0,
            items_admitted: stats.items_admitted,
            items_skipped: stats.items_skipped,
            items_failed: stats.items_failed,
            pages_fetched: stats.pages_fetched,
            final_entity: outcome.final_entity.clone(),
            final_rows: outcome.final_table.len(),
            duplicates_removed: outcome.duplicates_removed,
            rows_per_entity: outcome.store.row_counts(),
            total_rows: outcome.store.total_rows(),
            total_errors: outcome.errors.len(),
            navigation_errors,
            extraction_errors: outcome.errors.len() - navigation_errors,
            budget_errors: stats.budget_errors,
            error_budget: job.runtime.error_budget,
            performance_metrics: compute_metrics(
                &stats.extraction_times,
                job.reporting.p95_target_seconds,
            ),
        }
    }

    /// True once the error budget stopped admissions
    pub fn budget_exhausted(&self) -> bool {
        self.budget_errors >= self.error_budget
    }

    /// Share of admitted items that did not fail, as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.items_admitted == 0 {
            return 0.0;
        }
        let succeeded = self.items_admitted.saturating_sub(self.items_failed);
        (succeeded as f64 / self.items_admitted as f64) * 100.0
    }
}
