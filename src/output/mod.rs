//! Output module for exporting results and writing run reports
//!
//! This module handles:
//! - Exporting the final table as CSV, JSON and XLSX
//! - Computing latency percentiles and the p95 target verdict
//! - Writing the run report (runtime JSON, error CSV, markdown summary)

mod export;
mod markdown;
mod report;
pub mod stats;
mod traits;

pub use export::{
    export_final_table, exporter_for, output_file_stem, table_columns, CsvExporter, JsonExporter,
    XlsxExporter,
};
pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use report::{
    git_commit_hash, report_dir, write_error_report, write_report, ERROR_REPORT,
    MARKDOWN_SUMMARY, RUNTIME_REPORT,
};
pub use stats::{compute_metrics, percentile, print_statistics, PerformanceMetrics};
pub use traits::{Exporter, RunSummary};
