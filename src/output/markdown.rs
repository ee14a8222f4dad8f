//! Markdown summary generation
//!
//! This module generates the human-readable `summary.md` of a run,
//! including item and row counts, the error breakdown and the latency
//! verdict.

use crate::engine::ErrorRecord;
use crate::output::traits::RunSummary;
use crate::Result;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Generates a markdown summary of a run
///
/// # Arguments
///
/// * `summary` - The run summary
/// * `errors` - Recorded errors, grouped by entity and stage in the output
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(ExtractorError)` - Failed to write summary
pub fn generate_markdown_summary(
    summary: &RunSummary,
    errors: &[ErrorRecord],
    output_path: &Path,
) -> Result<()> {
    let markdown = format_markdown_summary(summary, errors);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

fn seconds(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.3} s", v))
        .unwrap_or_else(|| "n/a".to_string())
}

/// Formats a run summary as markdown
pub fn format_markdown_summary(summary: &RunSummary, errors: &[ErrorRecord]) -> String {
    let mut md = String::new();

    md.push_str(&format!("# Run Summary: {}\n\n", summary.job));

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Site**: {}\n", summary.site));
    md.push_str(&format!("- **Started**: {}\n", summary.started_at));
    md.push_str(&format!("- **Finished**: {}\n", summary.finished_at));
    md.push_str(&format!(
        "- **Duration**: {:.1} seconds\n",
        summary.duration_seconds
    ));
    md.push_str(&format!("- **Config Hash**: {}\n\n", summary.config_hash));

    if summary.final_rows == 0 {
        md.push_str(&format!(
            "> No output produced: entity '{}' has no rows.\n\n",
            summary.final_entity
        ));
    }

    // Work items
    md.push_str("## Work Items\n\n");
    md.push_str("| Outcome | Count |\n");
    md.push_str("|---------|-------|\n");
    md.push_str(&format!("| Admitted | {} |\n", summary.items_admitted));
    md.push_str(&format!("| Skipped | {} |\n", summary.items_skipped));
    md.push_str(&format!("| Failed | {} |\n", summary.items_failed));
    md.push_str(&format!("| Pages fetched | {} |\n\n", summary.pages_fetched));
    md.push_str(&format!(
        "- **Success Rate**: {:.2}%\n",
        summary.success_rate()
    ));
    if summary.budget_exhausted() {
        md.push_str(&format!(
            "- **Error budget exhausted** ({} of {}), later work items were skipped\n",
            summary.budget_errors, summary.error_budget
        ));
    }
    md.push('\n');

    // Rows
    md.push_str("## Rows by Entity\n\n");
    md.push_str("| Entity | Rows |\n");
    md.push_str("|--------|------|\n");
    for (entity, count) in &summary.rows_per_entity {
        md.push_str(&format!("| {} | {} |\n", entity, count));
    }
    md.push_str(&format!(
        "\nFinal dataset `{}`: **{}** rows after removing {} duplicates.\n\n",
        summary.final_entity, summary.final_rows, summary.duplicates_removed
    ));

    // Latency
    let metrics = &summary.performance_metrics;
    md.push_str("## Performance\n\n");
    md.push_str(&format!("- **Timed pages**: {}\n", metrics.samples));
    md.push_str(&format!("- **p50**: {}\n", seconds(metrics.p50_seconds)));
    md.push_str(&format!("- **p95**: {}\n", seconds(metrics.p95_seconds)));
    md.push_str(&format!(
        "- **Average**: {}\n",
        seconds(metrics.average_seconds)
    ));
    md.push_str(&format!(
        "- **Total**: {:.3} s\n",
        metrics.total_extraction_seconds
    ));
    if let Some(target) = metrics.target_p95_seconds {
        let verdict = match metrics.target_met {
            Some(true) => "met",
            Some(false) => "NOT met",
            None => "not measured",
        };
        md.push_str(&format!("- **p95 target** ({:.3} s): {}\n", target, verdict));
    }
    md.push('\n');

    // Error summary
    md.push_str("## Errors\n\n");
    md.push_str(&format!(
        "- **Total**: {} ({} navigation, {} extraction)\n",
        summary.total_errors, summary.navigation_errors, summary.extraction_errors
    ));
    md.push_str(&format!(
        "- **Counted against budget**: {} of {}\n\n",
        summary.budget_errors, summary.error_budget
    ));

    if !errors.is_empty() {
        let mut breakdown: BTreeMap<(&str, &str), usize> = BTreeMap::new();
        for error in errors {
            *breakdown
                .entry((error.entity.as_str(), error.stage.as_str()))
                .or_default() += 1;
        }

        md.push_str("| Entity | Stage | Count |\n");
        md.push_str("|--------|-------|-------|\n");
        for ((entity, stage), count) in breakdown {
            md.push_str(&format!("| {} | {} | {} |\n", entity, stage, count));
        }
        md.push('\n');
    }

    md
}
