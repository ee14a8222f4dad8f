//! Run statistics
//!
//! This module derives latency metrics from the recorded page extraction
//! times and prints run summaries to the console.

use crate::output::traits::RunSummary;
use serde::Serialize;

/// Latency of page loads (navigation plus readiness wait), in seconds
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerformanceMetrics {
    /// Number of timed pages
    pub samples: usize,
    pub p50_seconds: Option<f64>,
    pub p95_seconds: Option<f64>,
    pub average_seconds: Option<f64>,
    pub total_extraction_seconds: f64,
    pub target_p95_seconds: Option<f64>,
    /// Whether p95 stayed within the target; absent without target or samples
    pub target_met: Option<bool>,
}

/// Percentile of a sorted sample using linear interpolation between closest ranks
///
/// # Arguments
///
/// * `sorted` - Samples in ascending order
/// * `q` - Quantile in `0.0..=1.0`
///
/// ```
/// use web_extractor::output::percentile;
///
/// assert_eq!(percentile(&[1.0, 2.0, 3.0, 4.0], 0.5), Some(2.5));
/// assert_eq!(percentile(&[], 0.95), None);
/// ```
pub fn percentile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

/// Computes latency metrics and checks them against an optional p95 target
pub fn compute_metrics(times: &[f64], target_p95_seconds: Option<f64>) -> PerformanceMetrics {
    let mut sorted = times.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let total: f64 = sorted.iter().sum();
    let p95 = percentile(&sorted, 0.95);

    PerformanceMetrics {
        samples: sorted.len(),
        p50_seconds: percentile(&sorted, 0.5),
        p95_seconds: p95,
        average_seconds: (!sorted.is_empty()).then(|| total / sorted.len() as f64),
        total_extraction_seconds: total,
        target_p95_seconds,
        target_met: match (target_p95_seconds, p95) {
            (Some(target), Some(p95)) => Some(p95 <= target),
            _ => None,
        },
    }
}

fn seconds(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.3}s", v))
        .unwrap_or_else(|| "n/a".to_string())
}

/// Prints a run summary to stdout in a formatted manner
///
/// # Arguments
///
/// * `summary` - The summary to display
pub fn print_statistics(summary: &RunSummary) {
    println!("=== Run Statistics: {} ({}) ===\n", summary.job, summary.site);

    println!("Work items:");
    println!("  Admitted: {}", summary.items_admitted);
    println!("  Skipped: {}", summary.items_skipped);
    println!("  Failed: {}", summary.items_failed);
    println!("  Pages fetched: {}", summary.pages_fetched);
    println!();

    println!("Rows by Entity:");
    for (entity, count) in &summary.rows_per_entity {
        println!("  {}: {}", entity, count);
    }
    println!(
        "  Final ({}): {} ({} duplicates removed)",
        summary.final_entity, summary.final_rows, summary.duplicates_removed
    );
    println!();

    println!(
        "Errors: {} ({} navigation, {} extraction), budget {}/{}",
        summary.total_errors,
        summary.navigation_errors,
        summary.extraction_errors,
        summary.budget_errors,
        summary.error_budget
    );

    let metrics = &summary.performance_metrics;
    println!(
        "Latency: p50 {}, p95 {}, average {} over {} pages",
        seconds(metrics.p50_seconds),
        seconds(metrics.p95_seconds),
        seconds(metrics.average_seconds),
        metrics.samples
    );
    if let (Some(target), Some(met)) = (metrics.target_p95_seconds, metrics.target_met) {
        println!(
            "p95 target {:.3}s: {}",
            target,
            if met { "met" } else { "NOT met" }
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_interpolates() {
        let sorted: Vec<f64> = (1..=10).map(f64::from).collect();
        assert_eq!(percentile(&sorted, 0.0), Some(1.0));
        assert_eq!(percentile(&sorted, 1.0), Some(10.0));
        let p95 = percentile(&sorted, 0.95).unwrap();
        assert!((p95 - 9.55).abs() < 1e-9);
    }

    #[test]
    fn test_single_sample() {
        assert_eq!(percentile(&[2.5], 0.95), Some(2.5));
    }

    #[test]
    fn test_compute_metrics_with_target() {
        let metrics = compute_metrics(&[3.0, 1.0, 2.0], Some(2.5));
        assert_eq!(metrics.samples, 3);
        assert_eq!(metrics.p50_seconds, Some(2.0));
        assert_eq!(metrics.average_seconds, Some(2.0));
        assert_eq!(metrics.total_extraction_seconds, 6.0);
        assert_eq!(metrics.target_met, Some(false));

        let relaxed = compute_metrics(&[3.0, 1.0, 2.0], Some(5.0));
        assert_eq!(relaxed.target_met, Some(true));
    }

    #[test]
    fn test_compute_metrics_without_samples() {
        let metrics = compute_metrics(&[], Some(1.0));
        assert_eq!(metrics.p95_seconds, None);
        assert_eq!(metrics.average_seconds, None);
        assert_eq!(metrics.target_met, None);
    }
}
