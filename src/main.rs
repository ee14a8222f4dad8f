//! Web-Extractor main entry point
//!
//! This is the command-line interface for the Web-Extractor scraping engine.

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use web_extractor::config::{job_config_path, load_config_with_hash, JobSpec, PaginateMode};
use web_extractor::engine::{Engine, RunOutcome};
use web_extractor::output::{
    export_final_table, git_commit_hash, print_statistics, write_report, RunSummary,
};
use web_extractor::page::{HttpPageProvider, PageProvider};

/// Page provider used to load pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ProviderKind {
    /// Plain HTTP requests, static HTML only
    Http,
    /// Headless Chromium (requires the `browser` feature)
    Browser,
}

/// Web-Extractor: a configuration-driven web scraping engine
///
/// Runs a job described in `<config-dir>/<JOB>.toml`: entities are scraped in
/// order, chained through extracted links, and the final entity's rows are
/// exported together with a run report.
#[derive(Parser, Debug)]
#[command(name = "web-extractor")]
#[command(version = "1.0.0")]
#[command(about = "A configuration-driven web scraping engine", long_about = None)]
struct Cli {
    /// Job name, resolved to <config-dir>/<JOB>.toml
    #[arg(value_name = "JOB")]
    job: String,

    /// Directory holding job files
    #[arg(long, value_name = "DIR", default_value = "configs")]
    config_dir: PathBuf,

    /// Show the browser window (browser provider only)
    #[arg(long)]
    headed: bool,

    /// Page provider
    #[arg(long, value_enum, default_value_t = ProviderKind::Http)]
    provider: ProviderKind,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate the job and show what would be scraped without scraping
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let path = job_config_path(&cli.config_dir, &cli.job);
    if !path.exists() {
        bail!("Job file not found: {}", path.display());
    }

    tracing::info!("Loading job from: {}", path.display());
    let (job, config_hash) = load_config_with_hash(&path)
        .with_context(|| format!("Failed to load job {}", path.display()))?;
    tracing::info!("Job loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&job);
        return Ok(());
    }

    let outcome = match cli.provider {
        ProviderKind::Http => {
            let provider = Arc::new(HttpPageProvider::from_runtime(&job.runtime));
            handle_run(&job, provider).await?
        }
        ProviderKind::Browser => run_in_browser(&job, cli.headed).await?,
    };

    write_outputs(&job, &outcome, &config_hash);
    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("web_extractor=info,warn"),
            1 => EnvFilter::new("web_extractor=debug,info"),
            2 => EnvFilter::new("web_extractor=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the validated plan
fn handle_dry_run(job: &JobSpec) {
    println!("=== Web-Extractor Dry Run: {} ===\n", job.name);

    println!("Site: {} ({})", job.site.name, job.site.base_url);
    match &job.auth.session_file {
        Some(path) => println!("Session: {}", path.display()),
        None => println!("Session: none"),
    }

    println!("\nRuntime:");
    println!("  Concurrency: {}", job.runtime.concurrency);
    println!("  Inter-page delay: {}ms", job.runtime.inter_page_delay_ms);
    println!("  Error budget: {}", job.runtime.error_budget);
    println!(
        "  Timeouts: navigation {}ms, selector {}ms",
        job.runtime.navigation_timeout_ms, job.runtime.selector_timeout_ms
    );

    if let Some(discovery) = &job.discovery {
        println!("\nDiscovery:");
        println!("  Start page: {}", discovery.start_page);
        println!("  Links: {}@{}", discovery.link_selector, discovery.attribute_name());
        if let (Some(regex), Some(template)) = (&discovery.extract_regex, &discovery.url_template) {
            println!("  Rewrite: {} -> {}", regex, template);
        }
    }

    println!("\nEntities ({}):", job.entities.len());
    for entity in &job.entities {
        let source = match (&entity.url, &entity.follow_from) {
            (Some(url), _) => format!("url {}", url),
            (None, Some(reference)) => format!("follows {}", reference),
            (None, None) => "seeded by discovery".to_string(),
        };
        println!("  - {} ({})", entity.name, source);
        println!("    rows: {}", entity.row_selector);
        for (field, spec) in &entity.fields {
            println!("    * {} = {} [{}]", field, spec.selector(), spec.kind().name());
        }
        if let Some(paginate) = &entity.paginate {
            let mode = match paginate.mode {
                PaginateMode::NextButton => format!(
                    "next-button {}",
                    paginate.next_selector.as_deref().unwrap_or_default()
                ),
                PaginateMode::PageIndex => format!("page-index from {}", paginate.start_index),
            };
            match paginate.max_pages {
                Some(max) => println!("    paginate: {} (max {} pages)", mode, max),
                None => println!("    paginate: {}", mode),
            }
        }
    }

    println!("\nOutput:");
    println!("  Directory: {}", job.output.dir.display());
    let formats: Vec<&str> = job.output.formats.iter().map(|f| f.extension()).collect();
    println!("  Formats: {}", formats.join(", "));
    if !job.output.primary_key.is_empty() {
        println!("  Primary key: {}", job.output.primary_key.join(", "));
    }

    println!("\n✓ Job is valid");
}

/// Runs the engine with the given provider
async fn handle_run<P: PageProvider>(
    job: &JobSpec,
    provider: Arc<P>,
) -> anyhow::Result<RunOutcome> {
    let engine = Engine::new(job.clone(), provider);
    let outcome = engine.run().await.context("Run failed")?;
    Ok(outcome)
}

#[cfg(feature = "browser")]
async fn run_in_browser(job: &JobSpec, headed: bool) -> anyhow::Result<RunOutcome> {
    use web_extractor::page::BrowserPageProvider;

    let provider = Arc::new(
        BrowserPageProvider::launch(&job.runtime.user_agent, !headed)
            .await
            .context("Failed to launch browser")?,
    );
    let outcome = handle_run(job, Arc::clone(&provider)).await;

    match Arc::try_unwrap(provider) {
        Ok(provider) => {
            if let Err(e) = provider.shutdown().await {
                tracing::warn!("Browser shutdown failed: {}", e);
            }
        }
        Err(_) => tracing::warn!("Browser provider still shared, skipping shutdown"),
    }
    outcome
}

#[cfg(not(feature = "browser"))]
async fn run_in_browser(_job: &JobSpec, _headed: bool) -> anyhow::Result<RunOutcome> {
    bail!("The browser provider requires building with `--features browser`")
}

/// Exports the final table and writes the report; failures are logged only
fn write_outputs(job: &JobSpec, outcome: &RunOutcome, config_hash: &str) {
    let commit = git_commit_hash();

    let files = match export_final_table(job, outcome, &commit) {
        Ok(files) => files,
        Err(e) => {
            tracing::error!("Failed to export final table: {}", e);
            Vec::new()
        }
    };

    let report = match write_report(job, outcome, config_hash) {
        Ok(dir) => Some(dir),
        Err(e) => {
            tracing::error!("Failed to write run report: {}", e);
            None
        }
    };

    let summary = RunSummary::from_outcome(job, outcome, config_hash);
    print_statistics(&summary);
    println!();

    if files.is_empty() {
        println!("✗ No output produced for {}", outcome.final_entity);
    }
    for file in &files {
        println!("✓ Saved {}", file.display());
    }
    if let Some(dir) = report {
        println!("✓ Report in {}", dir.display());
    }
}
