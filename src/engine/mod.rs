//! The scraping engine
//!
//! This module runs a job end to end:
//! - Optional discovery pass seeding the first entity
//! - Entities processed strictly in declaration order, each resolved from a
//!   static seed or from the rows of an earlier entity
//! - Bounded-concurrency fan-out with an error budget circuit breaker
//! - Aggregation and deduplication of the final entity's rows

mod aggregator;
mod context;
mod coordinator;
mod discovery;
mod extractor;
mod fetcher;
mod resolver;

pub use aggregator::{deduplicate, finalize, key_columns, FinalTable};
pub use context::{ErrorRecord, ErrorStage, RunContext, RunStatistics};
pub use coordinator::{Coordinator, ItemOutcome};
pub use discovery::{discover, harvest_links, run_discovery};
pub use extractor::{
    element_text, extract_field, extract_page, extract_row, FieldFailure, PageExtraction,
    SelectorExpr,
};
pub use fetcher::{fetch_page, FetchScope, FetchedPage, PageStatus};
pub use resolver::resolve;

use crate::config::{validate, JobSpec};
use crate::data::{DataStore, Row, WorkItem};
use crate::page::{PageProvider, SessionState};
use crate::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use url::Url;

/// Everything a finished run produced
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub store: DataStore,
    pub final_entity: String,
    /// Deduplicated rows of the final entity
    pub final_table: Vec<Row>,
    pub duplicates_removed: usize,
    pub errors: Vec<ErrorRecord>,
    pub statistics: RunStatistics,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunOutcome {
    /// True when the final entity produced at least one row
    pub fn has_output(&self) -> bool {
        !self.final_table.is_empty()
    }
}

/// Runs one job against a page provider
pub struct Engine<P: PageProvider> {
    job: JobSpec,
    provider: Arc<P>,
}

impl<P: PageProvider> Engine<P> {
    pub fn new(job: JobSpec, provider: Arc<P>) -> Self {
        Self { job, provider }
    }

    pub fn job(&self) -> &JobSpec {
        &self.job
    }

    /// Runs discovery, every entity in order, then aggregation
    ///
    /// An invalid job fails the run before any page is opened. Every other
    /// failure is recorded in the outcome.
    pub async fn run(&self) -> Result<RunOutcome> {
        let job = &self.job;
        validate(job)?;
        let started_at = Utc::now();
        let base_url = Url::parse(&job.site.base_url)?;

        tracing::info!(
            "Starting job '{}' on {} ({} entities)",
            job.name,
            job.site.name,
            job.entities.len()
        );

        let session = job.auth.session_file.as_deref().map(SessionState::load);
        let context = Arc::new(RunContext::new(job.runtime.error_budget, session));
        let coordinator = Coordinator::new(
            Arc::clone(&self.provider),
            Arc::clone(&context),
            job.runtime.clone(),
            base_url.clone(),
        );

        let mut discovered = match &job.discovery {
            Some(config) => Some(
                run_discovery(
                    &*self.provider,
                    config,
                    &base_url,
                    &job.runtime,
                    &context,
                )
                .await,
            ),
            None => None,
        };

        let mut store = DataStore::new();
        for (index, entity) in job.entities.iter().enumerate() {
            let seeded = index == 0 && entity.url.is_none() && entity.follow_from.is_none();
            let items = match discovered.take().filter(|_| seeded) {
                Some(urls) => urls.into_iter().map(WorkItem::seed).collect(),
                None => resolve(entity, &store, &base_url),
            };

            if items.is_empty() {
                tracing::warn!("[{}] No URLs to scrape", entity.name);
            }

            let rows = coordinator.run_entity(entity, items).await;
            store.insert(&entity.name, rows);
        }

        let table = finalize(&store, job);
        if table.rows.is_empty() {
            tracing::warn!(
                "No final data was produced for entity '{}'",
                table.entity
            );
        }

        let statistics = context.statistics();
        tracing::info!(
            "Job '{}' finished: {} final rows, {} pages, {} errors",
            job.name,
            table.rows.len(),
            statistics.pages_fetched,
            statistics.total_errors
        );

        Ok(RunOutcome {
            store,
            final_entity: table.entity,
            final_table: table.rows,
            duplicates_removed: table.duplicates_removed,
            errors: context.errors(),
            statistics,
            started_at,
            finished_at: Utc::now(),
        })
    }
}
