//! Page fetching
//!
//! Loads one page through a [`PageHandle`], waits for the entity's rows and
//! extracts them. Failures never escape: they are recorded in the run
//! context and the page contributes no rows.

use super::context::{ErrorRecord, RunContext};
use super::extractor::extract_page;
use crate::config::{EntitySpec, RuntimeConfig};
use crate::data::Row;
use crate::page::PageHandle;
use crate::ExtractorError;
use std::time::Instant;
use url::Url;

/// Settings and shared state every page fetch of a run needs
#[derive(Debug, Clone, Copy)]
pub struct FetchScope<'a> {
    pub base_url: &'a Url,
    pub runtime: &'a RuntimeConfig,
    pub context: &'a RunContext,
}

/// How far loading a page got
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStatus {
    /// Rows were looked for (possibly none found)
    Extracted,
    /// The row selector never appeared; treated as "no more content"
    TimedOut,
    /// The page could not be reached or read
    Failed,
}

/// Result of fetching one page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: PageStatus,
    pub rows: Vec<Row>,
    /// Absolute URL of the next page (next-button pagination only)
    pub next_url: Option<String>,
}

impl FetchedPage {
    fn empty(status: PageStatus) -> Self {
        Self {
            status,
            rows: Vec::new(),
            next_url: None,
        }
    }
}

/// Navigates to `url`, waits for the entity's rows and extracts them
///
/// # Arguments
///
/// * `page` - The item's page handle
/// * `url` - Absolute URL to load
/// * `entity` - Entity whose selectors are applied
/// * `inherited` - Fields carried over from the source row
/// * `scope` - Timeouts, base URL and the run context
///
/// # Returns
///
/// The extracted rows and next page URL. Navigation failures are recorded
/// (and counted against the error budget) and yield an empty page with
/// status [`PageStatus::Failed`].
pub async fn fetch_page<H: PageHandle>(
    page: &mut H,
    url: &str,
    entity: &EntitySpec,
    inherited: &Row,
    scope: &FetchScope<'_>,
) -> FetchedPage {
    let ctx = scope.context;
    tracing::debug!("[{}] Scraping page: {}", entity.name, url);
    let started = Instant::now();

    if let Err(e) = page.goto(url, scope.runtime.navigation_timeout()).await {
        ctx.record_counted(ErrorRecord::navigation(url, &entity.name, e.to_string()));
        return FetchedPage::empty(PageStatus::Failed);
    }
    ctx.page_fetched();

    match page
        .wait_for_selector(&entity.row_selector, scope.runtime.selector_timeout())
        .await
    {
        Ok(()) => {}
        Err(e @ ExtractorError::Timeout { .. }) => {
            tracing::warn!(
                "[{}] Timeout waiting for selector '{}' on {}",
                entity.name,
                entity.row_selector,
                url
            );
            ctx.record(ErrorRecord::navigation(url, &entity.name, e.to_string()));
            return FetchedPage::empty(PageStatus::TimedOut);
        }
        Err(e) => {
            ctx.record_counted(ErrorRecord::navigation(url, &entity.name, e.to_string()));
            return FetchedPage::empty(PageStatus::Failed);
        }
    }
    ctx.record_extraction_time(started.elapsed().as_secs_f64());

    let html = match page.content().await {
        Ok(html) => html,
        Err(e) => {
            ctx.record_counted(ErrorRecord::navigation(url, &entity.name, e.to_string()));
            return FetchedPage::empty(PageStatus::Failed);
        }
    };

    let extraction = match extract_page(&html, entity, inherited, scope.base_url) {
        Ok(extraction) => extraction,
        Err(e) => {
            ctx.record(ErrorRecord::extraction(
                url,
                &entity.name,
                "",
                &entity.row_selector,
                e.to_string(),
            ));
            return FetchedPage::empty(PageStatus::Extracted);
        }
    };

    for failure in extraction.failures {
        ctx.record(ErrorRecord::extraction(
            url,
            &entity.name,
            &failure.field,
            &failure.selector,
            failure.message,
        ));
    }

    if extraction.rows.is_empty() {
        tracing::warn!(
            "[{}] Row selector '{}' found no matches on {}",
            entity.name,
            entity.row_selector,
            url
        );
    } else {
        tracing::debug!(
            "[{}] Extracted {} rows from {}",
            entity.name,
            extraction.rows.len(),
            url
        );
    }

    FetchedPage {
        status: PageStatus::Extracted,
        rows: extraction.rows,
        next_url: extraction.next_url,
    }
}
