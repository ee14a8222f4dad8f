//! Task coordination for one entity
//!
//! Fans the work items of an entity out over concurrent tasks:
//! - At most `concurrency` items hold a page at any time (semaphore permits)
//! - Admission happens in item order and stops once the error budget is exhausted
//! - Each admitted item gets its own page, closed on every exit path
//! - Items paginate independently (next-button or page-index)
//! - Failures stay inside the item that hit them

use super::context::{ErrorRecord, RunContext};
use super::fetcher::{fetch_page, FetchScope, PageStatus};
use crate::config::{EntitySpec, PaginateMode, RuntimeConfig};
use crate::data::{Row, WorkItem};
use crate::page::{PageHandle, PageProvider};
use crate::state::{ItemState, ItemTracker};
use crate::url::page_url;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

/// What happened to one work item
#[derive(Debug, Clone)]
pub struct ItemOutcome {
    pub index: usize,
    pub url: String,
    pub state: ItemState,
    pub pages: u32,
    pub rows: Vec<Row>,
}

impl ItemOutcome {
    fn skipped(index: usize, item: WorkItem) -> Self {
        Self {
            index,
            url: item.url,
            state: ItemState::Skipped,
            pages: 0,
            rows: Vec::new(),
        }
    }
}

/// Drives the work items of each entity through a page provider
///
/// A concurrency of zero is raised to one.
pub struct Coordinator<P: PageProvider> {
    provider: Arc<P>,
    context: Arc<RunContext>,
    runtime: Arc<RuntimeConfig>,
    base_url: Arc<Url>,
}

impl<P: PageProvider> Coordinator<P> {
    pub fn new(
        provider: Arc<P>,
        context: Arc<RunContext>,
        mut runtime: RuntimeConfig,
        base_url: Url,
    ) -> Self {
        runtime.concurrency = runtime.concurrency.max(1);
        Self {
            provider,
            context,
            runtime: Arc::new(runtime),
            base_url: Arc::new(base_url),
        }
    }

    /// Processes every work item of `entity` and returns their rows
    ///
    /// Rows are ordered by work item, then by page.
    pub async fn run_entity(&self, entity: &EntitySpec, items: Vec<WorkItem>) -> Vec<Row> {
        let outcomes = self.run_items(entity, items).await;

        let mut done = 0;
        let mut failed = 0;
        let mut skipped = 0;
        for outcome in &outcomes {
            match outcome.state {
                state if state.is_success() => done += 1,
                ItemState::Failed => failed += 1,
                ItemState::Skipped => skipped += 1,
                other => tracing::warn!(
                    "[{}] Item {} ended in state {}",
                    entity.name,
                    outcome.url,
                    other
                ),
            }
        }

        let rows: Vec<Row> = outcomes.into_iter().flat_map(|o| o.rows).collect();
        tracing::info!(
            "[{}] Finished entity: {} rows ({} items done, {} failed, {} skipped)",
            entity.name,
            rows.len(),
            done,
            failed,
            skipped
        );
        rows
    }

    /// Processes every work item of `entity`, one outcome per item in item order
    pub async fn run_items(&self, entity: &EntitySpec, items: Vec<WorkItem>) -> Vec<ItemOutcome> {
        let total = items.len();
        tracing::info!("[{}] Processing {} work items", entity.name, total);

        let entity = Arc::new(entity.clone());
        let semaphore = Arc::new(Semaphore::new(self.runtime.concurrency as usize));
        let mut tasks = JoinSet::new();
        let mut outcomes = Vec::with_capacity(total);

        let mut pending = items.into_iter().enumerate();
        while let Some((index, item)) = pending.next() {
            let permit = match Arc::clone(&semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    outcomes.push(ItemOutcome::skipped(index, item));
                    continue;
                }
            };

            if self.context.budget_exhausted() {
                tracing::warn!(
                    "[{}] Error budget exhausted, skipping {} remaining work items",
                    entity.name,
                    total - index
                );
                self.context.item_skipped();
                outcomes.push(ItemOutcome::skipped(index, item));
                for (index, item) in pending.by_ref() {
                    self.context.item_skipped();
                    outcomes.push(ItemOutcome::skipped(index, item));
                }
                break;
            }

            self.context.item_admitted();
            let provider = Arc::clone(&self.provider);
            let context = Arc::clone(&self.context);
            let runtime = Arc::clone(&self.runtime);
            let base_url = Arc::clone(&self.base_url);
            let entity = Arc::clone(&entity);

            tasks.spawn(async move {
                let outcome =
                    process_item(&*provider, index, item, &entity, &runtime, &base_url, &context)
                        .await;
                drop(permit);
                outcome
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    tracing::error!("[{}] Work item task aborted: {}", entity.name, e);
                    self.context.item_failed();
                }
            }
        }

        outcomes.sort_by_key(|o| o.index);
        outcomes
    }
}

/// Runs one admitted work item from page acquisition to release
async fn process_item<P: PageProvider>(
    provider: &P,
    index: usize,
    item: WorkItem,
    entity: &EntitySpec,
    runtime: &RuntimeConfig,
    base_url: &Url,
    context: &RunContext,
) -> ItemOutcome {
    let mut tracker = ItemTracker::new();

    let mut page = match provider.new_page(context.session()).await {
        Ok(page) => page,
        Err(e) => {
            context.record_counted(ErrorRecord::navigation(
                &item.url,
                &entity.name,
                format!("failed to open page: {}", e),
            ));
            context.item_failed();
            tracker.advance(ItemState::Failed);
            return ItemOutcome {
                index,
                url: item.url,
                state: tracker.state(),
                pages: 0,
                rows: Vec::new(),
            };
        }
    };

    let scope = FetchScope {
        base_url,
        runtime,
        context,
    };
    let rows = drive_pages(&mut page, &item, entity, &scope, &mut tracker).await;

    if let Err(e) = page.close().await {
        tracing::warn!("[{}] Failed to close page for {}: {}", entity.name, item.url, e);
    }

    if tracker.state() == ItemState::Failed {
        context.item_failed();
    }
    if !tracker.state().is_terminal() {
        tracing::warn!(
            "[{}] Item {} stopped in state {}",
            entity.name,
            item.url,
            tracker.state()
        );
    }

    ItemOutcome {
        index,
        url: item.url,
        state: tracker.state(),
        pages: tracker.pages(),
        rows,
    }
}

/// Fetches the pages of one item until pagination ends
async fn drive_pages<H: PageHandle>(
    page: &mut H,
    item: &WorkItem,
    entity: &EntitySpec,
    scope: &FetchScope<'_>,
    tracker: &mut ItemTracker,
) -> Vec<Row> {
    let mode = entity.paginate.as_ref().map(|p| p.mode);
    let param = entity.paginate.as_ref().and_then(|p| p.param.as_deref());
    let mut index = entity.paginate.as_ref().map_or(1, |p| p.start_index);
    let mut rows = Vec::new();
    let mut visited = HashSet::new();

    let mut next = match mode {
        Some(PaginateMode::PageIndex) => index_url(item, entity, param, index, scope),
        _ => Some(item.url.clone()),
    };

    while let Some(url) = next.take() {
        if !visited.insert(url.clone()) {
            tracing::warn!(
                "[{}] Pagination of {} loops back to {}, stopping",
                entity.name,
                item.url,
                url
            );
            break;
        }

        if tracker.pages() > 0 {
            tracker.advance(ItemState::Paginating);
            let delay = scope.runtime.inter_page_delay();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        let fetched = fetch_page(page, &url, entity, &item.inherited, scope).await;
        if fetched.status == PageStatus::Failed {
            tracker.advance(ItemState::Failed);
            return rows;
        }
        tracker.advance(ItemState::FetchedPage);

        let found = fetched.rows.len();
        rows.extend(fetched.rows);
        if found == 0 {
            break;
        }

        if let Some(max_pages) = entity.max_pages() {
            if tracker.pages() >= max_pages {
                tracing::info!("[{}] Reached max-pages limit for {}", entity.name, item.url);
                break;
            }
        }

        next = match mode {
            Some(PaginateMode::NextButton) => fetched.next_url,
            Some(PaginateMode::PageIndex) => {
                index += 1;
                index_url(item, entity, param, index, scope)
            }
            None => None,
        };
    }

    match tracker.state() {
        ItemState::FetchedPage => {
            tracker.advance(ItemState::Done);
        }
        ItemState::Pending => {
            tracker.advance(ItemState::Failed);
        }
        _ => {}
    }
    rows
}

fn index_url(
    item: &WorkItem,
    entity: &EntitySpec,
    param: Option<&str>,
    index: u32,
    scope: &FetchScope<'_>,
) -> Option<String> {
    match page_url(&item.url, param, index) {
        Ok(url) => Some(url),
        Err(e) => {
            scope.context.record(ErrorRecord::navigation(
                &item.url,
                &entity.name,
                format!("cannot build page {} URL: {}", index, e),
            ));
            None
        }
    }
}
