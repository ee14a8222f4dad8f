//! In-memory page provider
//!
//! Serves pre-recorded HTML by URL. Navigation failures, context creation
//! failures and latency can be simulated, and page lifecycle counters let
//! callers verify that every opened page was closed and that concurrency
//! stayed within bounds.

use super::{require_match, PageHandle, PageProvider, SessionState};
use crate::{ExtractorError, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

#[derive(Debug, Clone)]
enum Recorded {
    Html(String),
    Failure(String),
}

#[derive(Debug, Default)]
struct Shared {
    opened: AtomicUsize,
    closed: AtomicUsize,
    open: AtomicUsize,
    peak_open: AtomicUsize,
    failing_opens: AtomicUsize,
    visits: Mutex<Vec<String>>,
}

/// Page provider serving recorded documents
#[derive(Debug, Clone, Default)]
pub struct MemoryPageProvider {
    pages: HashMap<String, Recorded>,
    latency: Duration,
    shared: Arc<Shared>,
}

impl MemoryPageProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the HTML served for `url`
    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages
            .insert(url.to_string(), Recorded::Html(html.to_string()));
        self
    }

    /// Makes navigation to `url` fail with `message`
    pub fn with_failure(mut self, url: &str, message: &str) -> Self {
        self.pages
            .insert(url.to_string(), Recorded::Failure(message.to_string()));
        self
    }

    /// Delays every navigation by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Makes the next `count` calls to `new_page` fail
    pub fn with_failing_opens(self, count: usize) -> Self {
        self.shared.failing_opens.store(count, Ordering::SeqCst);
        self
    }

    /// Number of pages opened so far
    pub fn opened(&self) -> usize {
        self.shared.opened.load(Ordering::SeqCst)
    }

    /// Number of pages closed so far
    pub fn closed(&self) -> usize {
        self.shared.closed.load(Ordering::SeqCst)
    }

    /// Highest number of pages that were open at the same time
    pub fn peak_open(&self) -> usize {
        self.shared.peak_open.load(Ordering::SeqCst)
    }

    /// Every URL navigated to, in navigation order
    pub fn visits(&self) -> Vec<String> {
        self.shared
            .visits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl PageProvider for MemoryPageProvider {
    type Page = MemoryPage;

    async fn new_page(&self, _session: Option<&SessionState>) -> Result<MemoryPage> {
        let failing = self
            .shared
            .failing_opens
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(ExtractorError::Page(
                "failed to create browsing context".to_string(),
            ));
        }

        self.shared.opened.fetch_add(1, Ordering::SeqCst);
        let now_open = self.shared.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.peak_open.fetch_max(now_open, Ordering::SeqCst);

        Ok(MemoryPage {
            pages: self.pages.clone(),
            latency: self.latency,
            shared: Arc::clone(&self.shared),
            url: None,
            html: None,
            closed: false,
        })
    }
}

/// A page served from recorded documents
#[derive(Debug)]
pub struct MemoryPage {
    pages: HashMap<String, Recorded>,
    latency: Duration,
    shared: Arc<Shared>,
    url: Option<String>,
    html: Option<String>,
    closed: bool,
}

impl PageHandle for MemoryPage {
    async fn goto(&mut self, url: &str, _timeout: Duration) -> Result<()> {
        if self.closed {
            return Err(ExtractorError::Page("page already closed".to_string()));
        }

        self.shared
            .visits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_string());

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        self.url = Some(url.to_string());
        match self.pages.get(url) {
            Some(Recorded::Html(html)) => {
                self.html = Some(html.clone());
                Ok(())
            }
            Some(Recorded::Failure(message)) => {
                self.html = None;
                Err(ExtractorError::Navigation {
                    url: url.to_string(),
                    message: message.clone(),
                })
            }
            None => {
                self.html = None;
                Err(ExtractorError::Navigation {
                    url: url.to_string(),
                    message: "HTTP 404".to_string(),
                })
            }
        }
    }

    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> Result<()> {
        require_match(self.url.as_deref(), self.html.as_deref(), selector, timeout)
    }

    async fn content(&mut self) -> Result<String> {
        self.html
            .clone()
            .ok_or_else(|| ExtractorError::Page("no document loaded".to_string()))
    }

    async fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.shared.closed.fetch_add(1, Ordering::SeqCst);
            self.shared.open.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }
}
