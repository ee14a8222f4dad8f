//! Page providers for Web-Extractor
//!
//! The engine never talks to the network directly. It asks a [`PageProvider`]
//! for an isolated [`PageHandle`] per work item and drives it through
//! navigation, readiness waits and content retrieval.
//!
//! Providers:
//! - [`HttpPageProvider`]: plain HTTP with `reqwest`, static documents
//! - [`MemoryPageProvider`]: pre-recorded HTML, used for tests and replays
//! - `BrowserPageProvider`: headless Chromium (requires the `browser` feature)

#[cfg(feature = "browser")]
mod browser;
mod http;
mod memory;
mod session;

#[cfg(feature = "browser")]
pub use browser::BrowserPageProvider;
pub use http::{HttpPage, HttpPageProvider};
pub use memory::{MemoryPage, MemoryPageProvider};
pub use session::{SessionCookie, SessionState};

use crate::{ExtractorError, Result};
use scraper::{Html, Selector};
use std::future::Future;
use std::time::Duration;

/// One isolated browsing context, exclusively owned by the task that opened it
pub trait PageHandle: Send {
    /// Navigates to `url`, failing if the page cannot be reached within `timeout`
    fn goto(&mut self, url: &str, timeout: Duration) -> impl Future<Output = Result<()>> + Send;

    /// Waits until `selector` matches in the current document
    ///
    /// Returns [`ExtractorError::Timeout`] when nothing matched within `timeout`.
    fn wait_for_selector(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<()>> + Send;

    /// HTML of the current document
    fn content(&mut self) -> impl Future<Output = Result<String>> + Send;

    /// Releases the context; the handle must not be used afterwards
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;
}

/// Source of isolated page handles
pub trait PageProvider: Send + Sync + 'static {
    type Page: PageHandle + 'static;

    /// Opens a fresh context, applying the session's cookies if one is given
    fn new_page(
        &self,
        session: Option<&SessionState>,
    ) -> impl Future<Output = Result<Self::Page>> + Send;
}

/// Checks whether `selector` matches anything in a static HTML document
pub(crate) fn document_has_match(html: &str, selector: &str) -> Result<bool> {
    let parsed = Selector::parse(selector).map_err(|e| ExtractorError::Selector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })?;
    let document = Html::parse_document(html);
    let found = document.select(&parsed).next().is_some();
    Ok(found)
}

/// Readiness check shared by the static-document providers
pub(crate) fn require_match(
    url: Option<&str>,
    html: Option<&str>,
    selector: &str,
    timeout: Duration,
) -> Result<()> {
    let html = html.ok_or_else(|| ExtractorError::Page("no document loaded".to_string()))?;
    if document_has_match(html, selector)? {
        Ok(())
    } else {
        Err(ExtractorError::Timeout {
            url: url.unwrap_or_default().to_string(),
            selector: selector.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        })
    }
}
