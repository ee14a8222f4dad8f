//! Headless Chromium page provider
//!
//! One Chromium process is shared by all pages. Every page lives in its own
//! browser context, so cookies, storage and history never leak between work
//! items. Pages get an init script hiding the webdriver flag and the session
//! cookies before their first navigation.

use super::{PageHandle, PageProvider, SessionState};
use crate::{ExtractorError, Result};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::network::CookieParam;
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

const STEALTH_SCRIPT: &str = r#"
Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
Object.defineProperty(navigator, 'languages', { get: () => ['en-US', 'en'] });
Object.defineProperty(navigator, 'plugins', { get: () => [1, 2, 3, 4, 5] });
window.chrome = window.chrome || { runtime: {} };
"#;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Page provider driving a Chromium instance over the DevTools protocol
pub struct BrowserPageProvider {
    browser: Arc<Browser>,
    handler: JoinHandle<()>,
    user_agent: String,
}

impl BrowserPageProvider {
    /// Launches Chromium
    ///
    /// # Arguments
    ///
    /// * `user_agent` - User agent set on every page
    /// * `headless` - Run without a visible window
    pub async fn launch(user_agent: &str, headless: bool) -> Result<Self> {
        let mut builder = BrowserConfig::builder().no_sandbox().disable_default_args();

        if let Some(bin) = find_chrome_binary() {
            tracing::info!("Using Chrome binary: {}", bin.display());
            builder = builder.chrome_executable(bin);
        }

        if headless {
            builder = builder.arg("--headless=new");
        } else {
            builder = builder.with_head();
        }

        let config = builder
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--no-first-run")
            .arg(format!("--user-agent={}", user_agent))
            .build()
            .map_err(|e| ExtractorError::Page(format!("Browser config error: {}", e)))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ExtractorError::Page(format!("Failed to launch browser: {}", e)))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    tracing::warn!("Browser CDP handler error: {:?}", event);
                    break;
                }
            }
        });

        tracing::info!(
            "Launched Chromium ({})",
            if headless { "headless" } else { "headed" }
        );

        Ok(Self {
            browser: Arc::new(browser),
            handler,
            user_agent: user_agent.to_string(),
        })
    }

    /// Closes the browser process
    ///
    /// Every page must have been closed before calling this.
    pub async fn shutdown(self) -> Result<()> {
        match Arc::try_unwrap(self.browser) {
            Ok(mut browser) => {
                browser
                    .close()
                    .await
                    .map_err(|e| ExtractorError::Page(format!("Failed to close browser: {}", e)))?;
                let _ = browser.wait().await;
            }
            Err(_) => tracing::warn!("Browser still in use at shutdown, leaving it to drop"),
        }
        self.handler.abort();
        Ok(())
    }

    async fn open_in_context(
        &self,
        context: BrowserContextId,
        session: Option<&SessionState>,
    ) -> Result<Page> {
        let target = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context)
            .build()
            .map_err(ExtractorError::Page)?;

        let page = self
            .browser
            .new_page(target)
            .await
            .map_err(|e| ExtractorError::Page(format!("Failed to open page: {}", e)))?;

        page.execute(AddScriptToEvaluateOnNewDocumentParams::new(STEALTH_SCRIPT))
            .await
            .map_err(|e| ExtractorError::Page(format!("Failed to inject init script: {}", e)))?;

        page.set_user_agent(self.user_agent.as_str())
            .await
            .map_err(|e| ExtractorError::Page(format!("Failed to set user agent: {}", e)))?;

        if let Some(session) = session.filter(|s| s.is_authenticated()) {
            let cookies = session
                .cookies
                .iter()
                .map(|c| {
                    CookieParam::builder()
                        .name(c.name.clone())
                        .value(c.value.clone())
                        .domain(c.domain.clone())
                        .path(c.path.clone())
                        .build()
                        .map_err(|e| {
                            ExtractorError::Session(format!("Invalid cookie {}: {}", c.name, e))
                        })
                })
                .collect::<Result<Vec<_>>>()?;

            page.set_cookies(cookies)
                .await
                .map_err(|e| ExtractorError::Session(format!("Failed to set cookies: {}", e)))?;
        }

        Ok(page)
    }
}

/// Tries to locate a Chrome/Chromium binary, honouring `CHROME_BIN`
fn find_chrome_binary() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("CHROME_BIN") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    [
        "/snap/chromium/current/usr/lib/chromium-browser/chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/google-chrome",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
    ]
    .iter()
    .map(PathBuf::from)
    .find(|p| p.exists())
}

impl PageProvider for BrowserPageProvider {
    type Page = BrowserPage;

    async fn new_page(&self, session: Option<&SessionState>) -> Result<BrowserPage> {
        let context = self
            .browser
            .execute(CreateBrowserContextParams::default())
            .await
            .map_err(|e| ExtractorError::Page(format!("Failed to create browser context: {}", e)))?
            .result
            .browser_context_id;

        match self.open_in_context(context.clone(), session).await {
            Ok(page) => Ok(BrowserPage {
                browser: Arc::clone(&self.browser),
                context: Some(context),
                page: Some(page),
            }),
            Err(e) => {
                let _ = self
                    .browser
                    .execute(DisposeBrowserContextParams::new(context))
                    .await;
                Err(e)
            }
        }
    }
}

/// A Chromium tab inside its own browser context
pub struct BrowserPage {
    browser: Arc<Browser>,
    context: Option<BrowserContextId>,
    page: Option<Page>,
}

impl BrowserPage {
    fn page(&self) -> Result<&Page> {
        self.page
            .as_ref()
            .ok_or_else(|| ExtractorError::Page("page already closed".to_string()))
    }
}

impl PageHandle for BrowserPage {
    async fn goto(&mut self, url: &str, timeout: Duration) -> Result<()> {
        let page = self.page()?;
        match tokio::time::timeout(timeout, page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(ExtractorError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            }),
            Err(_) => Err(ExtractorError::Navigation {
                url: url.to_string(),
                message: format!("timed out after {}ms", timeout.as_millis()),
            }),
        }
    }

    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> Result<()> {
        let page = self.page()?;
        let deadline = Instant::now() + timeout;

        loop {
            if page.find_element(selector).await.is_ok() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                let url = page.url().await.ok().flatten().unwrap_or_default();
                return Err(ExtractorError::Timeout {
                    url,
                    selector: selector.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn content(&mut self) -> Result<String> {
        self.page()?
            .content()
            .await
            .map_err(|e| ExtractorError::Page(format!("Failed to read page content: {}", e)))
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                tracing::debug!("Failed to close page: {}", e);
            }
        }
        if let Some(context) = self.context.take() {
            self.browser
                .execute(DisposeBrowserContextParams::new(context))
                .await
                .map_err(|e| ExtractorError::Page(format!("Failed to dispose context: {}", e)))?;
        }
        Ok(())
    }
}
