//! HTTP page provider
//!
//! Fetches documents with `reqwest` and serves them as static pages:
//! - One client per page, so cookies and connection state never leak between work items
//! - Session cookies are sent as a `Cookie` header on every request
//! - Non-2xx responses are navigation failures
//! - Readiness checks run against the fetched document, without polling

use super::{require_match, PageHandle, PageProvider, SessionState};
use crate::config::RuntimeConfig;
use crate::{ExtractorError, Result};
use reqwest::{header::COOKIE, redirect::Policy, Client};
use std::time::Duration;
use url::Url;

/// Builds an HTTP client for one page
///
/// # Arguments
///
/// * `user_agent` - The user agent presented to the site
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(user_agent: &str) -> std::result::Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Page provider backed by plain HTTP requests
#[derive(Debug, Clone)]
pub struct HttpPageProvider {
    user_agent: String,
}

impl HttpPageProvider {
    pub fn new(user_agent: &str) -> Self {
        Self {
            user_agent: user_agent.to_string(),
        }
    }

    pub fn from_runtime(runtime: &RuntimeConfig) -> Self {
        Self::new(&runtime.user_agent)
    }
}

impl PageProvider for HttpPageProvider {
    type Page = HttpPage;

    async fn new_page(&self, session: Option<&SessionState>) -> Result<HttpPage> {
        let client = build_http_client(&self.user_agent)?;
        Ok(HttpPage {
            client,
            session: session.cloned(),
            url: None,
            body: None,
        })
    }
}

/// A static document fetched over HTTP
#[derive(Debug)]
pub struct HttpPage {
    client: Client,
    session: Option<SessionState>,
    url: Option<String>,
    body: Option<String>,
}

impl HttpPage {
    /// URL of the current document after redirects
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }
}

impl PageHandle for HttpPage {
    async fn goto(&mut self, url: &str, timeout: Duration) -> Result<()> {
        let target = Url::parse(url)?;
        self.url = None;
        self.body = None;

        let mut request = self.client.get(target.clone()).timeout(timeout);
        if let Some(cookies) = self
            .session
            .as_ref()
            .and_then(|session| session.cookie_header(&target))
        {
            request = request.header(COOKIE, cookies);
        }

        let response = request.send().await.map_err(|e| ExtractorError::Navigation {
            url: url.to_string(),
            message: if e.is_timeout() {
                format!("timed out after {}ms", timeout.as_millis())
            } else {
                e.to_string()
            },
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractorError::Navigation {
                url: url.to_string(),
                message: format!("HTTP {}", status.as_u16()),
            });
        }

        let final_url = response.url().to_string();
        let body = response.text().await.map_err(|e| ExtractorError::Navigation {
            url: url.to_string(),
            message: format!("failed to read body: {}", e),
        })?;

        tracing::debug!("Fetched {} ({} bytes)", final_url, body.len());
        self.url = Some(final_url);
        self.body = Some(body);
        Ok(())
    }

    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> Result<()> {
        require_match(self.url.as_deref(), self.body.as_deref(), selector, timeout)
    }

    async fn content(&mut self) -> Result<String> {
        self.body
            .clone()
            .ok_or_else(|| ExtractorError::Page("no document loaded".to_string()))
    }

    async fn close(&mut self) -> Result<()> {
        self.url = None;
        self.body = None;
        Ok(())
    }
}
