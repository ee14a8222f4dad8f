//! Discovery pass
//!
//! Harvests links from a single start page to seed the first entity. Each
//! link is either resolved against the base URL as is, or rewritten through
//! `extract-regex` + `url-template` (`{id}` receives the first capture group).

use super::context::{ErrorRecord, RunContext};
use crate::config::{DiscoveryConfig, RuntimeConfig};
use crate::page::{PageHandle, PageProvider};
use crate::url::resolve_url;
use crate::{ExtractorError, Result};
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

const DISCOVERY: &str = "discovery";

/// Navigates to the start page and returns the discovered URLs
///
/// URLs are deduplicated, first occurrence wins. Returns an empty list when
/// none of the `wait-for-selectors` appears.
pub async fn discover<H: PageHandle>(
    page: &mut H,
    config: &DiscoveryConfig,
    base_url: &Url,
    runtime: &RuntimeConfig,
) -> Result<Vec<String>> {
    let start = resolve_url(base_url, &config.start_page).ok_or_else(|| {
        ExtractorError::Navigation {
            url: config.start_page.clone(),
            message: "start page cannot be resolved".to_string(),
        }
    })?;

    tracing::info!("Discovering links on {}", start);
    page.goto(&start, runtime.navigation_timeout()).await?;

    if !config.wait_for_selectors.is_empty() {
        let mut ready = false;
        for selector in &config.wait_for_selectors {
            match page
                .wait_for_selector(selector, runtime.selector_timeout())
                .await
            {
                Ok(()) => {
                    tracing::debug!("Discovery page ready on '{}'", selector);
                    ready = true;
                    break;
                }
                Err(e) => tracing::debug!("Discovery selector '{}' not found: {}", selector, e),
            }
        }
        if !ready {
            tracing::error!(
                "None of the discovery selectors {:?} appeared on {}",
                config.wait_for_selectors,
                start
            );
            return Ok(Vec::new());
        }
    }

    let html = page.content().await?;
    harvest_links(&html, config, base_url)
}

/// Extracts, rewrites and deduplicates the links of a discovery page
pub fn harvest_links(html: &str, config: &DiscoveryConfig, base_url: &Url) -> Result<Vec<String>> {
    let selector =
        Selector::parse(&config.link_selector).map_err(|e| ExtractorError::Selector {
            selector: config.link_selector.clone(),
            message: format!("{:?}", e),
        })?;

    let rewrite = match (&config.extract_regex, &config.url_template) {
        (Some(pattern), Some(template)) => {
            let regex = Regex::new(pattern).map_err(|e| ExtractorError::Selector {
                selector: pattern.clone(),
                message: e.to_string(),
            })?;
            Some((regex, template.as_str()))
        }
        _ => None,
    };

    let document = Html::parse_document(html);
    let attribute = config.attribute_name();
    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    for element in document.select(&selector) {
        let value = match element.value().attr(attribute) {
            Some(value) if !value.trim().is_empty() => value.trim(),
            _ => continue,
        };

        let candidate = match &rewrite {
            Some((regex, template)) => match regex.captures(value) {
                Some(captures) => {
                    let id = captures
                        .get(1)
                        .or_else(|| captures.get(0))
                        .map_or("", |m| m.as_str());
                    template.replace("{id}", id)
                }
                None => continue,
            },
            None => value.to_string(),
        };

        if let Some(url) = resolve_url(base_url, &candidate) {
            if seen.insert(url.clone()) {
                urls.push(url);
            }
        }
    }

    tracing::info!("Discovered {} unique links", urls.len());
    Ok(urls)
}

/// Runs discovery on its own page, recording failures in the run context
///
/// The page is always closed. Failures yield an empty list.
pub async fn run_discovery<P: PageProvider>(
    provider: &P,
    config: &DiscoveryConfig,
    base_url: &Url,
    runtime: &RuntimeConfig,
    context: &RunContext,
) -> Vec<String> {
    let mut page = match provider.new_page(context.session()).await {
        Ok(page) => page,
        Err(e) => {
            context.record_counted(ErrorRecord::navigation(
                &config.start_page,
                DISCOVERY,
                format!("failed to open page: {}", e),
            ));
            return Vec::new();
        }
    };

    let result = discover(&mut page, config, base_url, runtime).await;

    if let Err(e) = page.close().await {
        tracing::warn!("Failed to close discovery page: {}", e);
    }

    match result {
        Ok(urls) => urls,
        Err(e) => {
            context.record_counted(ErrorRecord::navigation(
                &config.start_page,
                DISCOVERY,
                e.to_string(),
            ));
            Vec::new()
        }
    }
}
