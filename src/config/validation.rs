use crate::config::types::{
    DiscoveryConfig, EntitySpec, JobSpec, OutputConfig, PaginateMode, RuntimeConfig, SiteConfig,
};
use crate::engine::SelectorExpr;
use crate::ConfigError;
use regex::Regex;
use scraper::Selector;
use std::collections::HashSet;
use url::Url;

/// Validates the entire job configuration
pub fn validate(job: &JobSpec) -> Result<(), ConfigError> {
    if job.name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "job name cannot be empty".to_string(),
        ));
    }

    validate_site_config(&job.site)?;
    validate_runtime_config(&job.runtime)?;
    if let Some(discovery) = &job.discovery {
        validate_discovery_config(discovery)?;
    }
    validate_entities(&job.entities, job.discovery.is_some())?;
    validate_output_config(&job.output)?;
    Ok(())
}

/// Splits a `follow_from` reference into `(entity, field)`
///
/// Returns `None` unless the reference contains exactly one `.` with text on
/// both sides.
///
/// ```
/// use web_extractor::config::split_follow_from;
///
/// assert_eq!(split_follow_from("List.url"), Some(("List", "url")));
/// assert_eq!(split_follow_from("List.url.extra"), None);
/// assert_eq!(split_follow_from("List"), None);
/// ```
pub fn split_follow_from(reference: &str) -> Option<(&str, &str)> {
    let (entity, field) = reference.split_once('.')?;
    if entity.is_empty() || field.is_empty() || field.contains('.') {
        return None;
    }
    Some((entity, field))
}

/// Validates site configuration
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    if config.name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "site name cannot be empty".to_string(),
        ));
    }

    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' must use http or https",
            config.base_url
        )));
    }

    Ok(())
}

/// Validates runtime configuration
fn validate_runtime_config(config: &RuntimeConfig) -> Result<(), ConfigError> {
    if config.concurrency < 1 || config.concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 100, got {}",
            config.concurrency
        )));
    }

    if config.error_budget < 1 {
        return Err(ConfigError::Validation(format!(
            "error-budget must be >= 1, got {}",
            config.error_budget
        )));
    }

    if config.navigation_timeout_ms == 0 || config.selector_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "navigation and selector timeouts must be greater than zero".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the discovery pass configuration
fn validate_discovery_config(config: &DiscoveryConfig) -> Result<(), ConfigError> {
    if config.start_page.trim().is_empty() {
        return Err(ConfigError::Validation(
            "discovery start-page cannot be empty".to_string(),
        ));
    }

    validate_css(&config.link_selector, "discovery link-selector")?;
    for selector in &config.wait_for_selectors {
        validate_css(selector, "discovery wait-for-selectors")?;
    }

    match (&config.extract_regex, &config.url_template) {
        (Some(pattern), Some(template)) => {
            Regex::new(pattern).map_err(|e| {
                ConfigError::Validation(format!("Invalid extract-regex '{}': {}", pattern, e))
            })?;
            if !template.contains("{id}") {
                return Err(ConfigError::Validation(format!(
                    "url-template '{}' must contain an {{id}} placeholder",
                    template
                )));
            }
        }
        (None, None) => {}
        _ => {
            return Err(ConfigError::Validation(
                "extract-regex and url-template must be configured together".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates entity declarations, including their ordering constraints
fn validate_entities(entities: &[EntitySpec], has_discovery: bool) -> Result<(), ConfigError> {
    if entities.is_empty() {
        return Err(ConfigError::Validation(
            "at least one entity must be defined".to_string(),
        ));
    }

    let mut seen: HashSet<&str> = HashSet::new();

    for (index, entity) in entities.iter().enumerate() {
        if entity.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "entity name cannot be empty".to_string(),
            ));
        }

        if seen.contains(entity.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate entity name '{}'",
                entity.name
            )));
        }

        let seeded_by_discovery = has_discovery && index == 0;
        validate_entity_source(entity, seeded_by_discovery, &seen)?;

        validate_css(
            &entity.row_selector,
            &format!("row-selector of '{}'", entity.name),
        )?;

        for (field, spec) in &entity.fields {
            let expr = SelectorExpr::parse(spec.selector());
            if !expr.css.is_empty() {
                validate_css(
                    &expr.css,
                    &format!("field '{}' of '{}'", field, entity.name),
                )?;
            }
        }

        if let Some(paginate) = &entity.paginate {
            if paginate.mode == PaginateMode::NextButton {
                match &paginate.next_selector {
                    Some(selector) => validate_css(
                        selector,
                        &format!("next-selector of '{}'", entity.name),
                    )?,
                    None => {
                        return Err(ConfigError::Validation(format!(
                            "entity '{}' uses next-button pagination without a next-selector",
                            entity.name
                        )));
                    }
                }
            }

            if paginate.max_pages == Some(0) {
                return Err(ConfigError::Validation(format!(
                    "max-pages of '{}' must be >= 1",
                    entity.name
                )));
            }
        }

        seen.insert(entity.name.as_str());
    }

    Ok(())
}

/// Checks the url / follow-from exclusivity and the follow-from reference
fn validate_entity_source(
    entity: &EntitySpec,
    seeded_by_discovery: bool,
    earlier: &HashSet<&str>,
) -> Result<(), ConfigError> {
    if seeded_by_discovery {
        if entity.url.is_some() || entity.follow_from.is_some() {
            return Err(ConfigError::Validation(format!(
                "entity '{}' is seeded by discovery and must not set url or follow-from",
                entity.name
            )));
        }
        return Ok(());
    }

    match (&entity.url, &entity.follow_from) {
        (Some(_), None) => Ok(()),
        (None, Some(reference)) => {
            let (source, _) = split_follow_from(reference).ok_or_else(|| {
                ConfigError::Validation(format!(
                    "follow-from '{}' of '{}' must have the form 'Entity.field'",
                    reference, entity.name
                ))
            })?;

            if !earlier.contains(source) {
                return Err(ConfigError::Validation(format!(
                    "entity '{}' follows '{}', which is not declared before it",
                    entity.name, source
                )));
            }
            Ok(())
        }
        (Some(_), Some(_)) => Err(ConfigError::Validation(format!(
            "entity '{}' sets both url and follow-from",
            entity.name
        ))),
        (None, None) => Err(ConfigError::Validation(format!(
            "entity '{}' must set either url or follow-from",
            entity.name
        ))),
    }
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output dir cannot be empty".to_string(),
        ));
    }

    if config.formats.is_empty() {
        return Err(ConfigError::Validation(
            "at least one output format must be configured".to_string(),
        ));
    }

    Ok(())
}

fn validate_css(selector: &str, context: &str) -> Result<(), ConfigError> {
    Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidSelector(format!("{} '{}': {:?}", context, selector, e)))
}
