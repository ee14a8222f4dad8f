use crate::data::FieldType;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Default desktop user agent presented by page providers
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/108.0.0.0 Safari/537.36";

/// Root job configuration, read-only for the lifetime of a run
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct JobSpec {
    /// Job name, used when naming output and report files
    pub name: String,
    pub site: SiteConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub discovery: Option<DiscoveryConfig>,
    pub entities: Vec<EntitySpec>,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub reporting: ReportingConfig,
}

impl JobSpec {
    /// The last declared entity, whose rows form the final dataset
    pub fn final_entity(&self) -> Option<&EntitySpec> {
        self.entities.last()
    }
}

/// Target site identification
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SiteConfig {
    /// Short site name used in output naming
    pub name: String,

    /// Base URL every relative entity/pagination URL is resolved against
    pub base_url: String,
}

/// Session-based authentication, absent for public sites
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AuthConfig {
    /// Path to a storage-state JSON file holding session cookies
    #[serde(default)]
    pub session_file: Option<PathBuf>,
}

/// Runtime behavior: concurrency, pacing, error budget and timeouts
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RuntimeConfig {
    /// Maximum number of work items fetching pages at the same time
    pub concurrency: u32,

    /// Pause between consecutive pages of one paginated work item (milliseconds)
    pub inter_page_delay_ms: u64,

    /// User agent presented to the site
    pub user_agent: String,

    /// Number of counted errors after which no new work item is admitted
    pub error_budget: u32,

    /// Navigation timeout (milliseconds)
    pub navigation_timeout_ms: u64,

    /// Timeout waiting for a row selector to appear (milliseconds)
    pub selector_timeout_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            concurrency: 2,
            inter_page_delay_ms: 500,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            error_budget: 50,
            navigation_timeout_ms: 30_000,
            selector_timeout_ms: 15_000,
        }
    }
}

impl RuntimeConfig {
    pub fn inter_page_delay(&self) -> Duration {
        Duration::from_millis(self.inter_page_delay_ms)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn selector_timeout(&self) -> Duration {
        Duration::from_millis(self.selector_timeout_ms)
    }
}

/// One-time link harvesting that seeds the first entity
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DiscoveryConfig {
    /// Page to harvest links from (relative to the base URL or absolute)
    pub start_page: String,

    /// Selector matching the link elements
    pub link_selector: String,

    /// Selectors tried in order; discovery proceeds once one of them appears
    #[serde(default)]
    pub wait_for_selectors: Vec<String>,

    /// Attribute holding the link (defaults to `href`)
    #[serde(default)]
    pub attribute: Option<String>,

    /// Regex whose first capture group is substituted into `url_template`
    #[serde(default)]
    pub extract_regex: Option<String>,

    /// Template for the final URL, `{id}` is replaced by the captured value
    #[serde(default)]
    pub url_template: Option<String>,
}

impl DiscoveryConfig {
    pub fn attribute_name(&self) -> &str {
        self.attribute.as_deref().unwrap_or("href")
    }
}

/// A named category of record to scrape
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EntitySpec {
    /// Unique entity name
    pub name: String,

    /// Static seed URL (mutually exclusive with `follow_from`)
    #[serde(default)]
    pub url: Option<String>,

    /// `"<Entity>.<field>"` reference to an earlier entity's output field
    #[serde(default)]
    pub follow_from: Option<String>,

    /// Selector identifying one record container per page
    pub row_selector: String,

    /// Field name to selector expression
    #[serde(default)]
    pub fields: BTreeMap<String, FieldSpec>,

    /// Pagination rules
    #[serde(default)]
    pub paginate: Option<PaginateConfig>,
}

impl EntitySpec {
    /// Creates an entity seeded from a static URL
    pub fn with_url(name: &str, url: &str, row_selector: &str) -> Self {
        Self {
            name: name.to_string(),
            url: Some(url.to_string()),
            follow_from: None,
            row_selector: row_selector.to_string(),
            fields: BTreeMap::new(),
            paginate: None,
        }
    }

    /// Creates an entity that follows a field of an earlier entity
    pub fn following(name: &str, follow_from: &str, row_selector: &str) -> Self {
        Self {
            name: name.to_string(),
            url: None,
            follow_from: Some(follow_from.to_string()),
            row_selector: row_selector.to_string(),
            fields: BTreeMap::new(),
            paginate: None,
        }
    }

    /// Adds a field extracted with the given selector expression
    pub fn field(mut self, name: &str, spec: impl Into<FieldSpec>) -> Self {
        self.fields.insert(name.to_string(), spec.into());
        self
    }

    /// Sets the pagination rules
    pub fn paginate(mut self, paginate: PaginateConfig) -> Self {
        self.paginate = Some(paginate);
        self
    }

    pub fn max_pages(&self) -> Option<u32> {
        self.paginate.as_ref().and_then(|p| p.max_pages)
    }
}

/// A field definition: a bare selector expression or a typed one
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FieldSpec {
    Selector(String),
    Typed {
        selector: String,
        #[serde(rename = "type", default)]
        kind: FieldType,
    },
}

impl FieldSpec {
    /// Creates a typed field spec
    pub fn typed(selector: &str, kind: FieldType) -> Self {
        Self::Typed {
            selector: selector.to_string(),
            kind,
        }
    }

    /// The selector expression (`css` or `css@attribute`)
    pub fn selector(&self) -> &str {
        match self {
            Self::Selector(selector) => selector,
            Self::Typed { selector, .. } => selector,
        }
    }

    /// The declared value type (`string` when untyped)
    pub fn kind(&self) -> FieldType {
        match self {
            Self::Selector(_) => FieldType::String,
            Self::Typed { kind, .. } => *kind,
        }
    }
}

impl From<&str> for FieldSpec {
    fn from(selector: &str) -> Self {
        Self::Selector(selector.to_string())
    }
}

/// Pagination strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaginateMode {
    /// Follow the href of a "next" element until it disappears
    NextButton,
    /// Substitute an incrementing page number into the URL
    PageIndex,
}

/// Pagination rules for an entity
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PaginateConfig {
    pub mode: PaginateMode,

    /// Selector of the "next page" link (next-button mode)
    #[serde(default)]
    pub next_selector: Option<String>,

    /// First page number (page-index mode)
    #[serde(default = "default_start_index")]
    pub start_index: u32,

    /// Query parameter carrying the page number when the URL has no `{page}` placeholder
    #[serde(default)]
    pub param: Option<String>,

    /// Upper bound on pages fetched per work item
    #[serde(default)]
    pub max_pages: Option<u32>,
}

fn default_start_index() -> u32 {
    1
}

impl PaginateConfig {
    pub fn next_button(next_selector: &str) -> Self {
        Self {
            mode: PaginateMode::NextButton,
            next_selector: Some(next_selector.to_string()),
            start_index: default_start_index(),
            param: None,
            max_pages: None,
        }
    }

    pub fn page_index(start_index: u32) -> Self {
        Self {
            mode: PaginateMode::PageIndex,
            next_selector: None,
            start_index,
            param: None,
            max_pages: None,
        }
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = Some(max_pages);
        self
    }
}

/// Supported export formats for the final table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    Json,
    Xlsx,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Xlsx => "xlsx",
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct OutputConfig {
    /// Directory receiving data files and the report directory
    pub dir: PathBuf,

    /// Formats the final table is written in
    pub formats: Vec<OutputFormat>,

    /// Columns forming the deduplication key of the final table
    pub primary_key: Vec<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./output"),
            formats: vec![OutputFormat::Csv, OutputFormat::Json],
            primary_key: Vec::new(),
        }
    }
}

/// Reliability targets checked in the run report
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ReportingConfig {
    /// Target for the 95th percentile page extraction time
    #[serde(default)]
    pub p95_target_seconds: Option<f64>,
}
