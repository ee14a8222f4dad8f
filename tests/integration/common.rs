//! Shared helpers for the integration tests

use std::path::Path;
use std::sync::Arc;
use web_extractor::config::{
    AuthConfig, EntitySpec, JobSpec, OutputConfig, OutputFormat, ReportingConfig, RuntimeConfig,
    SiteConfig,
};
use web_extractor::engine::{Engine, RunOutcome};
use web_extractor::page::HttpPageProvider;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test job against `base_url` with fast runtime settings
pub fn create_test_job(base_url: &str, entities: Vec<EntitySpec>, output_dir: &Path) -> JobSpec {
    JobSpec {
        name: "catalog".to_string(),
        site: SiteConfig {
            name: "shop".to_string(),
            base_url: base_url.to_string(),
        },
        auth: AuthConfig::default(),
        runtime: RuntimeConfig {
            concurrency: 2,
            inter_page_delay_ms: 0,
            error_budget: 10,
            navigation_timeout_ms: 5_000,
            selector_timeout_ms: 1_000,
            ..RuntimeConfig::default()
        },
        discovery: None,
        entities,
        output: OutputConfig {
            dir: output_dir.to_path_buf(),
            formats: vec![OutputFormat::Csv, OutputFormat::Json],
            primary_key: Vec::new(),
        },
        reporting: ReportingConfig::default(),
    }
}

/// Runs a job through the HTTP provider
pub async fn run_job(job: JobSpec) -> RunOutcome {
    let provider = Arc::new(HttpPageProvider::from_runtime(&job.runtime));
    Engine::new(job, provider)
        .run()
        .await
        .expect("Run should complete")
}

/// Mounts an HTML page at `route`
pub async fn mount_page(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body.to_string())
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

/// Wraps body content in a minimal HTML document
pub fn html(body: &str) -> String {
    format!(
        "<html><head><title>Test</title></head><body>{}</body></html>",
        body
    )
}

/// A list page with one `.item` per `(title, href)`
pub fn list_page(items: &[(&str, &str)], next: Option<&str>) -> String {
    let mut body: String = items
        .iter()
        .map(|(title, href)| {
            format!(
                "<div class=\"item\"><h2>{}</h2><a href=\"{}\">more</a></div>",
                title, href
            )
        })
        .collect();
    if let Some(href) = next {
        body.push_str(&format!("<a class=\"next\" href=\"{}\">Next</a>", href));
    }
    html(&body)
}

/// A detail page with a `.detail` block holding a title and a price
pub fn detail_page(title: &str, price: &str) -> String {
    html(&format!(
        "<div class=\"detail\"><h1>{}</h1><span class=\"price\"> {} </span></div>",
        title, price
    ))
}

/// The list -> detail entity chain used by most tests
pub fn product_chain() -> Vec<EntitySpec> {
    vec![
        EntitySpec::with_url("ProductList", "/products", ".item")
            .field("title", "h2")
            .field("detail_url", "a@href"),
        EntitySpec::following("ProductDetail", "ProductList.detail_url", ".detail")
            .field("title", "h1")
            .field("price", ".price"),
    ]
}

/// Mounts the three-product shop used by [`product_chain`]
pub async fn mount_shop(server: &MockServer) {
    mount_page(
        server,
        "/products",
        &list_page(
            &[("Widget", "/p/1"), ("Gadget", "/p/2"), ("Gizmo", "/p/3")],
            None,
        ),
    )
    .await;
    mount_page(server, "/p/1", &detail_page("Widget detail", "$10.00")).await;
    mount_page(server, "/p/2", &detail_page("Gadget detail", "$20.00")).await;
    mount_page(server, "/p/3", &detail_page("Gizmo detail", "$30.00")).await;
}
