use crate::common::*;
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};
use web_extractor::config::{DiscoveryConfig, EntitySpec, FieldSpec, PaginateConfig};
use web_extractor::data::{FieldType, FieldValue};
use web_extractor::engine::ErrorStage;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_list_to_detail_chain() {
    let server = MockServer::start().await;
    mount_shop(&server).await;

    let dir = TempDir::new().unwrap();
    let job = create_test_job(&server.uri(), product_chain(), dir.path());
    let outcome = run_job(job).await;

    assert_eq!(outcome.store.get("ProductList").map_or(0, |rows| rows.len()), 3);
    assert_eq!(outcome.final_entity, "ProductDetail");
    assert_eq!(outcome.final_table.len(), 3);
    assert!(outcome.errors.is_empty());
    assert_eq!(outcome.statistics.pages_fetched, 4);

    // Detail rows keep the source row's columns; the detail page's own title wins
    let first = &outcome.final_table[0];
    assert_eq!(first.get("title"), Some(&FieldValue::text("Widget detail")));
    assert_eq!(first.get("price"), Some(&FieldValue::text("$10.00")));
    assert_eq!(first.get("detail_url"), Some(&FieldValue::text("/p/1")));
}

#[tokio::test]
async fn test_typed_fields_convert() {
    let server = MockServer::start().await;
    mount_shop(&server).await;

    let entities = vec![
        EntitySpec::with_url("ProductList", "/products", ".item").field("detail_url", "a@href"),
        EntitySpec::following("ProductDetail", "ProductList.detail_url", ".detail")
            .field("price", FieldSpec::typed(".price", FieldType::Float)),
    ];
    let dir = TempDir::new().unwrap();
    let outcome = run_job(create_test_job(&server.uri(), entities, dir.path())).await;

    let prices: Vec<_> = outcome
        .final_table
        .iter()
        .filter_map(|row| row.get("price").cloned())
        .collect();
    assert_eq!(
        prices,
        vec![
            FieldValue::Float(10.0),
            FieldValue::Float(20.0),
            FieldValue::Float(30.0)
        ]
    );
}

#[tokio::test]
async fn test_next_button_pagination_stops_without_next() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/list",
        &list_page(&[("A", "/a"), ("B", "/b")], Some("/list/2")),
    )
    .await;
    mount_page(
        &server,
        "/list/2",
        &list_page(&[("C", "/c"), ("D", "/d")], Some("/list/3")),
    )
    .await;
    mount_page(&server, "/list/3", &list_page(&[("E", "/e")], None)).await;

    Mock::given(method("GET"))
        .and(path("/list/4"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let entities = vec![EntitySpec::with_url("Listing", "/list", ".item")
        .field("title", "h2")
        .paginate(PaginateConfig::next_button("a.next"))];
    let dir = TempDir::new().unwrap();
    let outcome = run_job(create_test_job(&server.uri(), entities, dir.path())).await;

    let titles: Vec<String> = outcome
        .final_table
        .iter()
        .filter_map(|row| row.get("title").map(|v| v.to_string()))
        .collect();
    assert_eq!(titles, vec!["A", "B", "C", "D", "E"]);
    assert_eq!(outcome.statistics.pages_fetched, 3);
}

#[tokio::test]
async fn test_page_index_pagination_stops_on_empty_page() {
    let server = MockServer::start().await;
    for (page, items) in [
        ("1", vec![("A", "/a"), ("B", "/b")]),
        ("2", vec![("C", "/c"), ("D", "/d")]),
    ] {
        Mock::given(method("GET"))
            .and(path("/catalog"))
            .and(query_param("page", page))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(list_page(&items, None))
                    .insert_header("content-type", "text/html"),
            )
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/catalog"))
        .and(query_param("page", "3"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html("<p>No more results</p>"))
                .insert_header("content-type", "text/html"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let entities = vec![EntitySpec::with_url("Catalog", "/catalog?page={page}", ".item")
        .field("title", "h2")
        .paginate(PaginateConfig::page_index(1).with_max_pages(10))];
    let dir = TempDir::new().unwrap();
    let mut job = create_test_job(&server.uri(), entities, dir.path());
    job.runtime.selector_timeout_ms = 200;
    let outcome = run_job(job).await;

    assert_eq!(outcome.final_table.len(), 4);
    assert_eq!(outcome.statistics.pages_fetched, 3);

    // The empty page ends pagination without eating into the error budget
    assert_eq!(outcome.statistics.budget_errors, 0);
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].stage, ErrorStage::Navigation);
}

#[tokio::test]
async fn test_page_index_with_query_param() {
    let server = MockServer::start().await;
    for page in ["0", "1"] {
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("p", page))
            .and(query_param("q", "lamps"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(list_page(&[("Lamp", "/lamp")], None))
                    .insert_header("content-type", "text/html"),
            )
            .mount(&server)
            .await;
    }

    let mut paginate = PaginateConfig::page_index(0).with_max_pages(2);
    paginate.param = Some("p".to_string());
    let entities = vec![EntitySpec::with_url("Search", "/search?q=lamps", ".item")
        .field("title", "h2")
        .paginate(paginate)];
    let dir = TempDir::new().unwrap();
    let outcome = run_job(create_test_job(&server.uri(), entities, dir.path())).await;

    assert_eq!(outcome.final_table.len(), 2);
    assert_eq!(outcome.statistics.pages_fetched, 2);
}

#[tokio::test]
async fn test_error_budget_stops_admission() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/products",
        &list_page(
            &[
                ("One", "/p/1"),
                ("Two", "/p/2"),
                ("Three", "/p/3"),
                ("Four", "/p/4"),
                ("Five", "/p/5"),
            ],
            None,
        ),
    )
    .await;
    for route in ["/p/1", "/p/2"] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;
    }
    for route in ["/p/3", "/p/4", "/p/5"] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_string(detail_page("x", "1")))
            .expect(0)
            .mount(&server)
            .await;
    }

    let dir = TempDir::new().unwrap();
    let mut job = create_test_job(&server.uri(), product_chain(), dir.path());
    job.runtime.concurrency = 1;
    job.runtime.error_budget = 2;
    let outcome = run_job(job).await;

    assert!(outcome.final_table.is_empty());
    assert!(!outcome.has_output());
    assert_eq!(outcome.statistics.budget_errors, 2);
    assert_eq!(outcome.statistics.items_failed, 2);
    assert_eq!(outcome.statistics.items_skipped, 3);
    assert!(outcome
        .errors
        .iter()
        .all(|e| e.entity == "ProductDetail" && e.message.contains("500")));
}

#[tokio::test]
async fn test_failed_item_does_not_affect_siblings() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/products",
        &list_page(&[("Good", "/p/1"), ("Bad", "/p/2"), ("Also good", "/p/3")], None),
    )
    .await;
    mount_page(&server, "/p/1", &detail_page("Good detail", "1")).await;
    Mock::given(method("GET"))
        .and(path("/p/2"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    mount_page(&server, "/p/3", &detail_page("Also good detail", "3")).await;

    let dir = TempDir::new().unwrap();
    let outcome = run_job(create_test_job(&server.uri(), product_chain(), dir.path())).await;

    assert_eq!(outcome.final_table.len(), 2);
    assert_eq!(outcome.statistics.items_failed, 1);
    assert_eq!(outcome.errors.len(), 1);
    assert!(outcome.errors[0].url.ends_with("/p/2"));
}

#[tokio::test]
async fn test_discovery_seeds_first_entity() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/browse",
        &html(concat!(
            "<div id=\"grid\">",
            "<a class=\"card\" href=\"/item/101-lamp\">Lamp</a>",
            "<a class=\"card\" href=\"/item/202-desk\">Desk</a>",
            "<a class=\"card\" href=\"/item/101-lamp?ref=promo\">Lamp again</a>",
            "</div>"
        )),
    )
    .await;
    mount_page(&server, "/api/items/101", &detail_page("Lamp", "$15")).await;
    mount_page(&server, "/api/items/202", &detail_page("Desk", "$90")).await;

    let mut seeded = EntitySpec::with_url("Item", "/unused", ".detail")
        .field("name", "h1")
        .field("price", ".price");
    seeded.url = None;

    let dir = TempDir::new().unwrap();
    let mut job = create_test_job(&server.uri(), vec![seeded], dir.path());
    job.discovery = Some(DiscoveryConfig {
        start_page: "/browse".to_string(),
        link_selector: "a.card".to_string(),
        wait_for_selectors: vec!["#missing".to_string(), "#grid".to_string()],
        attribute: None,
        extract_regex: Some(r"/item/(\d+)-".to_string()),
        url_template: Some(format!("{}/api/items/{{id}}", server.uri())),
    });
    job.runtime.selector_timeout_ms = 200;
    let outcome = run_job(job).await;

    let names: Vec<String> = outcome
        .final_table
        .iter()
        .filter_map(|row| row.get("name").map(|v| v.to_string()))
        .collect();
    assert_eq!(names, vec!["Lamp", "Desk"]);
}

#[tokio::test]
async fn test_primary_key_deduplicates_final_table() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/products",
        &list_page(&[("A", "/p/1"), ("B", "/p/1"), ("C", "/p/2")], None),
    )
    .await;
    mount_page(&server, "/p/1", &detail_page("First", "1")).await;
    mount_page(&server, "/p/2", &detail_page("Second", "2")).await;

    let dir = TempDir::new().unwrap();
    let mut job = create_test_job(&server.uri(), product_chain(), dir.path());
    job.output.primary_key = vec!["detail_url".to_string()];
    let outcome = run_job(job).await;

    assert_eq!(outcome.store.get("ProductDetail").map_or(0, |rows| rows.len()), 3);
    assert_eq!(outcome.final_table.len(), 2);
    assert_eq!(outcome.duplicates_removed, 1);
}

#[tokio::test]
async fn test_session_cookies_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/account/orders"))
        .and(header("cookie", "sid=abc123"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(list_page(&[("Order 1", "/o/1")], None))
                .insert_header("content-type", "text/html"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut session = NamedTempFile::new().unwrap();
    write!(
        session,
        r#"{{"cookies": [{{"name": "sid", "value": "abc123", "path": "/account"}}], "origins": []}}"#
    )
    .unwrap();
    session.flush().unwrap();

    let entities =
        vec![EntitySpec::with_url("Orders", "/account/orders", ".item").field("title", "h2")];
    let dir = TempDir::new().unwrap();
    let mut job = create_test_job(&server.uri(), entities, dir.path());
    job.auth.session_file = Some(session.path().to_path_buf());
    let outcome = run_job(job).await;

    assert_eq!(outcome.final_table.len(), 1);
}

#[tokio::test]
async fn test_missing_session_file_runs_unauthenticated() {
    let server = MockServer::start().await;
    mount_shop(&server).await;

    let dir = TempDir::new().unwrap();
    let mut job = create_test_job(&server.uri(), product_chain(), dir.path());
    job.auth.session_file = Some(dir.path().join("missing-session.json"));
    let outcome = run_job(job).await;

    assert_eq!(outcome.final_table.len(), 3);
}
