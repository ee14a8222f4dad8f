use crate::common::*;
use tempfile::TempDir;
use web_extractor::config::OutputFormat;
use web_extractor::output::{
    export_final_table, report_dir, write_report, ERROR_REPORT, MARKDOWN_SUMMARY, RUNTIME_REPORT,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_export_writes_every_format() {
    let server = MockServer::start().await;
    mount_shop(&server).await;

    let dir = TempDir::new().unwrap();
    let mut job = create_test_job(&server.uri(), product_chain(), dir.path());
    job.output.formats = vec![OutputFormat::Csv, OutputFormat::Json, OutputFormat::Xlsx];
    let outcome = run_job(job.clone()).await;

    let paths = export_final_table(&job, &outcome, "abc1234").unwrap();
    assert_eq!(paths.len(), 3);
    for file in &paths {
        assert!(file.exists(), "{} should exist", file.display());
        let name = file.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("shop_catalog_ProductDetail_"), "{}", name);
        assert!(name.contains("_abc1234."), "{}", name);
    }

    // CSV: header is the sorted column union, one line per final row
    let mut reader = csv::Reader::from_path(&paths[0]).unwrap();
    let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(headers, vec!["detail_url", "price", "title"]);
    assert_eq!(reader.records().count(), 3);

    // JSON: array of row objects
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&paths[1]).unwrap()).unwrap();
    let rows = json.as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[1]["title"], "Gadget detail");
}

#[tokio::test]
async fn test_no_output_files_for_empty_final_table() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let job = create_test_job(&server.uri(), product_chain(), dir.path());
    let outcome = run_job(job.clone()).await;

    assert!(!outcome.has_output());
    let paths = export_final_table(&job, &outcome, "nogit").unwrap();
    assert!(paths.is_empty());

    // The report is still written, with the error file
    let report = write_report(&job, &outcome, "hash").unwrap();
    assert!(report.join(ERROR_REPORT).exists());
    let markdown = std::fs::read_to_string(report.join(MARKDOWN_SUMMARY)).unwrap();
    assert!(markdown.contains("No output produced"));
}

#[tokio::test]
async fn test_report_contents() {
    let server = MockServer::start().await;
    mount_shop(&server).await;

    let dir = TempDir::new().unwrap();
    let mut job = create_test_job(&server.uri(), product_chain(), dir.path());
    job.reporting.p95_target_seconds = Some(60.0);
    let outcome = run_job(job.clone()).await;

    let report = write_report(&job, &outcome, "deadbeef").unwrap();
    assert_eq!(report, report_dir(&job));
    assert!(report.ends_with("shop_catalog_reports"));
    assert!(!report.join(ERROR_REPORT).exists());

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(report.join(RUNTIME_REPORT)).unwrap())
            .unwrap();
    assert_eq!(json["config_hash"], "deadbeef");
    assert_eq!(json["final_entity"], "ProductDetail");
    assert_eq!(json["final_rows"], 3);
    assert_eq!(json["pages_fetched"], 4);
    assert_eq!(json["rows_per_entity"]["ProductList"], 3);
    assert_eq!(json["performance_metrics"]["samples"], 4);
    assert_eq!(json["performance_metrics"]["target_met"], true);

    let markdown = std::fs::read_to_string(report.join(MARKDOWN_SUMMARY)).unwrap();
    assert!(markdown.contains("# Run Summary: catalog"));
    assert!(markdown.contains("## Performance"));
}
