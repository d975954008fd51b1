use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use tower::ServiceExt;

use cirrus::http::router;
use cirrus::{Exporter, ExporterConfig, MessageCatalog};
use cirrus_application::testing::{FakeInventory, FakeSessions, FakeTimeSeries, ports, tenants};
use cirrus_domain::Language;

fn exporter(config: ExporterConfig, sessions: FakeSessions) -> Arc<Exporter> {
    let messages = Arc::new(MessageCatalog::load(Language::En).unwrap());
    let ports = ports(
        sessions,
        FakeInventory::fixture(),
        Arc::new(FakeTimeSeries::new()),
    );
    Arc::new(Exporter::new(&config, tenants(&["alpha"]), ports, messages).unwrap())
}

async fn get(exporter: Arc<Exporter>, uri: &str) -> (StatusCode, Option<String>, String) {
    let response = router(exporter)
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|value| value.to_str().unwrap().to_string());
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, content_type, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn metrics_endpoint_serves_text_exposition() {
    let exporter = exporter(ExporterConfig::default(), FakeSessions::new());

    let (status, content_type, body) = get(exporter, "/metrics").await;

    assert_eq!(status, StatusCode::OK);
    assert!(content_type.unwrap().starts_with("text/plain"));
    assert!(body.contains(
        r#"openstack_compute_metrics{flavor_id="a1-ram2",instance_id="vm-1",project_name="alpha"} 1"#
    ));
    assert!(body.contains("exporter_errors_total 0"));
}

#[tokio::test]
async fn every_request_runs_a_fresh_collection() {
    let exporter = exporter(ExporterConfig::default(), FakeSessions::new().failing("alpha"));

    get(Arc::clone(&exporter), "/metrics").await;
    let (_, _, body) = get(exporter, "/metrics").await;

    assert!(body.contains("exporter_errors_total 2"));
    assert!(body.contains("exporter_scrape_duration_seconds_count 2"));
}

#[tokio::test]
async fn healthz_does_not_scrape() {
    let exporter = exporter(ExporterConfig::default(), FakeSessions::new());

    let (status, _, body) = get(Arc::clone(&exporter), "/healthz").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
    assert_eq!(exporter.metrics().error_count(), 0);
    assert_eq!(exporter.orchestrator().cached_sessions(), 0);
}

#[tokio::test(start_paused = true)]
async fn timed_out_scrape_answers_503() {
    let config = ExporterConfig {
        scrape_timeout_secs: 1,
        ..ExporterConfig::default()
    };
    let exporter = exporter(config, FakeSessions::new().with_delay(Duration::from_secs(120)));

    let (status, _, body) = get(exporter, "/metrics").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body.contains("timed out after 1s"));
}

#[tokio::test]
async fn unknown_path_is_not_found() {
    let exporter = exporter(ExporterConfig::default(), FakeSessions::new());

    let (status, _, _) = get(exporter, "/nope").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
