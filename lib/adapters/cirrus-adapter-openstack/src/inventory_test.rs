use std::collections::HashMap;

use axum::extract::Query;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use cirrus_domain::{CollectionPhase, ExporterError, QuotaService, Session};
use cirrus_ports::InventoryPort;

use crate::inventory::OpenStackInventory;
use crate::test_server::{authorized, client, serve, session};

async fn images(headers: HeaderMap, Query(query): Query<HashMap<String, String>>) -> Response {
    if let Err(status) = authorized(&headers) {
        return status.into_response();
    }
    match query.get("marker").map(String::as_str) {
        None => Json(json!({
            "images": [{ "id": "img-1" }, { "id": "img-2" }],
            "next": "/v2/images?marker=img-2"
        }))
        .into_response(),
        Some("img-2") => Json(json!({ "images": [{ "id": "img-3" }] })).into_response(),
        Some(_) => StatusCode::BAD_REQUEST.into_response(),
    }
}

async fn quota_set(headers: HeaderMap) -> Response {
    if let Err(status) = authorized(&headers) {
        return status.into_response();
    }
    Json(json!({ "quota_set": { "id": "pid-alpha", "cores": 20, "ram": 51200 } }))
        .into_response()
}

/// Compute answers 500, volumes 204, networks are unrouted (404).
async fn openstack() -> (String, Session) {
    let router = Router::new()
        .route(
            "/compute/servers/detail",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "nova is down") }),
        )
        .route("/compute/os-quota-sets/{project_id}", get(quota_set))
        .route("/volume/volumes", get(|| async { StatusCode::NO_CONTENT }))
        .route("/image/v2/images", get(images));
    let base = serve(router).await;
    let session = session(
        &base,
        &[
            ("compute", "compute"),
            ("volumev3", "volume"),
            ("network", "network"),
            ("image", "image"),
        ],
    );
    (base, session)
}

#[tokio::test]
async fn server_error_is_a_resource_fetch_error() {
    let (_, session) = openstack().await;
    let inventory = OpenStackInventory::new(client());

    let err = inventory.list_servers(&session).await.unwrap_err();

    match err.downcast_ref::<ExporterError>() {
        Some(ExporterError::ResourceFetch { phase, reason }) => {
            assert_eq!(*phase, CollectionPhase::Compute);
            assert!(reason.contains("500"));
            assert!(reason.contains("nova is down"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn no_content_reads_as_empty_listing() {
    let (_, session) = openstack().await;
    let inventory = OpenStackInventory::new(client());

    assert_eq!(inventory.list_volumes(&session).await.unwrap(), Vec::<String>::new());
}

#[tokio::test]
async fn not_found_reads_as_empty_listing() {
    let (_, session) = openstack().await;
    let inventory = OpenStackInventory::new(client());

    assert_eq!(
        inventory.list_floating_ips(&session).await.unwrap(),
        Vec::<String>::new()
    );
}

#[tokio::test]
async fn image_listing_follows_next_links() {
    let (_, session) = openstack().await;
    let inventory = OpenStackInventory::new(client());

    assert_eq!(
        inventory.list_images(&session).await.unwrap(),
        vec!["img-1", "img-2", "img-3"]
    );
}

#[tokio::test]
async fn compute_quota_set_drops_id_echo() {
    let (_, session) = openstack().await;
    let inventory = OpenStackInventory::new(client());

    let quotas = inventory
        .get_quota_set(&session, "pid-alpha", QuotaService::Compute)
        .await
        .unwrap();

    assert_eq!(quotas.get("cores"), Some(&Some(20.0)));
    assert_eq!(quotas.get("ram"), Some(&Some(51200.0)));
    assert!(!quotas.contains_key("id"));
}

#[tokio::test]
async fn missing_catalog_entry_fails_without_request() {
    let (base, _) = openstack().await;
    let session = session(&base, &[("compute", "compute")]);
    let inventory = OpenStackInventory::new(client());

    let err = inventory.list_containers(&session).await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ExporterError>(),
        Some(ExporterError::ResourceFetch {
            phase: CollectionPhase::Storage,
            ..
        })
    ));
}
