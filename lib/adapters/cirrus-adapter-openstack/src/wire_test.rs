use chrono::{TimeZone, Utc};
use serde_json::json;

use crate::wire::{
    ImagesEnvelope, LimitsEnvelope, MeasureRow, QuotaSetEnvelope, ServersEnvelope, TokenEnvelope,
};
use cirrus_domain::Server;

#[test]
fn token_body_becomes_session_with_catalog() {
    let body = json!({
        "token": {
            "expires_at": "2030-01-01T00:00:00.000000Z",
            "project": { "id": "p-42", "name": "alpha" },
            "catalog": [{
                "type": "compute",
                "name": "nova",
                "endpoints": [
                    { "interface": "public", "region_id": "dc3-a", "region": "dc3-a", "url": "https://nova.dc3/v2.1" },
                    { "interface": "admin", "region_id": "dc3-a", "url": "https://nova.admin" }
                ]
            }]
        }
    });
    let envelope: TokenEnvelope = serde_json::from_value(body).unwrap();
    let session = envelope.into_session("tok".to_string(), "dc3-a");

    assert_eq!(session.token(), "tok");
    assert_eq!(session.project_id(), Some("p-42"));
    assert_eq!(session.endpoint("compute"), Some("https://nova.dc3/v2.1"));
    assert_eq!(
        session.expires_at(),
        Some(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap())
    );
}

#[test]
fn token_without_catalog_still_decodes() {
    let envelope: TokenEnvelope = serde_json::from_value(json!({ "token": {} })).unwrap();
    let session = envelope.into_session("tok".to_string(), "dc4-a");
    assert!(session.catalog().is_empty());
    assert_eq!(session.project_id(), None);
}

#[test]
fn server_flavor_and_image_variants() {
    let body = json!({
        "servers": [
            { "id": "vm-1", "flavor": { "id": "f-small" }, "image": { "id": "img-1" } },
            { "id": "vm-2", "flavor": { "original_name": "a2-ram4" }, "image": "" },
            { "id": "vm-3" }
        ]
    });
    let envelope: ServersEnvelope = serde_json::from_value(body).unwrap();
    let servers: Vec<Server> = envelope.servers.into_iter().map(Server::from).collect();

    assert_eq!(servers[0].flavor_id.as_deref(), Some("f-small"));
    assert_eq!(servers[0].image_id.as_deref(), Some("img-1"));
    assert_eq!(servers[1].flavor_id.as_deref(), Some("a2-ram4"));
    assert_eq!(servers[1].image_id, None);
    assert_eq!(servers[2].flavor_id, None);
}

#[test]
fn image_page_carries_next_link() {
    let envelope: ImagesEnvelope = serde_json::from_value(json!({
        "images": [{ "id": "img-1" }, { "id": "img-2" }],
        "next": "/v2/images?marker=img-2"
    }))
    .unwrap();
    assert_eq!(envelope.images.len(), 2);
    assert_eq!(envelope.next.as_deref(), Some("/v2/images?marker=img-2"));
}

#[test]
fn compute_quota_set_skips_non_numeric_fields() {
    let envelope: QuotaSetEnvelope = serde_json::from_value(json!({
        "quota_set": { "id": "p-42", "cores": 20, "ram": 51200, "key_pairs": null }
    }))
    .unwrap();
    let quotas = envelope.into_quota_set();
    assert_eq!(quotas.get("cores"), Some(&Some(20.0)));
    assert_eq!(quotas.get("ram"), Some(&Some(51200.0)));
    assert_eq!(quotas.get("key_pairs"), Some(&None));
    assert!(!quotas.contains_key("id"));
}

#[test]
fn identity_limits_become_quota_set() {
    let envelope: LimitsEnvelope = serde_json::from_value(json!({
        "limits": [
            { "resource_name": "cores", "resource_limit": 8 },
            { "resource_name": "instances" }
        ]
    }))
    .unwrap();
    let quotas = envelope.into_quota_set();
    assert_eq!(quotas.get("cores"), Some(&Some(8.0)));
    assert_eq!(quotas.get("instances"), Some(&None));
}

#[test]
fn measure_rows_drop_null_values() {
    let rows: Vec<MeasureRow> = serde_json::from_value(json!([
        ["2024-03-15T14:00:00+00:00", 300.0, 5.0],
        ["2024-03-15T14:05:00+00:00", 300.0, null]
    ]))
    .unwrap();
    let measures: Vec<_> = rows.into_iter().filter_map(MeasureRow::into_measure).collect();
    assert_eq!(measures.len(), 1);
    assert_eq!(measures[0].value, 5.0);
    assert_eq!(measures[0].granularity, 300.0);
}
