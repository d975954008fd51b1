use std::sync::Arc;

use cirrus_domain::{
    CollectionPhase, Language, MessageCatalog, QuotaService, QuotaSet, ResourceKind, Session,
    TenantConfig,
};

use crate::resource_collector::{FLAVOR_ATTRIBUTE, ResourceCollector, TenantInventory};
use crate::testing::{FakeInventory, InventoryOp, tenant};

async fn collect(inventory: FakeInventory, tenant: &TenantConfig) -> TenantInventory {
    let messages = Arc::new(MessageCatalog::load(Language::En).unwrap());
    let collector = ResourceCollector::new(Arc::new(inventory), messages);
    let session = Session::new(format!("token-{}", tenant.project_name), &tenant.region);
    collector.collect(tenant, &session).await
}

fn ids(inventory: &TenantInventory, kind: ResourceKind) -> Vec<&str> {
    let mut ids: Vec<&str> = inventory
        .facts
        .iter()
        .filter(|fact| fact.kind == kind)
        .map(|fact| fact.id.as_str())
        .collect();
    ids.sort_unstable();
    ids
}

#[tokio::test]
async fn full_fixture_produces_every_kind() {
    let out = collect(FakeInventory::fixture(), &tenant(1, "alpha")).await;

    assert!(out.errors.is_empty(), "{:?}", out.errors);
    assert_eq!(ids(&out, ResourceKind::Identity), vec!["pid-alpha"]);
    assert_eq!(ids(&out, ResourceKind::Instance), vec!["vm-1", "vm-2"]);
    assert_eq!(ids(&out, ResourceKind::Volume), vec!["vol-1"]);
    assert_eq!(ids(&out, ResourceKind::FloatingIp), vec!["fip-1"]);
    assert_eq!(ids(&out, ResourceKind::Container), vec!["backups"]);
    assert!(out.facts.iter().all(|fact| fact.tenant_name == "alpha"));
}

#[tokio::test]
async fn images_are_limited_to_those_in_use() {
    let out = collect(FakeInventory::fixture(), &tenant(1, "alpha")).await;
    assert_eq!(ids(&out, ResourceKind::Image), vec!["img-used"]);
}

#[tokio::test]
async fn missing_flavor_is_labelled_unknown() {
    let out = collect(FakeInventory::fixture(), &tenant(1, "alpha")).await;
    let flavor = |id: &str| {
        out.facts
            .iter()
            .find(|fact| fact.kind == ResourceKind::Instance && fact.id == id)
            .and_then(|fact| fact.attribute(FLAVOR_ATTRIBUTE))
            .map(str::to_string)
    };
    assert_eq!(flavor("vm-1").as_deref(), Some("a1-ram2"));
    assert_eq!(flavor("vm-2").as_deref(), Some("unknown"));
}

#[tokio::test]
async fn quota_output_is_restricted_to_allow_list() {
    let out = collect(FakeInventory::fixture(), &tenant(1, "alpha")).await;
    let quotas: Vec<_> = out
        .facts
        .iter()
        .filter(|fact| fact.kind == ResourceKind::Quota)
        .map(|fact| (fact.id.as_str(), fact.value))
        .collect();
    assert_eq!(quotas, vec![("cores", 4.0)]);
}

#[tokio::test]
async fn quota_falls_back_to_identity_service() {
    let mut inventory = FakeInventory::fixture().failing(InventoryOp::Quota(QuotaService::Compute));
    inventory.quotas.insert(
        QuotaService::Identity,
        QuotaSet::from([("instances".to_string(), Some(10.0))]),
    );
    let out = collect(inventory, &tenant(1, "alpha")).await;

    assert!(out.errors.is_empty());
    assert_eq!(ids(&out, ResourceKind::Quota), vec!["instances"]);
}

#[tokio::test]
async fn no_quota_service_records_one_error() {
    let inventory = FakeInventory::fixture()
        .failing(InventoryOp::Quota(QuotaService::Compute))
        .failing(InventoryOp::Quota(QuotaService::Identity));
    let out = collect(inventory, &tenant(1, "alpha")).await;

    assert_eq!(out.errors.len(), 1);
    assert_eq!(out.errors[0].phase, CollectionPhase::Quota);
    assert!(ids(&out, ResourceKind::Quota).is_empty());
}

#[tokio::test]
async fn failing_subsystem_leaves_siblings_intact() {
    let inventory = FakeInventory::fixture().failing(InventoryOp::Volumes);
    let out = collect(inventory, &tenant(1, "alpha")).await;

    assert_eq!(out.errors.len(), 1);
    assert_eq!(out.errors[0].phase, CollectionPhase::Storage);
    assert_eq!(out.errors[0].tenant, "alpha");
    assert!(ids(&out, ResourceKind::Volume).is_empty());
    assert_eq!(ids(&out, ResourceKind::Instance), vec!["vm-1", "vm-2"]);
    assert_eq!(ids(&out, ResourceKind::Container), vec!["backups"]);
    assert_eq!(ids(&out, ResourceKind::Quota), vec!["cores"]);
}

#[tokio::test]
async fn server_failure_skips_images_and_counts_once() {
    let inventory = FakeInventory::fixture().failing(InventoryOp::Servers);
    let out = collect(inventory, &tenant(1, "alpha")).await;

    assert_eq!(out.errors.len(), 1);
    assert_eq!(out.errors[0].phase, CollectionPhase::Compute);
    assert!(ids(&out, ResourceKind::Instance).is_empty());
    assert!(ids(&out, ResourceKind::Image).is_empty());
}

#[tokio::test]
async fn unknown_project_id_fails_identity_and_quota_only() {
    let tenant = TenantConfig {
        project_id: String::new(),
        ..tenant(1, "alpha")
    };
    let out = collect(FakeInventory::fixture(), &tenant).await;

    let mut phases: Vec<_> = out.errors.iter().map(|e| e.phase).collect();
    phases.sort_by_key(|phase| phase.as_str());
    assert_eq!(phases, vec![CollectionPhase::Identity, CollectionPhase::Quota]);
    assert_eq!(ids(&out, ResourceKind::Volume), vec!["vol-1"]);
}

#[tokio::test]
async fn blank_project_name_is_reported_as_unknown() {
    let tenant = TenantConfig {
        project_name: String::new(),
        ..tenant(1, "alpha")
    };
    let out = collect(FakeInventory::fixture(), &tenant).await;
    assert!(out.facts.iter().all(|fact| fact.tenant_name == "unknown"));
}
