use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, error, info, warn};

use cirrus_domain::{
    CollectionError, CollectionPhase, MessageCatalog, QUOTA_PROBE_ORDER, ResourceFact,
    ResourceKind, Server, Session, TenantConfig, retain_allowed,
};
use cirrus_ports::InventoryPort;

pub const FLAVOR_ATTRIBUTE: &str = "flavor_id";

/// Facts and caught failures of one tenant's inventory pass.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TenantInventory {
    pub facts: Vec<ResourceFact>,
    pub errors: Vec<CollectionError>,
}

impl TenantInventory {
    fn merge(&mut self, other: TenantInventory) {
        self.facts.extend(other.facts);
        self.errors.extend(other.errors);
    }
}

/// Queries inventory and quotas for one tenant.
///
/// Every subsystem runs independently; a failure empties only that subsystem.
#[derive(Clone)]
pub struct ResourceCollector {
    inventory: Arc<dyn InventoryPort>,
    messages: Arc<MessageCatalog>,
}

struct Scope<'a> {
    tenant: String,
    project_id: Option<&'a str>,
    session: &'a Session,
}

impl ResourceCollector {
    pub fn new(inventory: Arc<dyn InventoryPort>, messages: Arc<MessageCatalog>) -> Self {
        Self {
            inventory,
            messages,
        }
    }

    pub async fn collect(&self, tenant: &TenantConfig, session: &Session) -> TenantInventory {
        let scope = Scope {
            tenant: tenant.display_name(self.messages.unknown()),
            project_id: tenant.project_id().or_else(|| session.project_id()),
            session,
        };

        let (identity, compute, volumes, floating_ips, containers, quotas) = tokio::join!(
            self.identity(&scope),
            self.compute(&scope),
            self.listing(
                &scope,
                ResourceKind::Volume,
                CollectionPhase::Storage,
                "volumes_success",
                "volumes_project_error",
                self.inventory.list_volumes(session),
            ),
            self.listing(
                &scope,
                ResourceKind::FloatingIp,
                CollectionPhase::Network,
                "floating_ips_success",
                "floating_ips_project_error",
                self.inventory.list_floating_ips(session),
            ),
            self.listing(
                &scope,
                ResourceKind::Container,
                CollectionPhase::Storage,
                "containers_success",
                "containers_project_error",
                self.inventory.list_containers(session),
            ),
            self.quotas(&scope),
        );

        let mut out = TenantInventory::default();
        for part in [identity, compute, volumes, floating_ips, containers, quotas] {
            out.merge(part);
        }
        out
    }

    fn failure(
        &self,
        scope: &Scope<'_>,
        phase: CollectionPhase,
        message_key: &str,
        err: &anyhow::Error,
    ) -> CollectionError {
        error!(
            tenant = %scope.tenant,
            %phase,
            error = %format!("{err:#}"),
            "{}",
            self.messages.format(message_key, &[&scope.tenant])
        );
        CollectionError::from_error(scope.tenant.clone(), phase, err)
    }

    fn missing_project_id(&self, scope: &Scope<'_>, phase: CollectionPhase) -> CollectionError {
        let message = self.messages.format("project_id_missing", &[&scope.tenant]);
        warn!(tenant = %scope.tenant, %phase, "{message}");
        CollectionError::new(scope.tenant.clone(), phase, message)
    }

    async fn identity(&self, scope: &Scope<'_>) -> TenantInventory {
        let mut out = TenantInventory::default();
        let Some(project_id) = scope.project_id else {
            out.errors
                .push(self.missing_project_id(scope, CollectionPhase::Identity));
            return out;
        };
        match self.inventory.get_project(scope.session, project_id).await {
            Ok(Some(identity_id)) => {
                info!(tenant = %scope.tenant, "{}", self.messages.get("identity_success"));
                out.facts.push(ResourceFact::present(
                    ResourceKind::Identity,
                    scope.tenant.clone(),
                    identity_id,
                ));
            }
            Ok(None) => warn!(tenant = %scope.tenant, "{}", self.messages.get("no_identity")),
            Err(err) => out.errors.push(self.failure(
                scope,
                CollectionPhase::Identity,
                "identity_metrics_error",
                &err,
            )),
        }
        out
    }

    /// Instances, then the images those instances boot from.
    async fn compute(&self, scope: &Scope<'_>) -> TenantInventory {
        let mut out = TenantInventory::default();
        let servers = match self.inventory.list_servers(scope.session).await {
            Ok(servers) => servers,
            Err(err) => {
                out.errors.push(self.failure(
                    scope,
                    CollectionPhase::Compute,
                    "instances_project_error",
                    &err,
                ));
                return out;
            }
        };
        if !servers.is_empty() {
            info!(tenant = %scope.tenant, "{}", self.messages.get("instances_success"));
        }
        out.facts
            .extend(servers.iter().map(|server| self.instance_fact(scope, server)));

        let used: HashSet<&str> = servers
            .iter()
            .filter_map(|server| server.image_id.as_deref())
            .collect();
        if used.is_empty() {
            return out;
        }
        match self.inventory.list_images(scope.session).await {
            Ok(images) => {
                info!(tenant = %scope.tenant, "{}", self.messages.get("images_success"));
                out.facts.extend(
                    images
                        .into_iter()
                        .filter(|image| used.contains(image.as_str()))
                        .map(|image| {
                            ResourceFact::present(ResourceKind::Image, scope.tenant.clone(), image)
                        }),
                );
            }
            Err(err) => out.errors.push(self.failure(
                scope,
                CollectionPhase::Compute,
                "images_project_error",
                &err,
            )),
        }
        out
    }

    fn instance_fact(&self, scope: &Scope<'_>, server: &Server) -> ResourceFact {
        let flavor = server
            .flavor_id
            .as_deref()
            .map(str::trim)
            .filter(|flavor| !flavor.is_empty())
            .unwrap_or(self.messages.unknown());
        ResourceFact::present(ResourceKind::Instance, scope.tenant.clone(), server.id.clone())
            .with_attribute(FLAVOR_ATTRIBUTE, flavor)
    }

    async fn listing(
        &self,
        scope: &Scope<'_>,
        kind: ResourceKind,
        phase: CollectionPhase,
        success_key: &str,
        error_key: &str,
        fetch: impl Future<Output = Result<Vec<String>>>,
    ) -> TenantInventory {
        let mut out = TenantInventory::default();
        match fetch.await {
            Ok(ids) => {
                if !ids.is_empty() {
                    info!(tenant = %scope.tenant, "{}", self.messages.get(success_key));
                }
                out.facts.extend(
                    ids.into_iter()
                        .map(|id| ResourceFact::present(kind, scope.tenant.clone(), id)),
                );
            }
            Err(err) => out.errors.push(self.failure(scope, phase, error_key, &err)),
        }
        out
    }

    /// First quota service answering without error wins; only allow-listed keys are kept.
    async fn quotas(&self, scope: &Scope<'_>) -> TenantInventory {
        let mut out = TenantInventory::default();
        let Some(project_id) = scope.project_id else {
            out.errors
                .push(self.missing_project_id(scope, CollectionPhase::Quota));
            return out;
        };

        for service in QUOTA_PROBE_ORDER {
            match self
                .inventory
                .get_quota_set(scope.session, project_id, service)
                .await
            {
                Ok(quotas) => {
                    let (kept, ignored) = retain_allowed(quotas);
                    for (resource, value) in ignored {
                        let value = value.map_or_else(|| "None".to_string(), |v| v.to_string());
                        debug!(
                            tenant = %scope.tenant,
                            "{}",
                            self.messages.format("quota_ignored", &[&resource, &value])
                        );
                    }
                    info!(tenant = %scope.tenant, %service, "{}", self.messages.get("quotas_success"));
                    out.facts.extend(kept.into_iter().map(|(resource, limit)| {
                        ResourceFact::quota(scope.tenant.clone(), resource, limit)
                    }));
                    return out;
                }
                Err(err) => debug!(
                    tenant = %scope.tenant,
                    "{}",
                    self.messages.format(
                        "quota_error",
                        &[&project_id, &service, &format!("{err:#}")]
                    )
                ),
            }
        }

        let message = self.messages.format("quotas_service_error", &[&scope.tenant]);
        error!(tenant = %scope.tenant, phase = %CollectionPhase::Quota, "{message}");
        out.errors.push(CollectionError::new(
            scope.tenant.clone(),
            CollectionPhase::Quota,
            message,
        ));
        out
    }
}
