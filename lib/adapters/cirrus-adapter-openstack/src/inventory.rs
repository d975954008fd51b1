use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use cirrus_domain::{CollectionPhase, ExporterError, QuotaService, QuotaSet, Server, Session};
use cirrus_ports::InventoryPort;

use crate::http::{AUTH_TOKEN_HEADER, describe_failure, join, unversioned, versioned};
use crate::wire::{
    ContainerEntry, FloatingIpsEnvelope, IdOnly, ImagesEnvelope, LimitsEnvelope, ProjectEnvelope,
    QuotaSetEnvelope, ServersEnvelope, VolumesEnvelope,
};

const IMAGE_PAGE_LIMIT: &str = "200";
const MAX_IMAGE_PAGES: usize = 50;
const VOLUME_SERVICE_TYPES: [&str; 3] = ["volumev3", "block-storage", "volumev2"];

/// Inventory lookups over the public endpoints of a session's service catalog.
#[derive(Debug, Clone)]
pub struct OpenStackInventory {
    client: Client,
}

impl OpenStackInventory {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn endpoint<'a>(
        session: &'a Session,
        service_types: &[&str],
        phase: CollectionPhase,
    ) -> Result<&'a str> {
        session.endpoint_any(service_types).ok_or_else(|| {
            ExporterError::ResourceFetch {
                phase,
                reason: format!(
                    "no public {} endpoint in service catalog for region '{}'",
                    service_types.join("/"),
                    session.region()
                ),
            }
            .into()
        })
    }

    /// GET returning `None` for 204 and 404; any other non-success is an error.
    async fn get_json<T: DeserializeOwned>(
        &self,
        session: &Session,
        url: &str,
        query: &[(&str, &str)],
        phase: CollectionPhase,
    ) -> Result<Option<T>> {
        debug!(%url, %phase, "inventory request");
        let response = self
            .client
            .get(url)
            .header(AUTH_TOKEN_HEADER, session.token())
            .header(ACCEPT, "application/json")
            .query(query)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT || status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ExporterError::ResourceFetch {
                phase,
                reason: format!("GET {url} returned {}", describe_failure(response).await),
            }
            .into());
        }
        let body = response
            .json::<T>()
            .await
            .with_context(|| format!("failed to decode response of GET {url}"))?;
        Ok(Some(body))
    }
}

fn ids(entries: Vec<IdOnly>) -> Vec<String> {
    entries.into_iter().map(IdOnly::into_id).collect()
}

#[async_trait]
impl InventoryPort for OpenStackInventory {
    async fn get_project(&self, session: &Session, project_id: &str) -> Result<Option<String>> {
        let base = Self::endpoint(session, &["identity"], CollectionPhase::Identity)?;
        let url = join(&versioned(base, "v3"), &format!("projects/{project_id}"));
        let project: Option<ProjectEnvelope> = self
            .get_json(session, &url, &[], CollectionPhase::Identity)
            .await?;
        Ok(project.and_then(|envelope| envelope.project.id))
    }

    async fn list_servers(&self, session: &Session) -> Result<Vec<Server>> {
        let base = Self::endpoint(session, &["compute"], CollectionPhase::Compute)?;
        let url = join(base, "servers/detail");
        let envelope: Option<ServersEnvelope> = self
            .get_json(session, &url, &[], CollectionPhase::Compute)
            .await?;
        Ok(envelope
            .unwrap_or_default()
            .servers
            .into_iter()
            .map(Server::from)
            .collect())
    }

    async fn list_images(&self, session: &Session) -> Result<Vec<String>> {
        let base = Self::endpoint(session, &["image"], CollectionPhase::Compute)?;
        let root = unversioned(base, "v2");
        let mut url = join(&versioned(&root, "v2"), "images");
        let mut query = vec![("limit", IMAGE_PAGE_LIMIT)];
        let mut images = Vec::new();

        // Glance pages with a relative `next` link.
        for _ in 0..MAX_IMAGE_PAGES {
            let page: Option<ImagesEnvelope> = self
                .get_json(session, &url, &query, CollectionPhase::Compute)
                .await?;
            let Some(page) = page else { break };
            images.extend(ids(page.images));
            match page.next {
                Some(next) if !next.is_empty() => {
                    url = join(&root, &next);
                    query.clear();
                }
                _ => break,
            }
        }
        Ok(images)
    }

    async fn list_volumes(&self, session: &Session) -> Result<Vec<String>> {
        let base = Self::endpoint(session, &VOLUME_SERVICE_TYPES, CollectionPhase::Storage)?;
        let url = join(base, "volumes");
        let envelope: Option<VolumesEnvelope> = self
            .get_json(session, &url, &[], CollectionPhase::Storage)
            .await?;
        Ok(ids(envelope.unwrap_or_default().volumes))
    }

    async fn list_floating_ips(&self, session: &Session) -> Result<Vec<String>> {
        let base = Self::endpoint(session, &["network"], CollectionPhase::Network)?;
        let url = join(&versioned(base, "v2.0"), "floatingips");
        let envelope: Option<FloatingIpsEnvelope> = self
            .get_json(session, &url, &[], CollectionPhase::Network)
            .await?;
        Ok(ids(envelope.unwrap_or_default().floatingips))
    }

    async fn list_containers(&self, session: &Session) -> Result<Vec<String>> {
        let base = Self::endpoint(session, &["object-store"], CollectionPhase::Storage)?;
        let containers: Option<Vec<ContainerEntry>> = self
            .get_json(session, base, &[("format", "json")], CollectionPhase::Storage)
            .await?;
        Ok(containers
            .unwrap_or_default()
            .into_iter()
            .map(|container| container.name.unwrap_or_default())
            .collect())
    }

    async fn get_quota_set(
        &self,
        session: &Session,
        project_id: &str,
        service: QuotaService,
    ) -> Result<QuotaSet> {
        match service {
            QuotaService::Compute => {
                let base = Self::endpoint(session, &["compute"], CollectionPhase::Quota)?;
                let url = join(base, &format!("os-quota-sets/{project_id}"));
                let envelope: Option<QuotaSetEnvelope> = self
                    .get_json(session, &url, &[], CollectionPhase::Quota)
                    .await?;
                envelope
                    .map(QuotaSetEnvelope::into_quota_set)
                    .with_context(|| format!("compute quota set for {project_id} not found"))
            }
            QuotaService::Identity => {
                let base = Self::endpoint(session, &["identity"], CollectionPhase::Quota)?;
                let url = join(&versioned(base, "v3"), "limits");
                let envelope: Option<LimitsEnvelope> = self
                    .get_json(
                        session,
                        &url,
                        &[("project_id", project_id)],
                        CollectionPhase::Quota,
                    )
                    .await?;
                envelope
                    .map(LimitsEnvelope::into_quota_set)
                    .with_context(|| format!("identity limits for {project_id} not found"))
            }
        }
    }
}
