//! Port traits between the collection runtime and the cloud APIs.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use cirrus_domain::{
    Measure, MetricRef, QuotaService, QuotaSet, ResourceRef, Server, Session, TenantConfig,
};

/// Opens authenticated sessions against the identity service.
#[async_trait]
pub trait SessionPort: Send + Sync {
    async fn authenticate(&self, tenant: &TenantConfig) -> Result<Session>;
}

/// Inventory and quota lookups for one authenticated session.
///
/// Every call is independent; a failure in one must not affect the others.
#[async_trait]
pub trait InventoryPort: Send + Sync {
    /// Project id as confirmed by the identity service, `None` when not found.
    async fn get_project(&self, session: &Session, project_id: &str) -> Result<Option<String>>;

    async fn list_servers(&self, session: &Session) -> Result<Vec<Server>>;

    /// Image ids visible to the project.
    async fn list_images(&self, session: &Session) -> Result<Vec<String>>;

    async fn list_volumes(&self, session: &Session) -> Result<Vec<String>>;

    async fn list_floating_ips(&self, session: &Session) -> Result<Vec<String>>;

    /// Object-store container names (containers are identified by name).
    async fn list_containers(&self, session: &Session) -> Result<Vec<String>>;

    async fn get_quota_set(
        &self,
        session: &Session,
        project_id: &str,
        service: QuotaService,
    ) -> Result<QuotaSet>;
}

/// Read-only time-series backend client bound to one session.
///
/// Non-success HTTP statuses yield empty results; `Err` is reserved for
/// transport and decoding failures.
#[async_trait]
pub trait TimeSeriesPort: Send + Sync {
    async fn list_resources(&self, kind: &str) -> Result<Vec<ResourceRef>>;

    async fn list_metrics(&self, resource_id: &str) -> Result<Vec<MetricRef>>;

    async fn get_measures(
        &self,
        metric_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Measure>>;
}

/// Resolves the time-series endpoint for a session and builds a client for it.
pub trait TimeSeriesConnector: Send + Sync {
    fn connect(&self, session: &Session) -> Result<Arc<dyn TimeSeriesPort>>;
}

#[derive(Clone)]
pub struct PortSet {
    pub sessions: Arc<dyn SessionPort>,
    pub inventory: Arc<dyn InventoryPort>,
    pub timeseries: Arc<dyn TimeSeriesConnector>,
}

impl PortSet {
    pub fn new(
        sessions: Arc<dyn SessionPort>,
        inventory: Arc<dyn InventoryPort>,
        timeseries: Arc<dyn TimeSeriesConnector>,
    ) -> Self {
        Self {
            sessions,
            inventory,
            timeseries,
        }
    }
}
