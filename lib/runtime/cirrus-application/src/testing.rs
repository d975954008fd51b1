//! In-memory port implementations for tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use cirrus_domain::{
    ExporterError, Measure, MetricRef, QuotaService, QuotaSet, ResourceRef, Server, Session,
    TenantConfig, TenantSet,
};
use cirrus_ports::{InventoryPort, PortSet, SessionPort, TimeSeriesConnector, TimeSeriesPort};

pub fn tenant(index: u32, project_name: &str) -> TenantConfig {
    TenantConfig {
        index,
        project_name: project_name.to_string(),
        username: format!("svc-{project_name}"),
        password: "secret".to_string(),
        auth_url: "https://keystone.test/v3".to_string(),
        user_domain: "Default".to_string(),
        project_domain: "Default".to_string(),
        project_id: format!("pid-{project_name}"),
        region: "dc3-a".to_string(),
    }
}

pub fn tenants(names: &[&str]) -> TenantSet {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let index = i as u32 + 1;
            (index, tenant(index, name))
        })
        .collect()
}

/// Authenticator issuing `token-<project>` unless the project is marked failing.
#[derive(Default)]
pub struct FakeSessions {
    failing: HashSet<String>,
    expires_at: Option<DateTime<Utc>>,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeSessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, project_name: &str) -> Self {
        self.failing.insert(project_name.to_string());
        self
    }

    pub fn expiring_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionPort for FakeSessions {
    async fn authenticate(&self, tenant: &TenantConfig) -> Result<Session> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.failing.contains(&tenant.project_name) {
            return Err(ExporterError::Authentication {
                tenant: tenant.project_name.clone(),
                reason: "401 Unauthorized".to_string(),
            }
            .into());
        }
        let mut session = Session::new(format!("token-{}", tenant.project_name), &tenant.region);
        if let Some(expires_at) = self.expires_at {
            session = session.with_expiry(expires_at);
        }
        Ok(session)
    }
}

/// Inventory operations of [`FakeInventory`], used for failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InventoryOp {
    Project,
    Servers,
    Images,
    Volumes,
    FloatingIps,
    Containers,
    Quota(QuotaService),
}

/// Same fixture for every session; failures can be scoped to one project's token.
#[derive(Default)]
pub struct FakeInventory {
    pub servers: Vec<Server>,
    pub images: Vec<String>,
    pub volumes: Vec<String>,
    pub floating_ips: Vec<String>,
    pub containers: Vec<String>,
    pub quotas: HashMap<QuotaService, QuotaSet>,
    failing: HashSet<InventoryOp>,
    failing_tokens: HashSet<(InventoryOp, String)>,
}

impl FakeInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A small project: two instances, one image in use, a volume, an IP, a container, cores quota.
    pub fn fixture() -> Self {
        Self {
            servers: vec![
                Server {
                    id: "vm-1".into(),
                    flavor_id: Some("a1-ram2".into()),
                    image_id: Some("img-used".into()),
                },
                Server {
                    id: "vm-2".into(),
                    flavor_id: None,
                    image_id: None,
                },
            ],
            images: vec!["img-used".into(), "img-unused".into()],
            volumes: vec!["vol-1".into()],
            floating_ips: vec!["fip-1".into()],
            containers: vec!["backups".into()],
            quotas: HashMap::from([(
                QuotaService::Compute,
                QuotaSet::from([
                    ("cores".to_string(), Some(4.0)),
                    ("totally_unknown_field".to_string(), Some(99.0)),
                ]),
            )]),
            ..Self::default()
        }
    }

    pub fn failing(mut self, op: InventoryOp) -> Self {
        self.failing.insert(op);
        self
    }

    pub fn failing_for(mut self, op: InventoryOp, project_name: &str) -> Self {
        self.failing_tokens
            .insert((op, format!("token-{project_name}")));
        self
    }

    fn check(&self, op: InventoryOp, session: &Session) -> Result<()> {
        if self.failing.contains(&op)
            || self
                .failing_tokens
                .contains(&(op, session.token().to_string()))
        {
            return Err(anyhow!("injected {op:?} failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl InventoryPort for FakeInventory {
    async fn get_project(&self, session: &Session, project_id: &str) -> Result<Option<String>> {
        self.check(InventoryOp::Project, session)?;
        Ok(Some(project_id.to_string()))
    }

    async fn list_servers(&self, session: &Session) -> Result<Vec<Server>> {
        self.check(InventoryOp::Servers, session)?;
        Ok(self.servers.clone())
    }

    async fn list_images(&self, session: &Session) -> Result<Vec<String>> {
        self.check(InventoryOp::Images, session)?;
        Ok(self.images.clone())
    }

    async fn list_volumes(&self, session: &Session) -> Result<Vec<String>> {
        self.check(InventoryOp::Volumes, session)?;
        Ok(self.volumes.clone())
    }

    async fn list_floating_ips(&self, session: &Session) -> Result<Vec<String>> {
        self.check(InventoryOp::FloatingIps, session)?;
        Ok(self.floating_ips.clone())
    }

    async fn list_containers(&self, session: &Session) -> Result<Vec<String>> {
        self.check(InventoryOp::Containers, session)?;
        Ok(self.containers.clone())
    }

    async fn get_quota_set(
        &self,
        session: &Session,
        _project_id: &str,
        service: QuotaService,
    ) -> Result<QuotaSet> {
        self.check(InventoryOp::Quota(service), session)?;
        self.quotas
            .get(&service)
            .cloned()
            .ok_or_else(|| anyhow!("{service} quotas unavailable"))
    }
}

/// Time-series backend that records how many resource jobs overlap.
///
/// Every job starts with one `list_metrics` call; overlapping calls are counted.
#[derive(Default)]
pub struct FakeTimeSeries {
    pub resources: Vec<ResourceRef>,
    pub metrics: HashMap<String, Vec<MetricRef>>,
    pub measures: HashMap<String, Vec<Measure>>,
    failing_resources: HashSet<String>,
    fail_listing: bool,
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    windows: Mutex<Vec<(DateTime<Utc>, DateTime<Utc>)>>,
}

impl FakeTimeSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// `count` resources, each with one `cpu` metric holding `value`.
    pub fn uniform(count: usize, value: f64, at: DateTime<Utc>) -> Self {
        let mut fake = Self::default();
        for i in 0..count {
            let resource_id = format!("res-{i}");
            let metric_id = format!("m-{i}");
            fake.resources.push(ResourceRef {
                id: resource_id.clone(),
            });
            fake.metrics.insert(
                resource_id,
                vec![MetricRef {
                    id: metric_id.clone(),
                    name: "cpu".into(),
                }],
            );
            fake.measures
                .insert(metric_id, vec![Measure::new(at, value, 300.0)]);
        }
        fake
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing_resource(mut self, resource_id: &str) -> Self {
        self.failing_resources.insert(resource_id.to_string());
        self
    }

    pub fn failing_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn windows(&self) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
        self.windows.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl TimeSeriesPort for FakeTimeSeries {
    async fn list_resources(&self, _kind: &str) -> Result<Vec<ResourceRef>> {
        if self.fail_listing {
            return Err(anyhow!("injected listing failure"));
        }
        Ok(self.resources.clone())
    }

    async fn list_metrics(&self, resource_id: &str) -> Result<Vec<MetricRef>> {
        self.enter();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let result = if self.failing_resources.contains(resource_id) {
            Err(anyhow!("injected metrics failure for {resource_id}"))
        } else {
            Ok(self.metrics.get(resource_id).cloned().unwrap_or_default())
        };
        self.leave();
        result
    }

    async fn get_measures(
        &self,
        metric_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Measure>> {
        self.windows
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((start, end));
        Ok(self.measures.get(metric_id).cloned().unwrap_or_default())
    }
}

/// Hands out one shared [`FakeTimeSeries`], failing for listed regions.
pub struct FakeConnector {
    client: Arc<FakeTimeSeries>,
    failing_regions: HashSet<String>,
}

impl FakeConnector {
    pub fn new(client: Arc<FakeTimeSeries>) -> Self {
        Self {
            client,
            failing_regions: HashSet::new(),
        }
    }

    pub fn failing_region(mut self, region: &str) -> Self {
        self.failing_regions.insert(region.to_string());
        self
    }
}

impl TimeSeriesConnector for FakeConnector {
    fn connect(&self, session: &Session) -> Result<Arc<dyn TimeSeriesPort>> {
        if self.failing_regions.contains(session.region()) {
            return Err(ExporterError::TimeSeries(format!(
                "no endpoint for region '{}'",
                session.region()
            ))
            .into());
        }
        Ok(Arc::clone(&self.client) as Arc<dyn TimeSeriesPort>)
    }
}

pub fn ports(
    sessions: FakeSessions,
    inventory: FakeInventory,
    timeseries: Arc<FakeTimeSeries>,
) -> PortSet {
    PortSet::new(
        Arc::new(sessions),
        Arc::new(inventory),
        Arc::new(FakeConnector::new(timeseries)),
    )
}
