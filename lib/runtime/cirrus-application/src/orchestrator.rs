use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use cirrus_domain::{
    CollectionError, CollectionPhase, ExporterConfig, MessageCatalog, TenantConfig, TenantSet,
};
use cirrus_ports::{PortSet, TimeSeriesConnector};

use crate::aggregator::{Aggregation, TimeSeriesAggregator};
use crate::metric_set::MetricSet;
use crate::resource_collector::ResourceCollector;
use crate::session_cache::SessionCache;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RunState {
    Idle = 0,
    Running = 1,
    Done = 2,
}

impl RunState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Running,
            2 => Self::Done,
            _ => Self::Idle,
        }
    }
}

/// Summary of one collection cycle.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ScrapeReport {
    pub tenants: usize,
    /// Tenants that obtained a session.
    pub connected: usize,
    pub facts: usize,
    pub samples: usize,
    pub errors: Vec<CollectionError>,
}

#[derive(Debug, Default)]
struct TenantOutcome {
    connected: bool,
    facts: usize,
    samples: usize,
    errors: Vec<CollectionError>,
}

struct Shared {
    sessions: SessionCache,
    collector: ResourceCollector,
    aggregator: TimeSeriesAggregator,
    timeseries: Arc<dyn TimeSeriesConnector>,
    metrics: Arc<MetricSet>,
    messages: Arc<MessageCatalog>,
}

/// Runs one collection across every tenant and folds the results into the metric set.
///
/// Tenants run under their own pool, separate from the per-tenant resource pool.
/// Failures stay inside the tenant that raised them.
pub struct Orchestrator {
    tenants: Vec<TenantConfig>,
    tenant_concurrency: usize,
    shared: Arc<Shared>,
    state: AtomicU8,
}

impl Orchestrator {
    pub fn new(
        config: &ExporterConfig,
        tenants: TenantSet,
        ports: PortSet,
        metrics: Arc<MetricSet>,
        messages: Arc<MessageCatalog>,
    ) -> Self {
        let shared = Shared {
            sessions: SessionCache::new(ports.sessions, Arc::clone(&messages)),
            collector: ResourceCollector::new(ports.inventory, Arc::clone(&messages)),
            aggregator: TimeSeriesAggregator::new(
                config.resource_concurrency,
                config.lookback(),
                config.timeseries.resource_kind.clone(),
                Arc::clone(&messages),
            ),
            timeseries: ports.timeseries,
            metrics,
            messages,
        };
        Self {
            tenants: tenants.into_values().collect(),
            tenant_concurrency: config.tenant_concurrency.max(1),
            shared: Arc::new(shared),
            state: AtomicU8::new(RunState::Idle as u8),
        }
    }

    pub fn state(&self) -> RunState {
        RunState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn tenant_count(&self) -> usize {
        self.tenants.len()
    }

    pub fn cached_sessions(&self) -> usize {
        self.shared.sessions.len()
    }

    /// Collects every tenant; returns once each tenant task finished or failed.
    ///
    /// Errors reach the metric set's counter as soon as they are caught, so a
    /// dropped run keeps the count of what already failed. Dropping the
    /// returned future aborts the tenant tasks still in flight.
    pub async fn run(&self) -> ScrapeReport {
        self.state.store(RunState::Running as u8, Ordering::Release);
        let mut report = ScrapeReport {
            tenants: self.tenants.len(),
            ..ScrapeReport::default()
        };

        let semaphore = Arc::new(Semaphore::new(self.tenant_concurrency));
        let mut jobs = JoinSet::new();
        let mut names = HashMap::new();
        for tenant in &self.tenants {
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                break;
            };
            let shared = Arc::clone(&self.shared);
            let tenant = tenant.clone();
            let name = tenant.display_name(self.shared.messages.unknown());
            let handle = jobs.spawn(async move {
                let outcome = collect_tenant(&shared, &tenant).await;
                drop(permit);
                outcome
            });
            names.insert(handle.id(), name);
        }

        while let Some(joined) = jobs.join_next_with_id().await {
            match joined {
                Ok((_, outcome)) => {
                    report.connected += usize::from(outcome.connected);
                    report.facts += outcome.facts;
                    report.samples += outcome.samples;
                    report.errors.extend(outcome.errors);
                }
                Err(join_err) => {
                    let tenant = names
                        .get(&join_err.id())
                        .cloned()
                        .unwrap_or_else(|| self.shared.messages.unknown().to_string());
                    error!(%tenant, error = %join_err, "{}", self.shared.messages.get("parallel_error"));
                    self.shared.metrics.record_errors(1);
                    report.errors.push(CollectionError::new(
                        tenant,
                        CollectionPhase::Connect,
                        join_err,
                    ));
                }
            }
        }

        self.finish();
        report
    }

    /// Marks the cycle over, including one abandoned on timeout.
    pub fn finish(&self) {
        self.state.store(RunState::Done as u8, Ordering::Release);
    }
}

async fn collect_tenant(shared: &Shared, tenant: &TenantConfig) -> TenantOutcome {
    let messages = &shared.messages;
    let name = tenant.display_name(messages.unknown());
    let mut outcome = TenantOutcome::default();

    debug!(tenant = %name, stage = "connecting");
    if tenant.region.trim().is_empty() {
        let message = messages.get("region_undefined");
        error!(tenant = %name, phase = %CollectionPhase::Connect, "{message}");
        outcome
            .errors
            .push(CollectionError::new(name, CollectionPhase::Connect, message));
        shared.metrics.record_errors(1);
        return outcome;
    }

    let session = match shared.sessions.get_or_create(tenant).await {
        Ok(session) => session,
        Err(err) => {
            error!(
                tenant = %name,
                phase = %CollectionPhase::Connect,
                error = %err,
                "{}",
                messages.format("connection_error", &[&name])
            );
            outcome
                .errors
                .push(CollectionError::new(name, CollectionPhase::Connect, err));
            shared.metrics.record_errors(1);
            return outcome;
        }
    };
    outcome.connected = true;
    info!(
        tenant = %name,
        "{}",
        messages.format("connection_success", &[&name, &tenant.region])
    );

    debug!(tenant = %name, stage = "collecting");
    // Each half folds its results in as soon as it completes.
    let inventory = async {
        let inventory = shared.collector.collect(tenant, &session).await;
        shared.metrics.record_errors(inventory.errors.len());
        let facts = inventory
            .facts
            .iter()
            .filter(|fact| shared.metrics.apply_fact(fact))
            .count();
        (facts, inventory.errors)
    };
    let timeseries = async {
        let aggregation = match shared.timeseries.connect(&session) {
            Ok(client) => {
                debug!(tenant = %name, stage = "aggregating");
                shared.aggregator.aggregate(&name, client).await
            }
            Err(err) => {
                error!(tenant = %name, error = %format!("{err:#}"), "{}", messages.format("gnocchi_error", &[&name]));
                Aggregation {
                    samples: Vec::new(),
                    errors: vec![CollectionError::from_error(
                        name.clone(),
                        CollectionPhase::TimeSeries,
                        &err,
                    )],
                }
            }
        };
        shared.metrics.record_errors(aggregation.errors.len());
        let samples = aggregation
            .samples
            .iter()
            .filter(|sample| shared.metrics.apply_sample(sample))
            .count();
        (samples, aggregation.errors)
    };
    let ((facts, inventory_errors), (samples, timeseries_errors)) =
        tokio::join!(inventory, timeseries);

    outcome.facts = facts;
    outcome.samples = samples;
    outcome.errors.extend(inventory_errors);
    outcome.errors.extend(timeseries_errors);
    debug!(
        tenant = %name,
        facts = outcome.facts,
        samples = outcome.samples,
        errors = outcome.errors.len(),
        "tenant collected"
    );
    outcome
}
