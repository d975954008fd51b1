use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use cirrus_domain::config::DEFAULT_LOOKBACK_SECS;
use cirrus_domain::{CollectionError, CollectionPhase, MessageCatalog, MetricSample, latest_measure};
use cirrus_ports::TimeSeriesPort;

/// Latest samples of one tenant plus the resource jobs that failed.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Aggregation {
    pub samples: Vec<MetricSample>,
    pub errors: Vec<CollectionError>,
}

/// Fans out over time-series resources under a bounded pool of resource jobs.
///
/// Each job lists a resource's metrics and fetches them one after another,
/// keeping the most recent measure inside the lookback window.
#[derive(Clone)]
pub struct TimeSeriesAggregator {
    concurrency: usize,
    lookback: TimeDelta,
    resource_kind: String,
    messages: Arc<MessageCatalog>,
}

struct Window {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl Window {
    fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }
}

impl TimeSeriesAggregator {
    pub fn new(
        concurrency: usize,
        lookback: Duration,
        resource_kind: impl Into<String>,
        messages: Arc<MessageCatalog>,
    ) -> Self {
        Self {
            concurrency: concurrency.max(1),
            lookback: TimeDelta::from_std(lookback)
                .unwrap_or_else(|_| TimeDelta::seconds(DEFAULT_LOOKBACK_SECS as i64)),
            resource_kind: resource_kind.into(),
            messages,
        }
    }

    pub async fn aggregate(&self, tenant: &str, client: Arc<dyn TimeSeriesPort>) -> Aggregation {
        let end = Utc::now();
        self.aggregate_window(tenant, client, end - self.lookback, end)
            .await
    }

    pub async fn aggregate_window(
        &self,
        tenant: &str,
        client: Arc<dyn TimeSeriesPort>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Aggregation {
        let mut out = Aggregation::default();
        let resources = match client.list_resources(&self.resource_kind).await {
            Ok(resources) => resources,
            Err(err) => {
                error!(
                    %tenant,
                    error = %format!("{err:#}"),
                    "{}",
                    self.messages.format("gnocchi_error", &[&tenant])
                );
                out.errors.push(CollectionError::from_error(
                    tenant,
                    CollectionPhase::TimeSeries,
                    &err,
                ));
                return out;
            }
        };

        let window = Arc::new(Window { start, end });
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut jobs = JoinSet::new();

        for resource in resources {
            let resource_id = resource.id.trim().to_string();
            if resource_id.is_empty() {
                continue;
            }
            // Acquired before spawning: at most `concurrency` jobs exist at once.
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                break;
            };
            let client = Arc::clone(&client);
            let window = Arc::clone(&window);
            let messages = Arc::clone(&self.messages);
            let tenant = tenant.to_string();
            jobs.spawn(async move {
                let result = collect_resource(&tenant, &resource_id, client, &window, &messages).await;
                drop(permit);
                (resource_id, result)
            });
        }

        while let Some(joined) = jobs.join_next().await {
            match joined {
                Ok((_, Ok(samples))) => out.samples.extend(samples),
                Ok((resource_id, Err(err))) => {
                    error!(
                        %tenant,
                        %resource_id,
                        error = %format!("{err:#}"),
                        "{}",
                        self.messages.format("gnocchi_resource_error", &[&resource_id])
                    );
                    out.errors.push(CollectionError::from_error(
                        tenant,
                        CollectionPhase::TimeSeries,
                        &err.context(format!("resource {resource_id}")),
                    ));
                }
                Err(join_err) => {
                    error!(%tenant, error = %join_err, "time-series job aborted");
                    out.errors.push(CollectionError::new(
                        tenant,
                        CollectionPhase::TimeSeries,
                        join_err,
                    ));
                }
            }
        }

        if out.errors.is_empty() {
            info!(%tenant, samples = out.samples.len(), "{}", self.messages.get("metrics_success"));
        }
        out
    }
}

async fn collect_resource(
    tenant: &str,
    resource_id: &str,
    client: Arc<dyn TimeSeriesPort>,
    window: &Window,
    messages: &MessageCatalog,
) -> Result<Vec<MetricSample>> {
    let metrics = client.list_metrics(resource_id).await?;
    let mut samples = Vec::new();
    for metric in metrics {
        let (metric_id, metric_name) = (metric.id.trim(), metric.name.trim());
        if metric_id.is_empty() || metric_name.is_empty() {
            warn!(
                %resource_id,
                "{}",
                messages.format("invalid_metric_id", &[&metric_name, &metric_id])
            );
            continue;
        }
        let mut measures = client
            .get_measures(metric_id, window.start, window.end)
            .await?;
        // Coarse granularities can align an aggregate before `start`.
        measures.retain(|measure| window.contains(measure.timestamp));
        match latest_measure(&measures) {
            Some(latest) => samples.push(MetricSample {
                tenant_name: tenant.to_string(),
                resource_id: resource_id.to_string(),
                metric_name: metric_name.to_string(),
                value: latest.value,
                timestamp: latest.timestamp,
            }),
            None => debug!(%resource_id, %metric_name, "no measure in lookback window"),
        }
    }
    Ok(samples)
}
