use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use prometheus::proto::MetricType;
use prometheus::{Encoder, Gauge, GaugeVec, Histogram, HistogramOpts, IntCounter, Opts, Registry, TextEncoder};
use tracing::warn;

use cirrus_domain::{MessageCatalog, MetricSample, ResourceFact, ResourceKind, clean_label_value};

use crate::resource_collector::FLAVOR_ATTRIBUTE;

pub const IDENTITY_FAMILY: &str = "openstack_identity_metrics";
pub const COMPUTE_FAMILY: &str = "openstack_compute_metrics";
pub const IMAGE_FAMILY: &str = "openstack_image_metrics";
pub const BLOCK_STORAGE_FAMILY: &str = "openstack_block_storage_metrics";
pub const NETWORK_FAMILY: &str = "openstack_network_metrics";
pub const OBJECT_STORAGE_FAMILY: &str = "openstack_object_storage_metrics";
pub const QUOTA_FAMILY: &str = "openstack_quota_metrics";
pub const GNOCCHI_FAMILY: &str = "openstack_gnocchi_metric";
pub const UPTIME_FAMILY: &str = "exporter_uptime_seconds";
pub const ERRORS_FAMILY: &str = "exporter_errors_total";
pub const SCRAPE_DURATION_FAMILY: &str = "exporter_scrape_duration_seconds";

/// Label-keyed gauges of the last collections plus the exporter's own metrics.
///
/// Every write is a `set`, so a label combination holds the value of the most
/// recent scrape that produced it. Combinations are never removed.
pub struct MetricSet {
    registry: Registry,
    identity: GaugeVec,
    compute: GaugeVec,
    image: GaugeVec,
    block_storage: GaugeVec,
    network: GaugeVec,
    object_storage: GaugeVec,
    quota: GaugeVec,
    gnocchi: GaugeVec,
    uptime: Gauge,
    errors: IntCounter,
    scrape_duration: Histogram,
    started: Instant,
    messages: MessageCatalog,
}

fn gauge_vec(
    registry: &Registry,
    name: &str,
    help: &str,
    labels: &[&str],
) -> Result<GaugeVec> {
    let gauge = GaugeVec::new(Opts::new(name, help), labels)
        .with_context(|| format!("invalid metric family {name}"))?;
    registry
        .register(Box::new(gauge.clone()))
        .with_context(|| format!("failed to register {name}"))?;
    Ok(gauge)
}

impl MetricSet {
    pub fn new(messages: &MessageCatalog) -> Result<Self> {
        let registry = Registry::new();
        let help = |key: &str| messages.get(key).to_string();

        let identity = gauge_vec(
            &registry,
            IDENTITY_FAMILY,
            &help("identity_metrics_desc"),
            &["project_name", "identity_id"],
        )?;
        let compute = gauge_vec(
            &registry,
            COMPUTE_FAMILY,
            &help("compute_metrics_desc"),
            &["project_name", "instance_id", "flavor_id"],
        )?;
        let image = gauge_vec(
            &registry,
            IMAGE_FAMILY,
            &help("image_metrics_desc"),
            &["project_name", "image_id"],
        )?;
        let block_storage = gauge_vec(
            &registry,
            BLOCK_STORAGE_FAMILY,
            &help("block_storage_metrics_desc"),
            &["project_name", "volume_id"],
        )?;
        let network = gauge_vec(
            &registry,
            NETWORK_FAMILY,
            &help("network_metrics_desc"),
            &["project_name", "network_id"],
        )?;
        let object_storage = gauge_vec(
            &registry,
            OBJECT_STORAGE_FAMILY,
            &help("object_storage_metrics_desc"),
            &["project_name", "container_id"],
        )?;
        let quota = gauge_vec(
            &registry,
            QUOTA_FAMILY,
            &help("quota_metrics_desc"),
            &["project_name", "resource"],
        )?;
        let gnocchi = gauge_vec(
            &registry,
            GNOCCHI_FAMILY,
            &help("gnocchi_metrics_desc"),
            &["project_name", "resource_id", "metric_name"],
        )?;

        let uptime = Gauge::with_opts(Opts::new(UPTIME_FAMILY, help("exporter_uptime_desc")))?;
        registry.register(Box::new(uptime.clone()))?;
        let errors = IntCounter::with_opts(Opts::new(ERRORS_FAMILY, help("exporter_errors_desc")))?;
        registry.register(Box::new(errors.clone()))?;
        let scrape_duration = Histogram::with_opts(HistogramOpts::new(
            SCRAPE_DURATION_FAMILY,
            help("exporter_scrape_desc"),
        ))?;
        registry.register(Box::new(scrape_duration.clone()))?;

        Ok(Self {
            registry,
            identity,
            compute,
            image,
            block_storage,
            network,
            object_storage,
            quota,
            gnocchi,
            uptime,
            errors,
            scrape_duration,
            started: Instant::now(),
            messages: messages.clone(),
        })
    }

    fn family(&self, kind: ResourceKind) -> (&GaugeVec, &'static str) {
        match kind {
            ResourceKind::Identity => (&self.identity, IDENTITY_FAMILY),
            ResourceKind::Instance => (&self.compute, COMPUTE_FAMILY),
            ResourceKind::Image => (&self.image, IMAGE_FAMILY),
            ResourceKind::Volume => (&self.block_storage, BLOCK_STORAGE_FAMILY),
            ResourceKind::FloatingIp => (&self.network, NETWORK_FAMILY),
            ResourceKind::Container => (&self.object_storage, OBJECT_STORAGE_FAMILY),
            ResourceKind::Quota => (&self.quota, QUOTA_FAMILY),
        }
    }

    fn set(&self, gauge: &GaugeVec, family: &str, labels: &[&str], value: f64) -> bool {
        match gauge.get_metric_with_label_values(labels) {
            Ok(metric) => {
                metric.set(value);
                true
            }
            Err(err) => {
                warn!(%family, error = %err, "metric update rejected");
                false
            }
        }
    }

    fn unknown(&self) -> String {
        self.messages.unknown().to_string()
    }

    fn invalid_id(&self, family: &str, field: &str, raw: &str) {
        warn!(
            %family,
            %field,
            "{}",
            self.messages.format("invalid_metric_id", &[&field, &format!("{raw:?}")])
        );
    }

    /// Stores a fact; blank identifiers are dropped instead of exported as `""`.
    pub fn apply_fact(&self, fact: &ResourceFact) -> bool {
        let (gauge, family) = self.family(fact.kind);
        let project = clean_label_value(&fact.tenant_name).unwrap_or_else(|| self.unknown());
        let Some(id) = clean_label_value(&fact.id) else {
            self.invalid_id(family, family, &fact.id);
            return false;
        };
        match fact.kind {
            ResourceKind::Instance => {
                let flavor = fact
                    .attribute(FLAVOR_ATTRIBUTE)
                    .and_then(clean_label_value)
                    .unwrap_or_else(|| self.unknown());
                self.set(
                    gauge,
                    family,
                    &[project.as_str(), id.as_str(), flavor.as_str()],
                    fact.value,
                )
            }
            _ => self.set(gauge, family, &[project.as_str(), id.as_str()], fact.value),
        }
    }

    pub fn apply_sample(&self, sample: &MetricSample) -> bool {
        let project =
            clean_label_value(&sample.tenant_name).unwrap_or_else(|| self.unknown());
        let (resource_id, metric_name) = match sample_labels(sample) {
            Ok(labels) => labels,
            Err((field, raw)) => {
                self.invalid_id(GNOCCHI_FAMILY, field, raw);
                return false;
            }
        };
        if !sample.value.is_finite() {
            return false;
        }
        self.set(
            &self.gnocchi,
            GNOCCHI_FAMILY,
            &[project.as_str(), resource_id.as_str(), metric_name.as_str()],
            sample.value,
        )
    }

    pub fn record_errors(&self, count: usize) {
        self.errors.inc_by(count as u64);
    }

    pub fn error_count(&self) -> u64 {
        self.errors.get()
    }

    pub fn observe_scrape(&self, elapsed: Duration) {
        self.scrape_duration.observe(elapsed.as_secs_f64());
    }

    pub fn refresh_uptime(&self) {
        self.uptime.set(self.started.elapsed().as_secs_f64());
    }

    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }

    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .context("failed to encode metrics")?;
        String::from_utf8(buffer).context("metrics output is not valid UTF-8")
    }

    /// Current value of every gauge series, keyed `family{label="value",...}`.
    pub fn snapshot(&self) -> BTreeMap<String, f64> {
        let mut out = BTreeMap::new();
        for family in self.registry.gather() {
            if family.get_field_type() != MetricType::GAUGE {
                continue;
            }
            for metric in family.get_metric() {
                let labels = metric
                    .get_label()
                    .iter()
                    .map(|pair| format!("{}=\"{}\"", pair.get_name(), pair.get_value()))
                    .collect::<Vec<_>>()
                    .join(",");
                let key = if labels.is_empty() {
                    family.get_name().to_string()
                } else {
                    format!("{}{{{labels}}}", family.get_name())
                };
                out.insert(key, metric.get_gauge().get_value());
            }
        }
        out
    }
}

/// Resource id and metric name of a sample, or the blank field that rules it out.
fn sample_labels(sample: &MetricSample) -> Result<(String, String), (&'static str, &str)> {
    let resource_id = clean_label_value(&sample.resource_id)
        .ok_or(("resource_id", sample.resource_id.as_str()))?;
    let metric_name = clean_label_value(&sample.metric_name)
        .ok_or(("metric_name", sample.metric_name.as_str()))?;
    Ok((resource_id, metric_name))
}
