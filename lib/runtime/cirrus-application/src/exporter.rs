use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::sync::Mutex;
use tracing::{info, warn};

use cirrus_domain::{ExporterConfig, MessageCatalog, TenantSet};
use cirrus_ports::PortSet;

use crate::metric_set::MetricSet;
use crate::orchestrator::{Orchestrator, RunState, ScrapeReport};

#[derive(Debug, Clone, PartialEq)]
pub enum ScrapeOutcome {
    Completed { body: String, report: ScrapeReport },
    TimedOut { after: Duration },
}

/// Long-lived exporter state: one metric set, one orchestrator, one scrape at a time.
pub struct Exporter {
    orchestrator: Orchestrator,
    metrics: Arc<MetricSet>,
    messages: Arc<MessageCatalog>,
    scrape_timeout: Duration,
    scrape_lock: Mutex<()>,
}

impl Exporter {
    pub fn new(
        config: &ExporterConfig,
        tenants: TenantSet,
        ports: PortSet,
        messages: Arc<MessageCatalog>,
    ) -> Result<Self> {
        config.validate()?;
        let metrics = Arc::new(MetricSet::new(&messages)?);
        let orchestrator = Orchestrator::new(
            config,
            tenants,
            ports,
            Arc::clone(&metrics),
            Arc::clone(&messages),
        );
        Ok(Self {
            orchestrator,
            metrics,
            messages,
            scrape_timeout: config.scrape_timeout(),
            scrape_lock: Mutex::new(()),
        })
    }

    pub fn metrics(&self) -> &MetricSet {
        &self.metrics
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn state(&self) -> RunState {
        self.orchestrator.state()
    }

    pub fn content_type(&self) -> String {
        self.metrics.content_type()
    }

    /// Runs a full collection and renders the metric set.
    ///
    /// Concurrent callers queue on the scrape lock. A collection exceeding the
    /// scrape timeout is abandoned and counted as one error on top of the
    /// errors its tenants already recorded.
    pub async fn scrape(&self) -> Result<ScrapeOutcome> {
        let _guard = self.scrape_lock.lock().await;
        let started = Instant::now();
        let result = tokio::time::timeout(self.scrape_timeout, self.orchestrator.run()).await;
        let elapsed = started.elapsed();
        self.metrics.observe_scrape(elapsed);
        self.metrics.refresh_uptime();

        match result {
            Ok(report) => {
                info!(
                    "{}",
                    self.messages.format(
                        "scrape_completed",
                        &[&report.tenants, &report.errors.len(), &elapsed.as_millis()]
                    )
                );
                let body = self.metrics.render()?;
                Ok(ScrapeOutcome::Completed { body, report })
            }
            Err(_) => {
                self.orchestrator.finish();
                self.metrics.record_errors(1);
                warn!(
                    "{}",
                    self.messages
                        .format("scrape_timeout", &[&self.scrape_timeout.as_secs()])
                );
                Ok(ScrapeOutcome::TimedOut {
                    after: self.scrape_timeout,
                })
            }
        }
    }
}
