//! Scrape-time collection runtime: session cache, per-tenant collectors,
//! time-series aggregation and the exported metric set.

pub mod aggregator;
pub mod exporter;
pub mod metric_set;
pub mod orchestrator;
pub mod resource_collector;
pub mod session_cache;
pub mod tenant_resolver;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use aggregator::{Aggregation, TimeSeriesAggregator};
pub use exporter::{Exporter, ScrapeOutcome};
pub use metric_set::MetricSet;
pub use orchestrator::{Orchestrator, RunState, ScrapeReport};
pub use resource_collector::{ResourceCollector, TenantInventory};
pub use session_cache::SessionCache;
pub use tenant_resolver::{resolve_from_env, resolve_tenants};

#[cfg(test)]
mod resource_collector_test;
#[cfg(test)]
mod session_cache_test;
