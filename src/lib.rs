//! Prometheus exporter for multi-tenant OpenStack inventory, quotas and Gnocchi metrics.

pub mod cli;
pub mod http;
pub mod telemetry;

pub use cirrus_application::{Exporter, ScrapeOutcome};
pub use cirrus_domain::{ExporterConfig, MessageCatalog};
