//! Domain models and invariants.

pub mod config;
pub mod error;
pub mod inventory;
pub mod labels;
pub mod messages;
pub mod quota;
pub mod session;
pub mod tenant;
pub mod timeseries;

pub use config::{ExporterConfig, TimeSeriesConfig, resolve_language, toolbox_config_path};
pub use error::{CollectionError, CollectionPhase, ExporterError};
pub use inventory::{ResourceFact, ResourceKind, Server};
pub use labels::clean_label_value;
pub use messages::{Language, MessageCatalog};
pub use quota::{ALLOWED_QUOTAS, QUOTA_PROBE_ORDER, QuotaService, QuotaSet, retain_allowed};
pub use session::{CatalogEndpoint, CatalogEntry, Session, SessionKey};
pub use tenant::{TenantConfig, TenantSet};
pub use timeseries::{Measure, MetricRef, MetricSample, ResourceRef, latest_measure};
