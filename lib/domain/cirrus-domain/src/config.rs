use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::ExporterError;
use crate::messages::Language;

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_TENANT_CONCURRENCY: usize = 5;
pub const DEFAULT_RESOURCE_CONCURRENCY: usize = 10;
pub const DEFAULT_LOOKBACK_SECS: u64 = 300;
pub const DEFAULT_SCRAPE_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeSeriesConfig {
    /// Resource type listed from the time-series backend.
    pub resource_kind: String,
    /// Region name (lower-case) to time-series base URL.
    pub region_endpoints: BTreeMap<String, String>,
    /// Used when neither the table nor the service catalog knows the region.
    pub default_endpoint: Option<String>,
}

impl Default for TimeSeriesConfig {
    fn default() -> Self {
        Self {
            resource_kind: "instance".to_string(),
            region_endpoints: BTreeMap::from([
                (
                    "dc3-a".to_string(),
                    "https://api.pub1.infomaniak.cloud/metric".to_string(),
                ),
                (
                    "dc4-a".to_string(),
                    "https://api.pub2.infomaniak.cloud/metric".to_string(),
                ),
            ]),
            default_endpoint: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExporterConfig {
    pub listen_addr: String,
    pub tenant_concurrency: usize,
    pub resource_concurrency: usize,
    pub lookback_secs: u64,
    pub scrape_timeout_secs: u64,
    pub http_timeout_secs: u64,
    pub language: Option<String>,
    pub timeseries: TimeSeriesConfig,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            tenant_concurrency: DEFAULT_TENANT_CONCURRENCY,
            resource_concurrency: DEFAULT_RESOURCE_CONCURRENCY,
            lookback_secs: DEFAULT_LOOKBACK_SECS,
            scrape_timeout_secs: DEFAULT_SCRAPE_TIMEOUT_SECS,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            language: None,
            timeseries: TimeSeriesConfig::default(),
        }
    }
}

impl ExporterConfig {
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&raw)
            .with_context(|| format!("failed to parse config at {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ExporterError> {
        if self.tenant_concurrency == 0 {
            return Err(ExporterError::Configuration(
                "tenant_concurrency must be at least 1".into(),
            ));
        }
        if self.resource_concurrency == 0 {
            return Err(ExporterError::Configuration(
                "resource_concurrency must be at least 1".into(),
            ));
        }
        if self.scrape_timeout_secs == 0 {
            return Err(ExporterError::Configuration(
                "scrape_timeout_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn lookback(&self) -> Duration {
        Duration::from_secs(self.lookback_secs)
    }

    pub fn scrape_timeout(&self) -> Duration {
        Duration::from_secs(self.scrape_timeout_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

/// Path of the toolbox preferences file holding the `language` key.
pub fn toolbox_config_path(home: &Path) -> PathBuf {
    home.join(".config")
        .join("openstack-toolbox")
        .join("config.json")
}

/// Explicit choice first, then the toolbox preferences file, then French.
pub fn resolve_language(explicit: Option<&str>, toolbox_config: Option<&Path>) -> Language {
    if let Some(language) = explicit.and_then(|raw| raw.parse().ok()) {
        return language;
    }
    toolbox_config
        .and_then(|path| std::fs::read_to_string(path).ok())
        .and_then(|raw| serde_json::from_str::<serde_json::Value>(&raw).ok())
        .and_then(|value| {
            value
                .get("language")
                .and_then(|language| language.as_str())
                .and_then(|language| language.parse().ok())
        })
        .unwrap_or_default()
}
