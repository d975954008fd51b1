use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExporterError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("authentication failed for {tenant}: {reason}")]
    Authentication { tenant: String, reason: String },
    #[error("{phase} fetch failed: {reason}")]
    ResourceFetch {
        phase: CollectionPhase,
        reason: String,
    },
    #[error("time-series request failed: {0}")]
    TimeSeries(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionPhase {
    Connect,
    Identity,
    Compute,
    Storage,
    Network,
    Quota,
    TimeSeries,
}

impl CollectionPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Identity => "identity",
            Self::Compute => "compute",
            Self::Storage => "storage",
            Self::Network => "network",
            Self::Quota => "quota",
            Self::TimeSeries => "timeseries",
        }
    }
}

impl fmt::Display for CollectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure caught during collection. Logged and counted, never propagated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionError {
    pub tenant: String,
    pub phase: CollectionPhase,
    pub cause: String,
}

impl CollectionError {
    pub fn new(tenant: impl Into<String>, phase: CollectionPhase, cause: impl fmt::Display) -> Self {
        Self {
            tenant: tenant.into(),
            phase,
            cause: cause.to_string(),
        }
    }

    /// Builds the record from an `anyhow` chain, keeping every context layer.
    pub fn from_error(
        tenant: impl Into<String>,
        phase: CollectionPhase,
        err: &anyhow::Error,
    ) -> Self {
        Self::new(tenant, phase, format!("{err:#}"))
    }
}

impl fmt::Display for CollectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.tenant, self.phase, self.cause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_error_keeps_context_chain() {
        let err = anyhow::anyhow!("connection refused").context("listing servers");
        let record = CollectionError::from_error("alpha", CollectionPhase::Compute, &err);
        assert_eq!(record.cause, "listing servers: connection refused");
        assert_eq!(
            record.to_string(),
            "[alpha] compute: listing servers: connection refused"
        );
    }

    #[test]
    fn phases_render_lowercase() {
        assert_eq!(CollectionPhase::TimeSeries.to_string(), "timeseries");
        assert_eq!(
            ExporterError::ResourceFetch {
                phase: CollectionPhase::Network,
                reason: "503".into()
            }
            .to_string(),
            "network fetch failed: 503"
        );
    }
}
