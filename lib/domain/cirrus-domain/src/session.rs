use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of an authenticated session. Tenants with equal keys share one session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionKey {
    pub auth_url: String,
    pub project_name: String,
    pub username: String,
    pub user_domain: String,
    pub project_domain: String,
    pub region: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEndpoint {
    pub interface: String,
    #[serde(default)]
    pub region: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub service_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub endpoints: Vec<CatalogEndpoint>,
}

/// Authenticated handle: token plus service catalog, bound to one region.
#[derive(Clone)]
pub struct Session {
    token: String,
    region: String,
    project_id: Option<String>,
    catalog: Vec<CatalogEntry>,
    expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(token: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            region: region.into(),
            project_id: None,
            catalog: Vec::new(),
            expires_at: None,
        }
    }

    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        let project_id = project_id.into();
        self.project_id = (!project_id.trim().is_empty()).then_some(project_id);
        self
    }

    pub fn with_catalog(mut self, catalog: Vec<CatalogEntry>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    pub fn catalog(&self) -> &[CatalogEntry] {
        &self.catalog
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    /// Public endpoint of `service_type` for this session's region.
    ///
    /// Endpoints without a region match any region; a region-specific match wins.
    pub fn endpoint(&self, service_type: &str) -> Option<&str> {
        let entry = self
            .catalog
            .iter()
            .find(|entry| entry.service_type.eq_ignore_ascii_case(service_type))?;
        let public = entry
            .endpoints
            .iter()
            .filter(|endpoint| endpoint.interface.eq_ignore_ascii_case("public"));

        let mut fallback = None;
        for endpoint in public {
            if endpoint.region.eq_ignore_ascii_case(&self.region) {
                return Some(endpoint.url.as_str());
            }
            if endpoint.region.is_empty() && fallback.is_none() {
                fallback = Some(endpoint.url.as_str());
            }
        }
        fallback
    }

    /// First endpoint found among `service_types`, in order.
    pub fn endpoint_any(&self, service_types: &[&str]) -> Option<&str> {
        service_types
            .iter()
            .find_map(|service_type| self.endpoint(service_type))
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("region", &self.region)
            .field("project_id", &self.project_id)
            .field("catalog_entries", &self.catalog.len())
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
