//! JSON payloads of the OpenStack APIs, decoded leniently.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use cirrus_domain::{CatalogEndpoint, CatalogEntry, Measure, QuotaSet, Server, Session};

#[derive(Debug, Deserialize)]
pub(crate) struct TokenEnvelope {
    pub token: TokenBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenBody {
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub project: Option<IdOnly>,
    #[serde(default)]
    pub catalog: Vec<WireCatalogEntry>,
}

impl TokenEnvelope {
    pub fn into_session(self, token: String, region: &str) -> Session {
        let body = self.token;
        let mut session = Session::new(token, region)
            .with_catalog(body.catalog.into_iter().map(CatalogEntry::from).collect());
        if let Some(project_id) = body.project.and_then(|project| project.id) {
            session = session.with_project_id(project_id);
        }
        if let Some(expires_at) = body.expires_at {
            session = session.with_expiry(expires_at);
        }
        session
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireCatalogEntry {
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub endpoints: Vec<WireEndpoint>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireEndpoint {
    pub interface: String,
    #[serde(default)]
    pub region_id: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    pub url: String,
}

impl From<WireCatalogEntry> for CatalogEntry {
    fn from(entry: WireCatalogEntry) -> Self {
        Self {
            service_type: entry.service_type,
            name: entry.name,
            endpoints: entry
                .endpoints
                .into_iter()
                .map(|endpoint| CatalogEndpoint {
                    interface: endpoint.interface,
                    region: endpoint.region_id.or(endpoint.region).unwrap_or_default(),
                    url: endpoint.url,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct IdOnly {
    #[serde(default)]
    pub id: Option<String>,
}

impl IdOnly {
    pub fn into_id(self) -> String {
        self.id.unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProjectEnvelope {
    pub project: IdOnly,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ServersEnvelope {
    #[serde(default)]
    pub servers: Vec<WireServer>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireServer {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub flavor: Option<Value>,
    #[serde(default)]
    pub image: Option<Value>,
}

impl From<WireServer> for Server {
    fn from(server: WireServer) -> Self {
        // Microversions >= 2.47 embed the flavor without an id.
        let flavor_id = server.flavor.as_ref().and_then(|flavor| {
            string_field(flavor, "id").or_else(|| string_field(flavor, "original_name"))
        });
        // Boot-from-volume servers report `"image": ""`.
        let image_id = server
            .image
            .as_ref()
            .and_then(|image| string_field(image, "id"));
        Self {
            id: server.id.unwrap_or_default(),
            flavor_id,
            image_id,
        }
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ImagesEnvelope {
    #[serde(default)]
    pub images: Vec<IdOnly>,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct VolumesEnvelope {
    #[serde(default)]
    pub volumes: Vec<IdOnly>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct FloatingIpsEnvelope {
    #[serde(default)]
    pub floatingips: Vec<IdOnly>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContainerEntry {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QuotaSetEnvelope {
    pub quota_set: serde_json::Map<String, Value>,
}

impl QuotaSetEnvelope {
    /// Numeric entries become limits, `null` an unset limit; other values (the `id` echo) are skipped.
    pub fn into_quota_set(self) -> QuotaSet {
        self.quota_set
            .into_iter()
            .filter_map(|(resource, value)| match value {
                Value::Number(number) => Some((resource, number.as_f64())),
                Value::Null => Some((resource, None)),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct LimitsEnvelope {
    #[serde(default)]
    pub limits: Vec<WireLimit>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireLimit {
    pub resource_name: String,
    #[serde(default)]
    pub resource_limit: Option<f64>,
}

impl LimitsEnvelope {
    pub fn into_quota_set(self) -> QuotaSet {
        self.limits
            .into_iter()
            .map(|limit| (limit.resource_name, limit.resource_limit))
            .collect()
    }
}

/// Gnocchi measure row: `[timestamp, granularity, value]`.
#[derive(Debug, Deserialize)]
pub(crate) struct MeasureRow(pub DateTime<Utc>, pub f64, pub Option<f64>);

impl MeasureRow {
    pub fn into_measure(self) -> Option<Measure> {
        let MeasureRow(timestamp, granularity, value) = self;
        value.map(|value| Measure::new(timestamp, value, granularity))
    }
}
