use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Identity,
    Instance,
    Image,
    Volume,
    FloatingIp,
    Container,
    Quota,
}

/// A compute instance as reported by the inventory API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub flavor_id: Option<String>,
    #[serde(default)]
    pub image_id: Option<String>,
}

/// One inventory observation for a tenant, produced fresh on every scrape.
///
/// `id` is kept raw; blank identifiers are filtered out when folded into the metric set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceFact {
    pub kind: ResourceKind,
    pub id: String,
    pub tenant_name: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    pub value: f64,
}

impl ResourceFact {
    /// Presence fact: the resource exists, value `1`.
    pub fn present(kind: ResourceKind, tenant_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            tenant_name: tenant_name.into(),
            attributes: BTreeMap::new(),
            value: 1.0,
        }
    }

    pub fn quota(tenant_name: impl Into<String>, resource: impl Into<String>, limit: f64) -> Self {
        Self {
            kind: ResourceKind::Quota,
            id: resource.into(),
            tenant_name: tenant_name.into(),
            attributes: BTreeMap::new(),
            value: limit,
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}
