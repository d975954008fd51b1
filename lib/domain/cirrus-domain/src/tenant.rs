use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::session::SessionKey;

/// Tenants keyed by their configuration index.
pub type TenantSet = BTreeMap<u32, TenantConfig>;

/// One configured project/credential/region combination.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantConfig {
    pub index: u32,
    pub project_name: String,
    pub username: String,
    pub password: String,
    pub auth_url: String,
    pub user_domain: String,
    pub project_domain: String,
    pub project_id: String,
    pub region: String,
}

impl TenantConfig {
    pub fn session_key(&self) -> SessionKey {
        SessionKey {
            auth_url: self.auth_url.clone(),
            project_name: self.project_name.clone(),
            username: self.username.clone(),
            user_domain: self.user_domain.clone(),
            project_domain: self.project_domain.clone(),
            region: self.region.clone(),
        }
    }

    /// Name used in labels and logs; `unknown` stands in for a blank project name.
    pub fn display_name(&self, unknown: &str) -> String {
        let trimmed = self.project_name.trim();
        if trimmed.is_empty() {
            unknown.to_string()
        } else {
            trimmed.to_string()
        }
    }

    pub fn project_id(&self) -> Option<&str> {
        let trimmed = self.project_id.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}

impl fmt::Debug for TenantConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantConfig")
            .field("index", &self.index)
            .field("project_name", &self.project_name)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("auth_url", &self.auth_url)
            .field("user_domain", &self.user_domain)
            .field("project_domain", &self.project_domain)
            .field("project_id", &self.project_id)
            .field("region", &self.region)
            .finish()
    }
}
