use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Quota values by resource name. `None` is an unset limit.
pub type QuotaSet = BTreeMap<String, Option<f64>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaService {
    Compute,
    Identity,
}

impl fmt::Display for QuotaService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compute => f.write_str("compute"),
            Self::Identity => f.write_str("identity"),
        }
    }
}

/// Services probed for quotas, first responder wins.
pub const QUOTA_PROBE_ORDER: [QuotaService; 2] = [QuotaService::Compute, QuotaService::Identity];

pub const ALLOWED_QUOTAS: [&str; 10] = [
    "cores",
    "ram",
    "instances",
    "injected_file_content_bytes",
    "injected_file_path_bytes",
    "injected_files",
    "key_pairs",
    "metadata_items",
    "server_group_members",
    "server_groups",
];

/// Splits a quota set into allow-listed limits and ignored entries.
///
/// Unset limits on allowed keys are reported as `0`.
pub fn retain_allowed(quotas: QuotaSet) -> (BTreeMap<String, f64>, Vec<(String, Option<f64>)>) {
    let mut kept = BTreeMap::new();
    let mut ignored = Vec::new();
    for (resource, value) in quotas {
        if ALLOWED_QUOTAS.contains(&resource.as_str()) {
            kept.insert(resource, value.unwrap_or(0.0));
        } else {
            ignored.push((resource, value));
        }
    }
    (kept, ignored)
}
