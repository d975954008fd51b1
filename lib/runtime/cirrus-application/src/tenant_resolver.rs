//! Builds the tenant set from `OS_<FIELD>_PROJECT<N>` environment variables.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info, warn};

use cirrus_domain::{MessageCatalog, TenantConfig, TenantSet};

const PREFIX: &str = "OS_";
const INDEX_MARKER: &str = "_PROJECT";
const REGION_VAR: &str = "OS_REGION_NAME";

/// Unsuffixed variables read when no indexed tenant is configured.
const SINGLE_TENANT_FIELDS: [&str; 6] = [
    "username",
    "password",
    "project_name",
    "auth_url",
    "user_domain_name",
    "project_domain_name",
];

/// Resolves tenants from the process environment.
pub fn resolve_from_env(messages: &MessageCatalog) -> TenantSet {
    resolve_tenants(std::env::vars(), messages)
}

/// Splits `OS_<FIELD>_PROJECT<N>` into the lower-cased field and the index.
fn parse_indexed(key: &str) -> Option<(String, u32)> {
    let rest = key.strip_prefix(PREFIX)?;
    let (field, index) = rest.rsplit_once(INDEX_MARKER)?;
    if field.is_empty() || index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((field.to_ascii_lowercase(), index.parse().ok()?))
}

pub fn resolve_tenants<I>(vars: I, messages: &MessageCatalog) -> TenantSet
where
    I: IntoIterator<Item = (String, String)>,
{
    let vars: HashMap<String, String> = vars.into_iter().collect();
    let shared_region = vars.get(REGION_VAR).cloned().unwrap_or_default();

    let mut grouped: BTreeMap<u32, HashMap<String, String>> = BTreeMap::new();
    for (key, value) in &vars {
        if let Some((field, index)) = parse_indexed(key) {
            grouped.entry(index).or_default().insert(field, value.clone());
        }
    }

    if grouped.is_empty() {
        return single_tenant(&vars, shared_region, messages);
    }

    let tenants: TenantSet = grouped
        .into_iter()
        .map(|(index, mut fields)| {
            let region = fields
                .remove("region_name")
                .unwrap_or_else(|| shared_region.clone());
            (index, build_tenant(index, fields, &region, messages))
        })
        .collect();
    info!("{}", messages.format("projects_detected", &[&tenants.len()]));
    tenants
}

fn single_tenant(
    vars: &HashMap<String, String>,
    region: String,
    messages: &MessageCatalog,
) -> TenantSet {
    let mut fields = HashMap::new();
    for field in SINGLE_TENANT_FIELDS {
        let key = format!("{PREFIX}{}", field.to_ascii_uppercase());
        match vars.get(&key) {
            Some(value) => {
                fields.insert(field.to_string(), value.clone());
            }
            None => warn!("{}", messages.format("missing_env_var", &[&key])),
        }
    }
    if fields.is_empty() {
        warn!("{}", messages.get("no_project_vars"));
        return TenantSet::new();
    }
    if let Some(project_id) = vars.get("OS_PROJECT_ID") {
        fields.insert("project_id".to_string(), project_id.clone());
    }
    info!("{}", messages.get("single_project"));
    TenantSet::from([(1, build_tenant(1, fields, &region, messages))])
}

fn build_tenant(
    index: u32,
    mut fields: HashMap<String, String>,
    region: &str,
    messages: &MessageCatalog,
) -> TenantConfig {
    let mut take = |name: &str| fields.remove(name).unwrap_or_default();
    let tenant = TenantConfig {
        index,
        project_name: take("project_name"),
        username: take("username"),
        password: take("password"),
        auth_url: take("auth_url"),
        user_domain: take("user_domain_name"),
        project_domain: take("project_domain_name"),
        project_id: take("project_id"),
        region: region.trim().to_ascii_lowercase(),
    };
    for field in fields.keys() {
        debug!(tenant_index = index, "{}", messages.format("unknown_env_field", &[field]));
    }
    tenant
}
