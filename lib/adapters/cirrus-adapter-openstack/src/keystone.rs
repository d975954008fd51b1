use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::debug;

use cirrus_domain::{ExporterError, Session, TenantConfig};
use cirrus_ports::SessionPort;

use crate::http::{SUBJECT_TOKEN_HEADER, describe_failure, versioned};
use crate::wire::TokenEnvelope;

/// Keystone v3 password authentication.
#[derive(Debug, Clone)]
pub struct KeystoneAuthenticator {
    client: Client,
}

impl KeystoneAuthenticator {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn auth_failure(tenant: &TenantConfig, reason: impl Into<String>) -> anyhow::Error {
    ExporterError::Authentication {
        tenant: tenant.project_name.clone(),
        reason: reason.into(),
    }
    .into()
}

pub(crate) fn password_auth_body(tenant: &TenantConfig) -> Value {
    let scope = if !tenant.project_name.trim().is_empty() {
        json!({
            "project": {
                "name": tenant.project_name,
                "domain": { "name": tenant.project_domain },
            }
        })
    } else {
        json!({ "project": { "id": tenant.project_id } })
    };
    json!({
        "auth": {
            "identity": {
                "methods": ["password"],
                "password": {
                    "user": {
                        "name": tenant.username,
                        "domain": { "name": tenant.user_domain },
                        "password": tenant.password,
                    }
                }
            },
            "scope": scope,
        }
    })
}

#[async_trait]
impl SessionPort for KeystoneAuthenticator {
    async fn authenticate(&self, tenant: &TenantConfig) -> Result<Session> {
        if tenant.auth_url.trim().is_empty() {
            return Err(auth_failure(tenant, "auth_url is not configured"));
        }
        let url = format!("{}/auth/tokens", versioned(&tenant.auth_url, "v3"));
        debug!(tenant = %tenant.project_name, %url, "requesting token");

        let response = self
            .client
            .post(&url)
            .json(&password_auth_body(tenant))
            .send()
            .await
            .with_context(|| format!("POST {url}"))?;
        if !response.status().is_success() {
            return Err(auth_failure(tenant, describe_failure(response).await));
        }

        let token = response
            .headers()
            .get(SUBJECT_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        let Some(token) = token else {
            return Err(auth_failure(tenant, "token not retrieved"));
        };

        let envelope: TokenEnvelope = response
            .json()
            .await
            .context("failed to decode token response")?;
        Ok(envelope.into_session(token, &tenant.region))
    }
}
