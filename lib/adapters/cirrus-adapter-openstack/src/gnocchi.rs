use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::ACCEPT;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};

use cirrus_domain::{
    ExporterError, Measure, MessageCatalog, MetricRef, ResourceRef, Session, TimeSeriesConfig,
};
use cirrus_ports::{TimeSeriesConnector, TimeSeriesPort};

use crate::http::{AUTH_TOKEN_HEADER, describe_failure, join};
use crate::wire::MeasureRow;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S+00:00";
const METRIC_SERVICE_TYPE: &str = "metric";

/// Time-series base URL for a session's region.
///
/// Static table first, then the `metric` entry of the service catalog, then the configured default.
pub fn resolve_endpoint(config: &TimeSeriesConfig, session: &Session) -> Result<String, ExporterError> {
    let region = session.region().trim().to_ascii_lowercase();
    config
        .region_endpoints
        .get(&region)
        .map(String::as_str)
        .or_else(|| session.endpoint(METRIC_SERVICE_TYPE))
        .or(config.default_endpoint.as_deref())
        .map(|url| url.trim().trim_end_matches('/').to_string())
        .filter(|url| !url.is_empty())
        .ok_or_else(|| ExporterError::TimeSeries(format!("no endpoint for region '{region}'")))
}

/// Builds a [`GnocchiClient`] per session, sharing one HTTP client.
#[derive(Debug, Clone)]
pub struct GnocchiConnector {
    client: Client,
    config: TimeSeriesConfig,
    messages: Arc<MessageCatalog>,
}

impl GnocchiConnector {
    pub fn new(client: Client, config: TimeSeriesConfig, messages: Arc<MessageCatalog>) -> Self {
        Self {
            client,
            config,
            messages,
        }
    }
}

impl TimeSeriesConnector for GnocchiConnector {
    fn connect(&self, session: &Session) -> Result<Arc<dyn TimeSeriesPort>> {
        let base_url = resolve_endpoint(&self.config, session).inspect_err(|_| {
            error!(
                region = session.region(),
                "{}",
                self.messages.format("gnocchi_endpoint_error", &[&session.region()])
            );
        })?;
        debug!(region = session.region(), %base_url, "time-series endpoint resolved");
        Ok(Arc::new(GnocchiClient::new(
            self.client.clone(),
            base_url,
            session.token(),
            self.config.resource_kind.clone(),
            Arc::clone(&self.messages),
        )))
    }
}

/// Read-only Gnocchi REST client.
///
/// Non-success statuses are logged and read as empty results.
pub struct GnocchiClient {
    client: Client,
    base_url: String,
    token: String,
    resource_kind: String,
    messages: Arc<MessageCatalog>,
}

impl GnocchiClient {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        token: impl Into<String>,
        resource_kind: impl Into<String>,
        messages: Arc<MessageCatalog>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            token: token.into(),
            resource_kind: resource_kind.into(),
            messages,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Response> {
        let url = join(&self.base_url, path);
        self.client
            .get(&url)
            .header(AUTH_TOKEN_HEADER, &self.token)
            .header(ACCEPT, "application/json")
            .query(query)
            .send()
            .await
            .with_context(|| format!("GET {url}"))
    }

    async fn decode<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
        response
            .json::<T>()
            .await
            .with_context(|| format!("failed to decode {what}"))
    }
}

impl std::fmt::Debug for GnocchiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GnocchiClient")
            .field("base_url", &self.base_url)
            .field("resource_kind", &self.resource_kind)
            .finish_non_exhaustive()
    }
}

pub(crate) fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

#[async_trait]
impl TimeSeriesPort for GnocchiClient {
    async fn list_resources(&self, kind: &str) -> Result<Vec<ResourceRef>> {
        let response = self.get(&format!("v1/resource/{kind}"), &[]).await?;
        if !response.status().is_success() {
            let failure = describe_failure(response).await;
            error!("{}", self.messages.format("resources_error", &[&kind, &failure]));
            return Ok(Vec::new());
        }
        Self::decode(response, "resource listing").await
    }

    async fn list_metrics(&self, resource_id: &str) -> Result<Vec<MetricRef>> {
        let path = format!("v1/resource/{}/{resource_id}/metric", self.resource_kind);
        let response = self.get(&path, &[]).await?;
        if !response.status().is_success() {
            let failure = describe_failure(response).await;
            warn!(
                resource_id,
                "{}",
                self.messages
                    .format("metrics_resource_error", &[&resource_id, &failure])
            );
            return Ok(Vec::new());
        }
        Self::decode(response, "metric listing").await
    }

    async fn get_measures(
        &self,
        metric_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Measure>> {
        let query = [("start", format_timestamp(start)), ("stop", format_timestamp(end))];
        let response = self
            .get(&format!("v1/metric/{metric_id}/measures"), &query)
            .await?;
        if !response.status().is_success() {
            let failure = describe_failure(response).await;
            warn!(
                metric_id,
                "{}",
                self.messages.format("measures_error", &[&metric_id, &failure])
            );
            return Ok(Vec::new());
        }
        let rows: Vec<MeasureRow> = Self::decode(response, "measures").await?;
        Ok(rows.into_iter().filter_map(MeasureRow::into_measure).collect())
    }
}
