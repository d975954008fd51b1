use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tracing::error;

use cirrus_application::{Exporter, ScrapeOutcome};

pub fn router(exporter: Arc<Exporter>) -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .route("/healthz", get(healthz))
        .with_state(exporter)
}

/// Runs a full collection for every request; the response is the fresh metric set.
async fn metrics(State(exporter): State<Arc<Exporter>>) -> Response {
    match exporter.scrape().await {
        Ok(ScrapeOutcome::Completed { body, .. }) => {
            ([(header::CONTENT_TYPE, exporter.content_type())], body).into_response()
        }
        Ok(ScrapeOutcome::TimedOut { after }) => (
            StatusCode::SERVICE_UNAVAILABLE,
            format!("scrape timed out after {}s\n", after.as_secs()),
        )
            .into_response(),
        Err(err) => {
            error!(error = %format!("{err:#}"), "failed to render metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to render metrics\n".to_string(),
            )
                .into_response()
        }
    }
}

async fn healthz() -> &'static str {
    "ok"
}
