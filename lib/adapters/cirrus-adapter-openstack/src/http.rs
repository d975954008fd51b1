use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Response};

pub(crate) const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";
pub(crate) const SUBJECT_TOKEN_HEADER: &str = "X-Subject-Token";

const MAX_ERROR_BODY: usize = 256;

/// Shared HTTP client. The per-request timeout is the only bound on a hung API call.
pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("cirrus-exporter/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")
}

/// Appends `/{version}` unless the base URL already ends with it.
pub(crate) fn versioned(base: &str, version: &str) -> String {
    let base = base.trim().trim_end_matches('/');
    let suffix = format!("/{version}");
    if base.ends_with(&suffix) {
        base.to_string()
    } else {
        format!("{base}{suffix}")
    }
}

/// Strips a trailing `/{version}` segment.
pub(crate) fn unversioned(base: &str, version: &str) -> String {
    let base = base.trim().trim_end_matches('/');
    base.strip_suffix(&format!("/{version}"))
        .unwrap_or(base)
        .to_string()
}

pub(crate) fn join(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim().trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Status line plus a bounded slice of the body, for logs and error causes.
pub(crate) async fn describe_failure(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let mut body = body.trim().to_string();
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
        body.push_str("...");
    }
    format!("{status} {body}").trim_end().to_string()
}
