//! Local HTTP stand-in for the OpenStack APIs.

use axum::Router;
use axum::http::{HeaderMap, StatusCode};
use reqwest::Client;
use tokio::net::TcpListener;

use cirrus_domain::{CatalogEndpoint, CatalogEntry, Session};

pub const TOKEN: &str = "token-alpha";
pub const REGION: &str = "dc3-a";

/// Serves `router` on an ephemeral port and returns its base URL.
pub async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

pub fn client() -> Client {
    Client::builder().no_proxy().build().unwrap()
}

/// Session whose catalog points each `(service_type, path)` below `base`.
pub fn session(base: &str, services: &[(&str, &str)]) -> Session {
    let catalog = services
        .iter()
        .map(|(service_type, path)| CatalogEntry {
            service_type: service_type.to_string(),
            name: service_type.to_string(),
            endpoints: vec![CatalogEndpoint {
                interface: "public".into(),
                region: REGION.into(),
                url: format!("{base}/{path}"),
            }],
        })
        .collect();
    Session::new(TOKEN, REGION).with_catalog(catalog)
}

/// `401` unless the request carries the session token.
pub fn authorized(headers: &HeaderMap) -> Result<(), StatusCode> {
    match headers.get("x-auth-token").and_then(|value| value.to_str().ok()) {
        Some(TOKEN) => Ok(()),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}
