use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use cirrus::cli::Args;
use cirrus::http::router;
use cirrus::telemetry::init_tracing;
use cirrus_adapter_openstack::{
    GnocchiConnector, KeystoneAuthenticator, OpenStackInventory, build_client,
};
use cirrus_application::{Exporter, resolve_from_env};
use cirrus_domain::{MessageCatalog, resolve_language, toolbox_config_path};
use cirrus_ports::PortSet;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init_tracing(&args.log_level, args.log_format)?;

    let config = args.exporter_config()?;
    let toolbox_config = std::env::var_os("HOME").map(|home| toolbox_config_path(&PathBuf::from(home)));
    let language = resolve_language(config.language.as_deref(), toolbox_config.as_deref());
    let messages = Arc::new(MessageCatalog::load(language)?);

    let tenants = resolve_from_env(&messages);
    let client = build_client(config.http_timeout())?;
    let ports = PortSet::new(
        Arc::new(KeystoneAuthenticator::new(client.clone())),
        Arc::new(OpenStackInventory::new(client.clone())),
        Arc::new(GnocchiConnector::new(
            client,
            config.timeseries.clone(),
            Arc::clone(&messages),
        )),
    );
    let exporter = Arc::new(Exporter::new(&config, tenants, ports, Arc::clone(&messages))?);

    let listener = TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    info!("{}", messages.format("exporter_started", &[&config.listen_addr]));

    axum::serve(listener, router(exporter))
        .with_graceful_shutdown(wait_for_shutdown_signal())
        .await
        .context("metrics server failed")?;
    info!("{}", messages.get("manual_stop"));
    Ok(())
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let (Ok(mut sigterm), Ok(mut sigint)) = (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) else {
            let _ = tokio::signal::ctrl_c().await;
            return;
        };
        tokio::select! {
            _ = sigterm.recv() => {}
            _ = sigint.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
