use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};

use cirrus_domain::ExporterConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Command-line flags. Each flag falls back to its `CIRRUS_*` variable, then
/// to the YAML file given with `--config`, then to the built-in default.
#[derive(Debug, Clone, Parser)]
#[command(name = "cirrus-exporter", version, about = "OpenStack metrics exporter")]
pub struct Args {
    #[arg(long, env = "CIRRUS_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "CIRRUS_LISTEN_ADDR")]
    pub listen_addr: Option<String>,

    #[arg(long, env = "CIRRUS_TENANT_CONCURRENCY")]
    pub tenant_concurrency: Option<usize>,

    #[arg(long, env = "CIRRUS_RESOURCE_CONCURRENCY")]
    pub resource_concurrency: Option<usize>,

    /// Time-series lookback window in seconds.
    #[arg(long, env = "CIRRUS_LOOKBACK_SECS")]
    pub lookback_secs: Option<u64>,

    #[arg(long, env = "CIRRUS_SCRAPE_TIMEOUT_SECS")]
    pub scrape_timeout_secs: Option<u64>,

    #[arg(long, env = "CIRRUS_HTTP_TIMEOUT_SECS")]
    pub http_timeout_secs: Option<u64>,

    /// Message language (`en` or `fr`).
    #[arg(long, env = "CIRRUS_LANGUAGE")]
    pub language: Option<String>,

    #[arg(long, env = "CIRRUS_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(long, env = "CIRRUS_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Args {
    /// Merges flags over the optional config file and validates the result.
    pub fn exporter_config(&self) -> Result<ExporterConfig> {
        let mut config = match &self.config {
            Some(path) => ExporterConfig::load_from_path(path)?,
            None => ExporterConfig::default(),
        };
        if let Some(listen_addr) = &self.listen_addr {
            config.listen_addr = listen_addr.clone();
        }
        if let Some(value) = self.tenant_concurrency {
            config.tenant_concurrency = value;
        }
        if let Some(value) = self.resource_concurrency {
            config.resource_concurrency = value;
        }
        if let Some(value) = self.lookback_secs {
            config.lookback_secs = value;
        }
        if let Some(value) = self.scrape_timeout_secs {
            config.scrape_timeout_secs = value;
        }
        if let Some(value) = self.http_timeout_secs {
            config.http_timeout_secs = value;
        }
        if self.language.is_some() {
            config.language = self.language.clone();
        }
        config.validate()?;
        Ok(config)
    }
}
