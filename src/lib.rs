pub mod cli;
pub mod core;
pub mod providers;

use crate::core::RateAggregator;
use crate::core::config::{AppConfig, DEFAULT_BASE_URL};
use crate::providers::ExchangeRateHostProvider;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub enum AppCommand {
    Rates { base_currency: Option<String> },
}

/// Wires the configured rate provider into an aggregation engine.
pub fn build_aggregator(config: &AppConfig) -> RateAggregator {
    let provider = match &config.providers.exchangerate_host {
        Some(p) => {
            ExchangeRateHostProvider::new(&p.base_url, &p.access_key, &config.secondary_currency)
                .with_timeout(Duration::from_secs(p.timeout_secs))
        }
        None => ExchangeRateHostProvider::new(DEFAULT_BASE_URL, "", &config.secondary_currency),
    };
    if config
        .providers
        .exchangerate_host
        .as_ref()
        .is_none_or(|p| p.access_key.is_empty())
    {
        warn!("No access key configured, upstream requests will likely be rejected");
    }

    let provider = Arc::new(provider);
    RateAggregator::new(provider.clone(), provider).with_max_concurrency(config.max_concurrency)
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("fxrates starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let aggregator = build_aggregator(&config);

    match command {
        AppCommand::Rates { base_currency } => {
            let base = base_currency
                .as_deref()
                .unwrap_or(&config.base_currency)
                .to_ascii_uppercase();
            cli::rates::run(&aggregator, &base).await
        }
    }
}
