//! Listing Harvester - price-partitioned crawler for product listing pages
//!
//! Sweeps a category listing as a sequence of price windows, extracts every
//! listing card into a flat record and appends each page's batch to a CSV
//! file, cycle after cycle.

// Module declarations
pub mod application;
pub mod domain;
pub mod infrastructure;

#[cfg(test)]
mod test_utils;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::application::{CrawlController, CrawlPlan, RunMode};
use crate::domain::ObserverSet;
use crate::infrastructure::{
    AntiBotGuard, AppConfig, ConfigManager, CrawlStats, CsvSink, EventLog, HttpPageFetcher, RecordExtractor,
    init_logging, log_system_info,
};

/// Load configuration, set up logging and run the harvester until it stops.
///
/// Configuration problems surface as errors before anything is crawled.
pub async fn run() -> Result<()> {
    let config_manager = ConfigManager::from_env();
    let config = config_manager
        .load_config()
        .with_context(|| format!("Failed to load configuration from {:?}", config_manager.config_path()))?;

    let _logging_guard = init_logging(&config.logging)?;
    log_system_info();
    info!("Configuration file: {:?}", config_manager.config_path());
    debug!("Effective configuration: {}", serde_json::to_string(&config)?);

    let mode = RunMode::from_env();
    harvest(&config, mode).await.inspect_err(|e| error!("Fatal error: {:#}", e))
}

async fn harvest(config: &AppConfig, mode: RunMode) -> Result<()> {
    let plan = CrawlPlan::from_config(config, mode)?;
    info!(
        "Run mode {:?}: {} price ranges, writing to {:?}",
        plan.mode,
        plan.ranges.len(),
        plan.destination
    );

    let fetcher = HttpPageFetcher::new(&config.fetch).context("Failed to create HTTP client")?;
    let sink = CsvSink::from_config(&config.output, &plan.destination);
    let extractor = RecordExtractor::new(&config.selectors, &config.site.base_url)?;
    let guard = AntiBotGuard::from_config(&config.guard);

    let stats = Arc::new(CrawlStats::new());
    let observers = ObserverSet::new()
        .with(Arc::new(EventLog::new(Duration::from_millis(
            config.fetch.slow_request_threshold_ms,
        ))))
        .with(stats.clone());

    let mut controller =
        CrawlController::new(plan, config.site.clone(), fetcher, sink, extractor, guard).with_observers(observers);

    let cancel = controller.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping at the next wait point");
            cancel.cancel();
        }
    });

    controller
        .run()
        .await
        .context("Failed to initialize output destination")?;

    info!("Harvester stopped: {:?}", stats.snapshot());
    Ok(())
}
