//! Configuration infrastructure
//!
//! Contains configuration loading and validation for the listing harvester.
//!
//! Configuration is layered:
//! 1. Compiled-in defaults (`defaults` module below)
//! 2. Optional JSON file (`HARVESTER_CONFIG`, default `harvester.json`)
//! 3. Environment overrides (`HARVESTER__SECTION__KEY`)
//!
//! Everything is validated once at startup; a bad configuration is fatal.

#![allow(clippy::uninlined_format_args)]

use config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::domain::{PageRequest, PriceBand, PriceRange, PriceSchedule, ScheduleError};
use crate::infrastructure::parsing::config::ListingSelectors;
use crate::infrastructure::parsing::ExtractionError;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid price partition: {0}")]
    Partition(#[from] ScheduleError),

    #[error("invalid selector configuration: {0}")]
    Selectors(#[from] ExtractionError),

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub site: SiteConfig,
    pub partition: PartitionConfig,
    pub crawl: CrawlConfig,
    pub fetch: FetchConfig,
    pub guard: GuardConfig,
    pub selectors: ListingSelectors,
    pub output: OutputConfig,
    pub verify: VerifyConfig,
    pub logging: LoggingConfig,
}

/// Target site addressing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Base URL used to resolve relative listing links
    pub base_url: String,

    /// Category listing prefix; the price filter and offset are appended to it
    pub listing_prefix: String,
}

impl SiteConfig {
    /// Build the listing URL for one page of a price window.
    ///
    /// The first page carries no offset segment; later pages use `_Desde_{offset}`.
    pub fn listing_page_url(&self, request: &PageRequest) -> String {
        let range = request.range.query_label();
        if request.is_first_page() {
            format!("{}_PriceRange_{}_NoIndex_True", self.listing_prefix, range)
        } else {
            format!(
                "{}_PriceRange_{}_Desde_{}_NoIndex_True",
                self.listing_prefix, range, request.pagination_offset
            )
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: mercado_livre::BASE_URL.to_string(),
            listing_prefix: mercado_livre::SAMSUNG_SMARTPHONES_PREFIX.to_string(),
        }
    }
}

/// Piecewise price schedule: windows of `step` width up to each band's `upper`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitionConfig {
    pub floor: u32,
    pub bands: Vec<PriceBand>,
}

impl PartitionConfig {
    pub fn schedule(&self) -> Result<PriceSchedule, ScheduleError> {
        PriceSchedule::new(self.floor, self.bands.clone())
    }
}

impl Default for PartitionConfig {
    fn default() -> Self {
        let schedule = PriceSchedule::default();
        Self {
            floor: schedule.floor(),
            bands: schedule.bands().to_vec(),
        }
    }
}

/// Pagination limits and cooldown timings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Listing cards per page; the offset advances by this much
    pub page_size: u32,

    /// The site stops serving past this offset regardless of result count
    pub max_offset: u32,

    /// A range is abandoned once consecutive network failures exceed this
    pub max_consecutive_errors: u32,

    /// Pause after a network failure before retrying the same page
    pub network_cooldown_seconds: u64,

    /// Pause after a soft ban before retrying the same page
    pub soft_ban_cooldown_seconds: u64,

    /// Give up on a range after this many soft-ban cooldowns; `None` retries forever
    pub max_soft_ban_retries: Option<u32>,

    /// Sleep between production cycles
    pub cycle_interval_seconds: u64,
}

impl CrawlConfig {
    pub fn network_cooldown(&self) -> Duration {
        Duration::from_secs(self.network_cooldown_seconds)
    }

    pub fn soft_ban_cooldown(&self) -> Duration {
        Duration::from_secs(self.soft_ban_cooldown_seconds)
    }

    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.cycle_interval_seconds)
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            page_size: defaults::PAGE_SIZE,
            max_offset: defaults::MAX_OFFSET,
            max_consecutive_errors: defaults::MAX_CONSECUTIVE_ERRORS,
            network_cooldown_seconds: defaults::NETWORK_COOLDOWN_SECONDS,
            soft_ban_cooldown_seconds: defaults::SOFT_BAN_COOLDOWN_SECONDS,
            max_soft_ban_retries: None,
            cycle_interval_seconds: defaults::CYCLE_INTERVAL_SECONDS,
        }
    }
}

/// HTTP identity and pacing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Browser identities rotated per request
    pub user_agents: Vec<String>,

    pub accept: String,

    /// Fixed referrer sent with every request
    pub referer: String,

    pub timeout_seconds: u64,

    /// Randomized pre-request delay window (milliseconds, inclusive)
    pub jitter_min_ms: u64,
    pub jitter_max_ms: u64,

    /// Requests slower than this are logged as slow
    pub slow_request_threshold_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agents: defaults::USER_AGENTS.iter().map(|s| s.to_string()).collect(),
            accept: defaults::ACCEPT.to_string(),
            referer: defaults::REFERER.to_string(),
            timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            jitter_min_ms: defaults::JITTER_MIN_MS,
            jitter_max_ms: defaults::JITTER_MAX_MS,
            slow_request_threshold_ms: defaults::SLOW_REQUEST_THRESHOLD_MS,
        }
    }
}

/// Soft-ban detection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Lower-case terms whose presence in the page text marks a challenge page
    pub trigger_terms: Vec<String>,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            trigger_terms: defaults::SOFT_BAN_TRIGGERS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Durable output destinations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Primary append-only destination for production runs
    pub destination: PathBuf,

    /// Disposable destination for verification runs
    pub verify_destination: PathBuf,

    /// Prefix a fresh destination with a UTF-8 byte order mark (spreadsheet friendly)
    pub utf8_bom: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            destination: PathBuf::from(defaults::DESTINATION),
            verify_destination: PathBuf::from(defaults::VERIFY_DESTINATION),
            utf8_bom: true,
        }
    }
}

/// The narrow window used by verification runs (inclusive bounds, as queried)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    pub min_price: u32,
    pub max_price: u32,
}

impl VerifyConfig {
    pub fn range(&self) -> Result<PriceRange, ScheduleError> {
        PriceRange::new(self.min_price, self.max_price.saturating_add(1))
    }
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            min_price: defaults::VERIFY_MIN_PRICE,
            max_price: defaults::VERIFY_MAX_PRICE,
        }
    }
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable console output
    pub console_output: bool,

    /// Enable file output (daily rotation)
    pub file_output: bool,

    /// Write the file log as JSON lines
    pub json_format: bool,

    pub log_dir: PathBuf,

    pub file_prefix: String,

    /// Number of rotated log files to keep
    pub max_files: usize,

    /// Module-specific log level filters (e.g., "reqwest": "warn")
    pub module_filters: HashMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            console_output: true,
            file_output: true,
            json_format: true,
            log_dir: PathBuf::from(defaults::LOG_DIR),
            file_prefix: defaults::LOG_FILE_PREFIX.to_string(),
            max_files: defaults::LOG_MAX_FILES,
            module_filters: {
                let mut filters = HashMap::new();
                filters.insert("reqwest".to_string(), "warn".to_string());
                filters.insert("hyper".to_string(), "warn".to_string());
                filters.insert("hyper_util".to_string(), "warn".to_string());
                filters.insert("html5ever".to_string(), "error".to_string());
                filters
            },
        }
    }
}

impl AppConfig {
    /// Check everything that would otherwise fail mid-crawl.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.partition.schedule()?;
        self.verify.range()?;
        self.selectors.compile()?;

        if self.crawl.page_size == 0 {
            return Err(ConfigError::invalid("crawl.page_size", "must be greater than 0"));
        }
        if self.fetch.user_agents.iter().all(|ua| ua.trim().is_empty()) {
            return Err(ConfigError::invalid("fetch.user_agents", "identity pool is empty"));
        }
        if self.fetch.jitter_min_ms > self.fetch.jitter_max_ms {
            return Err(ConfigError::invalid(
                "fetch.jitter_min_ms",
                format!(
                    "{} exceeds jitter_max_ms {}",
                    self.fetch.jitter_min_ms, self.fetch.jitter_max_ms
                ),
            ));
        }
        if self.fetch.timeout_seconds == 0 {
            return Err(ConfigError::invalid("fetch.timeout_seconds", "must be greater than 0"));
        }
        if self.guard.trigger_terms.iter().any(|term| term.trim().is_empty()) {
            return Err(ConfigError::invalid("guard.trigger_terms", "empty trigger term"));
        }
        if !self.logging.console_output && !self.logging.file_output {
            return Err(ConfigError::invalid("logging", "no logging output configured"));
        }

        Ok(())
    }
}

/// Configuration manager for loading settings
pub struct ConfigManager {
    pub config_path: PathBuf,
    env_prefix: String,
}

impl ConfigManager {
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            env_prefix: defaults::ENV_PREFIX.to_string(),
        }
    }

    /// Resolve the config file from `HARVESTER_CONFIG`, falling back to the default name.
    pub fn from_env() -> Self {
        let path = std::env::var(defaults::CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(defaults::CONFIG_FILE));
        Self::new(path)
    }

    /// Use a different environment prefix (tests, side-by-side deployments).
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = prefix.to_string();
        self
    }

    /// Load defaults, then the optional file, then environment overrides, then validate.
    pub fn load_config(&self) -> Result<AppConfig, ConfigError> {
        let file_present = self.config_path.exists();

        let config: AppConfig = config::Config::builder()
            .add_source(
                File::from(self.config_path.as_path())
                    .format(FileFormat::Json)
                    .required(false),
            )
            .add_source(
                Environment::with_prefix(&self.env_prefix)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;

        if file_present {
            info!("Loaded configuration from: {:?}", self.config_path);
        } else {
            info!("No configuration file at {:?}, using defaults", self.config_path);
        }

        Ok(config)
    }

    /// Get the configuration file path
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}

/// Mercado Livre listing site constants
pub mod mercado_livre {
    /// Base URL of the listing site
    pub const BASE_URL: &str = "https://lista.mercadolivre.com.br";

    /// Samsung smartphones category listing; price filter and offset are appended
    pub const SAMSUNG_SMARTPHONES_PREFIX: &str =
        "https://lista.mercadolivre.com.br/celulares-telefones/celulares-smartphones/samsung/samsung";
}

/// Default harvesting configuration values
pub mod defaults {
    /// Listing cards per results page
    pub const PAGE_SIZE: u32 = 48;

    /// Deepest offset the site serves for one query
    pub const MAX_OFFSET: u32 = 2000;

    /// Consecutive network failures tolerated before a range is abandoned
    pub const MAX_CONSECUTIVE_ERRORS: u32 = 3;

    pub const NETWORK_COOLDOWN_SECONDS: u64 = 30;

    /// 15 minutes penalty after a challenge page
    pub const SOFT_BAN_COOLDOWN_SECONDS: u64 = 15 * 60;

    /// 6 hours between production cycles
    pub const CYCLE_INTERVAL_SECONDS: u64 = 6 * 3600;

    pub const REQUEST_TIMEOUT_SECONDS: u64 = 20;

    pub const JITTER_MIN_MS: u64 = 2500;
    pub const JITTER_MAX_MS: u64 = 5000;

    pub const SLOW_REQUEST_THRESHOLD_MS: u64 = 10_000;

    pub const USER_AGENTS: &[&str] = &[
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:124.0) Gecko/20100101 Firefox/124.0",
    ];

    pub const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

    pub const REFERER: &str = "https://www.google.com/";

    pub const SOFT_BAN_TRIGGERS: &[&str] = &["captcha", "human"];

    pub const DESTINATION: &str = "data/raw/samsung_market_data.csv";
    pub const VERIFY_DESTINATION: &str = "data/raw/verification_run.csv";

    pub const VERIFY_MIN_PRICE: u32 = 1200;
    pub const VERIFY_MAX_PRICE: u32 = 1210;

    pub const LOG_LEVEL: &str = "info";
    pub const LOG_DIR: &str = "logs";
    pub const LOG_FILE_PREFIX: &str = "harvester";
    pub const LOG_MAX_FILES: usize = 30;

    pub const CONFIG_FILE: &str = "harvester.json";
    pub const CONFIG_PATH_ENV: &str = "HARVESTER_CONFIG";
    pub const ENV_PREFIX: &str = "HARVESTER";
}
