//! What one harvester process will crawl, resolved from configuration and run mode.

use std::path::PathBuf;
use std::time::Duration;

use crate::domain::PriceRange;
use crate::infrastructure::config::{AppConfig, ConfigError, CrawlConfig};

/// Environment variable selecting the run mode
pub const RUN_MODE_ENV: &str = "HARVEST_MODE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Unbounded cycles over every price range, primary destination
    Production,
    /// One page of one range, disposable destination
    Verification,
}

impl RunMode {
    pub fn from_env() -> Self {
        Self::from_env_value(std::env::var(RUN_MODE_ENV).ok().as_deref())
    }

    /// `verify`, `verification` and `test` select a verification run; anything else is production.
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("verify" | "verification" | "test") => RunMode::Verification,
            _ => RunMode::Production,
        }
    }

    pub fn is_single_shot(self) -> bool {
        matches!(self, RunMode::Verification)
    }
}

/// Pagination and backoff limits applied to every range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlLimits {
    pub page_size: u32,
    pub max_offset: u32,
    pub max_consecutive_errors: u32,
    pub network_cooldown: Duration,
    pub soft_ban_cooldown: Duration,
    pub max_soft_ban_retries: Option<u32>,
    pub cycle_interval: Duration,
}

impl From<&CrawlConfig> for CrawlLimits {
    fn from(config: &CrawlConfig) -> Self {
        Self {
            page_size: config.page_size,
            max_offset: config.max_offset,
            max_consecutive_errors: config.max_consecutive_errors,
            network_cooldown: config.network_cooldown(),
            soft_ban_cooldown: config.soft_ban_cooldown(),
            max_soft_ban_retries: config.max_soft_ban_retries,
            cycle_interval: config.cycle_interval(),
        }
    }
}

impl Default for CrawlLimits {
    fn default() -> Self {
        Self::from(&CrawlConfig::default())
    }
}

#[derive(Debug, Clone)]
pub struct CrawlPlan {
    pub mode: RunMode,
    pub ranges: Vec<PriceRange>,
    pub limits: CrawlLimits,
    pub destination: PathBuf,
}

impl CrawlPlan {
    pub fn from_config(config: &AppConfig, mode: RunMode) -> Result<Self, ConfigError> {
        let (ranges, destination) = match mode {
            RunMode::Production => (
                config.partition.schedule()?.partition(),
                config.output.destination.clone(),
            ),
            RunMode::Verification => (
                vec![config.verify.range()?],
                config.output.verify_destination.clone(),
            ),
        };

        Ok(Self {
            mode,
            ranges,
            limits: CrawlLimits::from(&config.crawl),
            destination,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_mode_parsing() {
        assert_eq!(RunMode::from_env_value(None), RunMode::Production);
        assert_eq!(RunMode::from_env_value(Some("production")), RunMode::Production);
        assert_eq!(RunMode::from_env_value(Some(" Verify ")), RunMode::Verification);
        assert_eq!(RunMode::from_env_value(Some("TEST")), RunMode::Verification);
        assert!(!RunMode::Production.is_single_shot());
    }

    #[test]
    fn test_production_plan_covers_schedule() {
        let config = AppConfig::default();
        let plan = CrawlPlan::from_config(&config, RunMode::Production).unwrap();

        assert_eq!(plan.ranges.len(), 113);
        assert_eq!(plan.destination, config.output.destination);
        assert_eq!(plan.limits.soft_ban_cooldown, Duration::from_secs(900));
    }

    #[test]
    fn test_verification_plan_is_one_narrow_range() {
        let config = AppConfig::default();
        let plan = CrawlPlan::from_config(&config, RunMode::Verification).unwrap();

        assert_eq!(plan.ranges.len(), 1);
        assert_eq!(plan.ranges[0].query_label(), "1200-1210");
        assert_eq!(plan.destination, config.output.verify_destination);
    }
}
