//! Infrastructure layer: configuration, HTTP, parsing, persistence and observers
//!
//! Everything that touches the network, the filesystem or the log lives here;
//! the crawl controller only sees the traits and types re-exported below.

pub mod anti_bot;
pub mod config;
pub mod crawl_stats;
pub mod csv_sink;
pub mod event_log;
pub mod http_client;
pub mod logging;
pub mod parsing;

// Re-export commonly used items
pub use anti_bot::{AntiBotGuard, GuardVerdict};
pub use self::config::{AppConfig, ConfigError, ConfigManager};
pub use crawl_stats::{CrawlStats, StatsSnapshot};
pub use csv_sink::{CsvSink, RecordSink, SinkError};
pub use event_log::EventLog;
pub use http_client::{FetchError, FetchedPage, HttpPageFetcher, NetworkErrorKind, PageFetcher};
pub use logging::{LoggingGuard, init_logging, log_system_info};
pub use parsing::{ExtractionError, ListingSelectors, PageContext, PageExtraction, RecordExtractor};
