//! Domain module - Core harvesting types
//!
//! This module contains the value types the crawl engine moves around:
//! price windows, page requests, extracted records and the per-cycle
//! deduplication state. Nothing in here touches the network or the disk.
//!
//! Modern Rust module organization (Rust 2018+ style):
//! - Each module is its own file in the domain/ directory
//! - Public exports are defined here for convenience

pub mod cycle;
pub mod events;
pub mod page_request;
pub mod price_range;
pub mod record;

// Re-export commonly used items for convenience
pub use cycle::{CycleContext, CycleDeduplicator};
pub use events::{CrawlEvent, CrawlObserver, CycleSummary, ObserverSet, RangeEnd};
pub use page_request::PageRequest;
pub use price_range::{PriceBand, PriceRange, PriceSchedule, ScheduleError};
pub use record::{ExtractedRecord, InterestTerms, Layout};
