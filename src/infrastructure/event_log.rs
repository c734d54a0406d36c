//! Structured logging of crawl events
//!
//! Routine progress goes to `info`; anything that costs data or time
//! (soft bans, abandoned ranges, lost batches) is logged at `warn` or `error`.

#![allow(clippy::uninlined_format_args)]

use std::time::Duration;
use tracing::{error, info, warn};

use crate::domain::{CrawlEvent, CrawlObserver};

#[derive(Debug, Clone)]
pub struct EventLog {
    slow_request_threshold: Duration,
}

impl EventLog {
    pub fn new(slow_request_threshold: Duration) -> Self {
        Self {
            slow_request_threshold,
        }
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

impl CrawlObserver for EventLog {
    fn on_event(&self, event: &CrawlEvent) {
        match event {
            CrawlEvent::CycleStarted { cycle_id, ranges } => {
                info!(cycle_id, ranges, "🚀 Starting cycle {} over {} price ranges", cycle_id, ranges);
            }
            CrawlEvent::RangeStarted { cycle_id, range } => {
                info!(cycle_id, range = %range, "Scanning price range {}", range.query_label());
            }
            CrawlEvent::PageFetched { url, status, latency } => {
                let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
                match *status {
                    500.. => error!(status, latency_ms, "HTTP {} for {}", status, url),
                    400..=499 => warn!(status, latency_ms, "HTTP {} for {}", status, url),
                    _ => info!(status, latency_ms, "🌐 HTTP {} for {} in {}ms", status, url, latency_ms),
                }
                if *latency > self.slow_request_threshold {
                    warn!(status, latency_ms, "🐌 Slow response ({}ms) for {}", latency_ms, url);
                }
            }
            CrawlEvent::SoftBanDetected {
                url,
                trigger,
                attempt,
                cooldown,
            } => {
                warn!(
                    trigger = %trigger,
                    attempt,
                    cooldown_secs = cooldown.as_secs(),
                    "🛑 Soft ban detected on {} (attempt {}), cooling down for {:?}",
                    url,
                    attempt,
                    cooldown
                );
            }
            CrawlEvent::NetworkFailure {
                url,
                message,
                consecutive,
            } => {
                warn!(consecutive, "Network failure #{} on {}: {}", consecutive, url, message);
            }
            CrawlEvent::CardSkipped {
                url,
                card_index,
                reason,
            } => {
                warn!(card_index, "Skipping card {} on {}: {}", card_index, url, reason);
            }
            CrawlEvent::BatchPersisted {
                range,
                page_number,
                items,
                duplicates,
            } => {
                info!(
                    range = %range,
                    page_number,
                    items,
                    duplicates,
                    "💾 Page {} of {}: saved {} items ({} duplicates dropped)",
                    page_number,
                    range.query_label(),
                    items,
                    duplicates
                );
            }
            CrawlEvent::PersistenceFailed {
                range,
                page_number,
                items,
                message,
                ..
            } => {
                error!(
                    range = %range,
                    page_number,
                    items,
                    "❌ Lost {} items from page {} of {}: {}",
                    items,
                    page_number,
                    range.query_label(),
                    message
                );
            }
            CrawlEvent::RangeFinished {
                cycle_id,
                range,
                pages,
                items,
                end,
            } => {
                if end.is_abandoned() {
                    warn!(cycle_id, range = %range, pages, items, "Abandoned range {}: {}", range.query_label(), end);
                } else {
                    info!(cycle_id, range = %range, pages, items, "Finished range {} after {} pages: {}", range.query_label(), pages, end);
                }
            }
            CrawlEvent::CycleCompleted(summary) => {
                info!(
                    cycle_id = summary.cycle_id,
                    ranges_completed = summary.ranges_completed,
                    ranges_abandoned = summary.ranges_abandoned,
                    pages = summary.pages_fetched,
                    items = summary.items_persisted,
                    duplicates = summary.duplicates_dropped,
                    cards_skipped = summary.cards_skipped,
                    duration_secs = summary.duration.as_secs(),
                    interrupted = summary.interrupted,
                    "✅ Cycle {} finished: {} items persisted in {:?}",
                    summary.cycle_id,
                    summary.items_persisted,
                    summary.duration
                );
            }
            CrawlEvent::CycleSleeping {
                next_cycle_id,
                interval,
            } => {
                info!(next_cycle_id, "💤 Sleeping {:?} before cycle {}", interval, next_cycle_id);
            }
        }
    }
}
