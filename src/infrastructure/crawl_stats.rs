//! In-process crawl statistics
//!
//! Counters are updated from crawl events and read as a snapshot, e.g. for
//! the per-cycle status line.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

use crate::domain::{CrawlEvent, CrawlObserver, RangeEnd};

#[derive(Debug, Default)]
pub struct CrawlStats {
    cycles_completed: AtomicU64,
    ranges_completed: AtomicU64,
    ranges_abandoned: AtomicU64,
    pages_fetched: AtomicU64,
    responses_client_error: AtomicU64,
    responses_server_error: AtomicU64,
    items_persisted: AtomicU64,
    duplicates_dropped: AtomicU64,
    cards_skipped: AtomicU64,
    soft_bans: AtomicU64,
    network_failures: AtomicU64,
    persistence_failures: AtomicU64,
    total_latency_ms: AtomicU64,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub cycles_completed: u64,
    pub ranges_completed: u64,
    pub ranges_abandoned: u64,
    pub pages_fetched: u64,
    pub responses_client_error: u64,
    pub responses_server_error: u64,
    pub items_persisted: u64,
    pub duplicates_dropped: u64,
    pub cards_skipped: u64,
    pub soft_bans: u64,
    pub network_failures: u64,
    pub persistence_failures: u64,
    pub average_latency_ms: u64,
}

impl CrawlStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let pages_fetched = self.pages_fetched.load(Ordering::Relaxed);
        let total_latency_ms = self.total_latency_ms.load(Ordering::Relaxed);

        StatsSnapshot {
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            ranges_completed: self.ranges_completed.load(Ordering::Relaxed),
            ranges_abandoned: self.ranges_abandoned.load(Ordering::Relaxed),
            pages_fetched,
            responses_client_error: self.responses_client_error.load(Ordering::Relaxed),
            responses_server_error: self.responses_server_error.load(Ordering::Relaxed),
            items_persisted: self.items_persisted.load(Ordering::Relaxed),
            duplicates_dropped: self.duplicates_dropped.load(Ordering::Relaxed),
            cards_skipped: self.cards_skipped.load(Ordering::Relaxed),
            soft_bans: self.soft_bans.load(Ordering::Relaxed),
            network_failures: self.network_failures.load(Ordering::Relaxed),
            persistence_failures: self.persistence_failures.load(Ordering::Relaxed),
            average_latency_ms: total_latency_ms.checked_div(pages_fetched).unwrap_or(0),
        }
    }

    fn add(counter: &AtomicU64, amount: u64) {
        counter.fetch_add(amount, Ordering::Relaxed);
    }
}

impl CrawlObserver for CrawlStats {
    fn on_event(&self, event: &CrawlEvent) {
        match event {
            CrawlEvent::PageFetched { status, latency, .. } => {
                Self::add(&self.pages_fetched, 1);
                match *status {
                    400..=499 => Self::add(&self.responses_client_error, 1),
                    500.. => Self::add(&self.responses_server_error, 1),
                    _ => {}
                }
                Self::add(
                    &self.total_latency_ms,
                    u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                );
            }
            CrawlEvent::SoftBanDetected { .. } => Self::add(&self.soft_bans, 1),
            CrawlEvent::NetworkFailure { .. } => Self::add(&self.network_failures, 1),
            CrawlEvent::CardSkipped { .. } => Self::add(&self.cards_skipped, 1),
            CrawlEvent::BatchPersisted { items, duplicates, .. } => {
                Self::add(&self.items_persisted, *items as u64);
                Self::add(&self.duplicates_dropped, *duplicates as u64);
            }
            CrawlEvent::PersistenceFailed { duplicates, .. } => {
                Self::add(&self.persistence_failures, 1);
                Self::add(&self.duplicates_dropped, *duplicates as u64);
            }
            CrawlEvent::RangeFinished { end, .. } => {
                if end.is_abandoned() {
                    Self::add(&self.ranges_abandoned, 1);
                } else if *end != RangeEnd::Cancelled {
                    Self::add(&self.ranges_completed, 1);
                }
            }
            CrawlEvent::CycleCompleted(_) => {
                Self::add(&self.cycles_completed, 1);
                info!("📊 Totals so far: {:?}", self.snapshot());
            }
            CrawlEvent::CycleStarted { .. }
            | CrawlEvent::RangeStarted { .. }
            | CrawlEvent::CycleSleeping { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PriceRange;
    use std::time::Duration;

    #[test]
    fn test_counters_follow_events() {
        let stats = CrawlStats::new();
        let range = PriceRange::new(0, 50).unwrap();

        for (status, latency) in [(200, 100), (503, 300)] {
            stats.on_event(&CrawlEvent::PageFetched {
                url: "https://example.com".to_string(),
                status,
                latency: Duration::from_millis(latency),
            });
        }
        stats.on_event(&CrawlEvent::BatchPersisted {
            range,
            page_number: 1,
            items: 40,
            duplicates: 8,
        });
        stats.on_event(&CrawlEvent::RangeFinished {
            cycle_id: 1,
            range,
            pages: 2,
            items: 40,
            end: RangeEnd::Exhausted,
        });
        stats.on_event(&CrawlEvent::RangeFinished {
            cycle_id: 1,
            range,
            pages: 0,
            items: 0,
            end: RangeEnd::NetworkFailures(4),
        });

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.pages_fetched, 2);
        assert_eq!(snapshot.average_latency_ms, 200);
        assert_eq!(snapshot.responses_server_error, 1);
        assert_eq!(snapshot.responses_client_error, 0);
        assert_eq!(snapshot.items_persisted, 40);
        assert_eq!(snapshot.duplicates_dropped, 8);
        assert_eq!(snapshot.ranges_completed, 1);
        assert_eq!(snapshot.ranges_abandoned, 1);
    }

    #[test]
    fn test_empty_snapshot_has_zero_latency() {
        assert_eq!(CrawlStats::new().snapshot(), StatsSnapshot::default());
    }
}
