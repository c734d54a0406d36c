//! Crawl events and the observer seam.
//!
//! The controller reports everything that happens below the cycle level
//! through `CrawlEvent`s. Observers are called synchronously on the crawl
//! thread; the controller does not own their lifecycle, so logging and
//! statistics can be swapped without touching control flow.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::price_range::PriceRange;

/// Why the pagination loop for one price window stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeEnd {
    /// The page had no listing cards: natural end of results.
    Exhausted,
    /// The offset passed the depth the site is willing to serve.
    DepthLimit,
    /// Non-success HTTP status; the window is treated as invalid or exhausted.
    HttpStatus(u16),
    /// Too many consecutive network failures.
    NetworkFailures(u32),
    /// Soft-ban retries hit the configured cap.
    SoftBanLimit(u32),
    /// Verification run stops after its first persisted page.
    SingleShot,
    /// External interrupt.
    Cancelled,
}

impl RangeEnd {
    pub fn is_abandoned(self) -> bool {
        matches!(
            self,
            RangeEnd::HttpStatus(_) | RangeEnd::NetworkFailures(_) | RangeEnd::SoftBanLimit(_)
        )
    }
}

impl fmt::Display for RangeEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeEnd::Exhausted => write!(f, "end of results"),
            RangeEnd::DepthLimit => write!(f, "pagination depth limit"),
            RangeEnd::HttpStatus(status) => write!(f, "HTTP status {status}"),
            RangeEnd::NetworkFailures(count) => write!(f, "{count} consecutive network failures"),
            RangeEnd::SoftBanLimit(count) => write!(f, "soft ban persisted after {count} cooldowns"),
            RangeEnd::SingleShot => write!(f, "single-shot page complete"),
            RangeEnd::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Totals for one sweep over all price windows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub cycle_id: u64,
    pub ranges_completed: usize,
    pub ranges_abandoned: usize,
    pub pages_fetched: u64,
    pub items_persisted: u64,
    pub duplicates_dropped: u64,
    pub cards_skipped: u64,
    pub persistence_failures: u64,
    pub duration: Duration,
    pub interrupted: bool,
}

#[derive(Debug, Clone)]
pub enum CrawlEvent {
    CycleStarted {
        cycle_id: u64,
        ranges: usize,
    },
    RangeStarted {
        cycle_id: u64,
        range: PriceRange,
    },
    PageFetched {
        url: String,
        status: u16,
        latency: Duration,
    },
    SoftBanDetected {
        url: String,
        trigger: String,
        attempt: u32,
        cooldown: Duration,
    },
    NetworkFailure {
        url: String,
        message: String,
        consecutive: u32,
    },
    CardSkipped {
        url: String,
        card_index: usize,
        reason: String,
    },
    BatchPersisted {
        range: PriceRange,
        page_number: u32,
        items: usize,
        duplicates: usize,
    },
    PersistenceFailed {
        range: PriceRange,
        page_number: u32,
        items: usize,
        duplicates: usize,
        message: String,
    },
    RangeFinished {
        cycle_id: u64,
        range: PriceRange,
        pages: u32,
        items: u64,
        end: RangeEnd,
    },
    CycleCompleted(CycleSummary),
    CycleSleeping {
        next_cycle_id: u64,
        interval: Duration,
    },
}

pub trait CrawlObserver: Send + Sync {
    fn on_event(&self, event: &CrawlEvent);
}

/// Fan-out to every registered observer, in registration order.
#[derive(Clone, Default)]
pub struct ObserverSet {
    observers: Vec<Arc<dyn CrawlObserver>>,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, observer: Arc<dyn CrawlObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn register(&mut self, observer: Arc<dyn CrawlObserver>) {
        self.observers.push(observer);
    }

    pub fn emit(&self, event: &CrawlEvent) {
        for observer in &self.observers {
            observer.on_event(event);
        }
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl fmt::Debug for ObserverSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverSet")
            .field("observers", &self.observers.len())
            .finish()
    }
}
