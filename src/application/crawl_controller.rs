//! Crawl controller
//!
//! Drives cycle -> range -> page -> card. Everything below the cycle level is
//! recovered here: network failures cool down and retry, soft bans cool down
//! and retry the same offset, non-200 responses end the range, and a failed
//! batch write is reported and skipped. All waits race the cancellation token.

#![allow(clippy::uninlined_format_args)]

use scraper::Html;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::crawl_plan::CrawlPlan;
use crate::domain::{
    CrawlEvent, CycleContext, CycleDeduplicator, CycleSummary, ObserverSet, PageRequest, PriceRange, RangeEnd,
};
use crate::infrastructure::anti_bot::{AntiBotGuard, GuardVerdict};
use crate::infrastructure::config::SiteConfig;
use crate::infrastructure::csv_sink::{RecordSink, SinkError};
use crate::infrastructure::http_client::PageFetcher;
use crate::infrastructure::parsing::{PageContext, PageExtraction, RecordExtractor};

/// Result of inspecting one successfully fetched page
enum PageOutcome {
    SoftBan { trigger: String },
    Empty,
    Extracted(PageExtraction),
}

pub struct CrawlController<F, S> {
    plan: CrawlPlan,
    site: SiteConfig,
    fetcher: F,
    sink: S,
    extractor: RecordExtractor,
    guard: AntiBotGuard,
    observers: ObserverSet,
    cancel: CancellationToken,
    next_cycle_id: u64,
}

impl<F: PageFetcher, S: RecordSink> CrawlController<F, S> {
    pub fn new(
        plan: CrawlPlan,
        site: SiteConfig,
        fetcher: F,
        sink: S,
        extractor: RecordExtractor,
        guard: AntiBotGuard,
    ) -> Self {
        Self {
            plan,
            site,
            fetcher,
            sink,
            extractor,
            guard,
            observers: ObserverSet::new(),
            cancel: CancellationToken::new(),
            next_cycle_id: 1,
        }
    }

    #[must_use]
    pub fn with_observers(mut self, observers: ObserverSet) -> Self {
        self.observers = observers;
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn plan(&self) -> &CrawlPlan {
        &self.plan
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Run cycles until cancelled; a verification run returns after its single page.
    ///
    /// Only sink initialization can fail; everything after it is recovered locally.
    pub async fn run(&mut self) -> Result<(), SinkError> {
        self.sink.ensure_initialized()?;

        loop {
            let summary = self.run_cycle().await;
            if summary.interrupted || self.plan.mode.is_single_shot() {
                return Ok(());
            }

            let interval = self.plan.limits.cycle_interval;
            self.observers.emit(&CrawlEvent::CycleSleeping {
                next_cycle_id: self.next_cycle_id,
                interval,
            });
            if !self.pause(interval).await {
                info!("Cancelled while sleeping between cycles");
                return Ok(());
            }
        }
    }

    /// One full sweep over every range with a fresh deduplication set.
    pub async fn run_cycle(&mut self) -> CycleSummary {
        let mut cycle = CycleContext::new(self.next_cycle_id);
        self.next_cycle_id += 1;
        let started = Instant::now();

        let mut summary = CycleSummary {
            cycle_id: cycle.cycle_id,
            ..CycleSummary::default()
        };
        self.observers.emit(&CrawlEvent::CycleStarted {
            cycle_id: cycle.cycle_id,
            ranges: self.plan.ranges.len(),
        });

        for index in 0..self.plan.ranges.len() {
            let range = self.plan.ranges[index];
            match self.crawl_range(range, &mut cycle, &mut summary).await {
                RangeEnd::Cancelled => {
                    summary.interrupted = true;
                    break;
                }
                RangeEnd::SingleShot => {
                    summary.ranges_completed += 1;
                    break;
                }
                end if end.is_abandoned() => summary.ranges_abandoned += 1,
                _ => summary.ranges_completed += 1,
            }
        }

        summary.duration = started.elapsed();
        debug!(
            "Cycle {} saw {} distinct listings (started {})",
            cycle.cycle_id,
            cycle.deduplicator.len(),
            cycle.started_at
        );
        self.observers.emit(&CrawlEvent::CycleCompleted(summary.clone()));
        summary
    }

    /// Paginate one price window until an end condition fires.
    pub async fn crawl_range(
        &mut self,
        range: PriceRange,
        cycle: &mut CycleContext,
        summary: &mut CycleSummary,
    ) -> RangeEnd {
        self.observers.emit(&CrawlEvent::RangeStarted {
            cycle_id: cycle.cycle_id,
            range,
        });

        let limits = self.plan.limits.clone();
        let mut request = PageRequest::first(range);
        let mut consecutive_errors = 0u32;
        let mut soft_bans = 0u32;
        let mut pages = 0u32;
        let mut items = 0u64;

        let end = loop {
            if self.cancel.is_cancelled() {
                break RangeEnd::Cancelled;
            }
            if request.pagination_offset > limits.max_offset {
                break RangeEnd::DepthLimit;
            }

            let url = self.site.listing_page_url(&request);
            debug!("Requesting {} (attempt {})", url, request.attempt_count);

            let fetched = tokio::select! {
                biased;
                () = self.cancel.cancelled() => None,
                result = self.fetcher.fetch(&url) => Some(result),
            };
            let Some(fetched) = fetched else {
                break RangeEnd::Cancelled;
            };

            let page = match fetched {
                Ok(page) => page,
                Err(error) => {
                    consecutive_errors += 1;
                    self.observers.emit(&CrawlEvent::NetworkFailure {
                        url: url.clone(),
                        message: error.to_string(),
                        consecutive: consecutive_errors,
                    });
                    if consecutive_errors > limits.max_consecutive_errors {
                        break RangeEnd::NetworkFailures(consecutive_errors);
                    }
                    if !self.pause(limits.network_cooldown).await {
                        break RangeEnd::Cancelled;
                    }
                    request = request.retry();
                    continue;
                }
            };

            summary.pages_fetched += 1;
            self.observers.emit(&CrawlEvent::PageFetched {
                url: url.clone(),
                status: page.status,
                latency: page.latency,
            });
            if !page.is_success() {
                break RangeEnd::HttpStatus(page.status);
            }

            let context = PageContext::new(cycle.cycle_id, &range);
            match self.inspect_page(&page.body, &context, &mut cycle.deduplicator) {
                PageOutcome::SoftBan { trigger } => {
                    soft_bans += 1;
                    if let Some(max_retries) = limits.max_soft_ban_retries {
                        if soft_bans > max_retries {
                            break RangeEnd::SoftBanLimit(max_retries);
                        }
                    }
                    self.observers.emit(&CrawlEvent::SoftBanDetected {
                        url: url.clone(),
                        trigger,
                        attempt: soft_bans,
                        cooldown: limits.soft_ban_cooldown,
                    });
                    if !self.pause(limits.soft_ban_cooldown).await {
                        break RangeEnd::Cancelled;
                    }
                    request = request.retry();
                }
                PageOutcome::Empty => break RangeEnd::Exhausted,
                PageOutcome::Extracted(extraction) => {
                    pages += 1;
                    items += self.persist_page(&url, range, pages, extraction, summary) as u64;

                    if self.plan.mode.is_single_shot() {
                        break RangeEnd::SingleShot;
                    }
                    soft_bans = 0;
                    request = request.next_page(limits.page_size);
                }
            }
        };

        self.observers.emit(&CrawlEvent::RangeFinished {
            cycle_id: cycle.cycle_id,
            range,
            pages,
            items,
            end,
        });
        end
    }

    /// Parse, guard-check and extract in one synchronous step.
    fn inspect_page(
        &self,
        body: &str,
        context: &PageContext,
        deduplicator: &mut CycleDeduplicator,
    ) -> PageOutcome {
        let html = Html::parse_document(body);

        if let GuardVerdict::SoftBanDetected { trigger } = self.guard.inspect(&html) {
            return PageOutcome::SoftBan { trigger };
        }

        match self.extractor.extract_page(&html, context, deduplicator) {
            Some(extraction) => PageOutcome::Extracted(extraction),
            None => PageOutcome::Empty,
        }
    }

    /// Report skipped cards and append the page batch; returns records written.
    fn persist_page(
        &mut self,
        url: &str,
        range: PriceRange,
        page_number: u32,
        extraction: PageExtraction,
        summary: &mut CycleSummary,
    ) -> usize {
        for failure in &extraction.failures {
            self.observers.emit(&CrawlEvent::CardSkipped {
                url: url.to_string(),
                card_index: failure.index,
                reason: failure.error.to_string(),
            });
        }
        summary.cards_skipped += extraction.failures.len() as u64;
        summary.duplicates_dropped += extraction.duplicates as u64;

        match self.sink.append(&extraction.records) {
            Ok(written) => {
                summary.items_persisted += written as u64;
                self.observers.emit(&CrawlEvent::BatchPersisted {
                    range,
                    page_number,
                    items: written,
                    duplicates: extraction.duplicates,
                });
                written
            }
            Err(error) => {
                summary.persistence_failures += 1;
                self.observers.emit(&CrawlEvent::PersistenceFailed {
                    range,
                    page_number,
                    items: extraction.records.len(),
                    duplicates: extraction.duplicates,
                    message: error.to_string(),
                });
                0
            }
        }
    }

    /// Sleep unless cancelled first; `false` means cancelled.
    async fn pause(&self, duration: std::time::Duration) -> bool {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => false,
            () = tokio::time::sleep(duration) => true,
        }
    }
}
