//! Test utilities for the listing harvester
//!
//! Scripted collaborators for driving the crawl controller without network
//! or filesystem, plus builders for listing page HTML.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::domain::{CrawlEvent, CrawlObserver, ExtractedRecord, Layout};
use crate::domain::record::NOT_AVAILABLE;
use crate::infrastructure::csv_sink::{RecordSink, SinkError};
use crate::infrastructure::http_client::{FetchError, FetchedPage, NetworkErrorKind, PageFetcher};

/// Fetcher that replays a fixed script of responses and records every URL.
///
/// Once the script runs out it serves an empty results page, which ends the range.
#[derive(Default)]
pub struct ScriptedFetcher {
    responses: Mutex<VecDeque<Result<FetchedPage, FetchError>>>,
    requested: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn then_page(self, body: impl Into<String>) -> Self {
        self.then_status(200, body)
    }

    #[must_use]
    pub fn then_status(self, status: u16, body: impl Into<String>) -> Self {
        self.responses.lock().unwrap().push_back(Ok(FetchedPage {
            status,
            body: body.into(),
            latency: Duration::from_millis(120),
        }));
        self
    }

    #[must_use]
    pub fn then_network_error(self) -> Self {
        self.responses.lock().unwrap().push_back(Err(FetchError::network(
            "scripted",
            NetworkErrorKind::Timeout,
            "operation timed out",
        )));
        self
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().unwrap().len()
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        self.requested.lock().unwrap().push(url.to_string());
        let next = self.responses.lock().unwrap().pop_front();
        next.unwrap_or_else(|| {
            Ok(FetchedPage {
                status: 200,
                body: empty_page(),
                latency: Duration::from_millis(80),
            })
        })
    }
}

/// In-memory sink; can be told to fail its next append.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub records: Vec<ExtractedRecord>,
    pub batches: usize,
    pub initialized: bool,
    pub fail_next: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn links(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.link.as_str()).collect()
    }
}

impl RecordSink for MemorySink {
    fn ensure_initialized(&mut self) -> Result<(), SinkError> {
        self.initialized = true;
        Ok(())
    }

    fn append(&mut self, records: &[ExtractedRecord]) -> Result<usize, SinkError> {
        if std::mem::take(&mut self.fail_next) {
            return Err(SinkError::Io {
                path: "memory".into(),
                source: std::io::Error::other("disk full"),
            });
        }
        self.batches += 1;
        self.records.extend_from_slice(records);
        Ok(records.len())
    }
}

/// Observer that keeps every event for later assertions
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<CrawlEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<CrawlEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl CrawlObserver for RecordingObserver {
    fn on_event(&self, event: &CrawlEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Minimal grid-layout card with a link and a title
pub fn grid_card(href: &str, title: &str) -> String {
    format!(
        r#"<div class="poly-card__content">
             <h3 class="poly-component__title-wrapper"><a class="poly-component__title" href="{href}">{title}</a></h3>
             <span class="andes-money-amount__fraction">1.099</span><span class="andes-money-amount__cents">90</span>
           </div>"#
    )
}

/// Minimal list-layout card
pub fn list_card(href: &str, title: &str) -> String {
    format!(
        r#"<li class="ui-search-layout__item">
             <a class="ui-search-link" href="{href}"><h2 class="ui-search-item__title">{title}</h2></a>
           </li>"#
    )
}

pub fn results_page(cards: &[String]) -> String {
    format!(
        "<html><body><section class=\"ui-search-results\">{}</section></body></html>",
        cards.concat()
    )
}

/// Grid page with one card per listing id, e.g. `page_of(&["MLB-1", "MLB-2"])`
pub fn page_of(ids: &[&str]) -> String {
    let cards: Vec<String> = ids
        .iter()
        .map(|id| grid_card(&format!("https://produto.mercadolivre.com.br/{id}?position=1"), id))
        .collect();
    results_page(&cards)
}

pub fn empty_page() -> String {
    "<html><body><p>Não há anúncios que correspondam à sua busca.</p></body></html>".to_string()
}

pub fn captcha_page() -> String {
    "<html><body><h1>Verifique se você é humano</h1><p>Complete o captcha para continuar.</p></body></html>"
        .to_string()
}

pub fn sample_record(link: &str) -> ExtractedRecord {
    ExtractedRecord {
        extraction_date: NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap(),
        cycle_id: 1,
        title: "Samsung Galaxy S23".to_string(),
        seller: NOT_AVAILABLE.to_string(),
        price: "3.499.00".to_string(),
        discount: NOT_AVAILABLE.to_string(),
        installments: NOT_AVAILABLE.to_string(),
        interest_free: None,
        total_sold_raw: NOT_AVAILABLE.to_string(),
        free_delivery: false,
        arrival_estimation: "Standard".to_string(),
        is_great_deal: false,
        is_bestseller: false,
        is_recommended: false,
        link: link.to_string(),
        layout_type: Layout::Grid,
        price_range_searched: "3000-3499".to_string(),
    }
}
