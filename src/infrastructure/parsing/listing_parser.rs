//! Listing page parser
//!
//! Detects the page layout, then extracts each card through its field
//! fallback chains. A failing card is recorded and skipped; it never costs
//! the rest of the page.

#![allow(clippy::uninlined_format_args)]

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, trace};
use url::Url;

use super::config::{CompiledSelectors, ListingSelectors, SelectorChain};
use super::context::PageContext;
use super::error::{ExtractionError, ExtractionResult};
use crate::domain::{CycleDeduplicator, ExtractedRecord, InterestTerms, Layout};
use crate::domain::record::NOT_AVAILABLE;

const INTEREST_FREE_MARKER: &str = "sem juros";
const SOLD_MARKER: &str = "vendidos";
const FREE_DELIVERY_MARKER: &str = "grátis";
const GREAT_DEAL_MARKERS: [&str; 2] = ["IMPERDÍVEL", "OFERTA"];
const BESTSELLER_MARKER: &str = "MAIS VENDIDO";
const RECOMMENDED_MARKER: &str = "RECOMENDADO";

const DEFAULT_PRICE_FRACTION: &str = "0";
const DEFAULT_PRICE_CENTS: &str = "00";

/// A card that could not be turned into a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardFailure {
    pub index: usize,
    pub error: ExtractionError,
}

/// Everything extracted from one listing page
#[derive(Debug, Clone)]
pub struct PageExtraction {
    pub layout: Layout,
    pub card_count: usize,
    pub records: Vec<ExtractedRecord>,
    /// Cards whose identity was already emitted this cycle
    pub duplicates: usize,
    pub failures: Vec<CardFailure>,
}

/// Merchandising flags read from the highlight label
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HighlightFlags {
    pub great_deal: bool,
    pub bestseller: bool,
    pub recommended: bool,
}

impl HighlightFlags {
    /// Classify an already upper-cased highlight label.
    pub fn from_label(label: &str) -> Self {
        Self {
            great_deal: GREAT_DEAL_MARKERS.iter().any(|marker| label.contains(marker)),
            bestseller: label.contains(BESTSELLER_MARKER),
            recommended: label.contains(RECOMMENDED_MARKER),
        }
    }
}

/// Installment count and interest terms from the installment label.
///
/// The count is the last token before the first `x` ("10x R$ 99" -> "10");
/// a label without `x` is a single payment.
pub fn parse_installments(text: &str) -> ExtractionResult<(String, InterestTerms)> {
    let lower = text.to_lowercase();
    let terms = if lower.contains(INTEREST_FREE_MARKER) {
        InterestTerms::InterestFree
    } else {
        InterestTerms::WithInterest
    };

    let count = match lower.split_once('x') {
        Some((before, _)) => before
            .split_whitespace()
            .last()
            .ok_or_else(|| ExtractionError::malformed("installments", text))?
            .to_string(),
        None => "1".to_string(),
    };

    Ok((count, terms))
}

/// Extracts `ExtractedRecord`s from listing pages
pub struct RecordExtractor {
    selectors: CompiledSelectors,
    base_url: Url,
}

impl RecordExtractor {
    pub fn new(selectors: &ListingSelectors, base_url: &str) -> ExtractionResult<Self> {
        let base_url = Url::parse(base_url).map_err(|e| ExtractionError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            selectors: selectors.compile()?,
            base_url,
        })
    }

    /// First layout whose card selector matches anything; it applies to every card on the page.
    pub fn detect_layout<'a>(&self, html: &'a Html) -> Option<(Layout, Vec<ElementRef<'a>>)> {
        self.selectors.layouts.iter().find_map(|(layout, selector)| {
            let cards: Vec<ElementRef<'a>> = html.select(selector).collect();
            (!cards.is_empty()).then_some((*layout, cards))
        })
    }

    /// Extract every card on the page. `None` means no layout matched: end of results.
    pub fn extract_page(
        &self,
        html: &Html,
        context: &PageContext,
        deduplicator: &mut CycleDeduplicator,
    ) -> Option<PageExtraction> {
        let (layout, cards) = self.detect_layout(html)?;
        debug!("Detected {} layout with {} cards", layout, cards.len());

        let mut extraction = PageExtraction {
            layout,
            card_count: cards.len(),
            records: Vec::with_capacity(cards.len()),
            duplicates: 0,
            failures: Vec::new(),
        };

        for (index, card) in cards.into_iter().enumerate() {
            match self.extract_card(card, layout, context, deduplicator) {
                Ok(Some(record)) => extraction.records.push(record),
                Ok(None) => extraction.duplicates += 1,
                Err(error) => extraction.failures.push(CardFailure { index, error }),
            }
        }

        Some(extraction)
    }

    /// Extract one card. `Ok(None)` when its identity was already emitted this cycle.
    ///
    /// The identity is claimed before the remaining fields are read, so a
    /// duplicate never reaches field extraction.
    pub fn extract_card(
        &self,
        card: ElementRef<'_>,
        layout: Layout,
        context: &PageContext,
        deduplicator: &mut CycleDeduplicator,
    ) -> ExtractionResult<Option<ExtractedRecord>> {
        let link = self.extract_identity(card)?;
        if !deduplicator.admit(&link) {
            trace!("Duplicate listing skipped: {}", link);
            return Ok(None);
        }

        let price = format!(
            "{}.{}",
            first_text(card, &self.selectors.price_fraction).unwrap_or_else(|| DEFAULT_PRICE_FRACTION.to_string()),
            first_text(card, &self.selectors.price_cents).unwrap_or_else(|| DEFAULT_PRICE_CENTS.to_string()),
        );

        let discount = first_text(card, &self.selectors.discount)
            .and_then(|text| text.split(' ').next().map(str::to_string))
            .filter(|token| !token.is_empty())
            .unwrap_or_else(not_available);

        let (installments, interest_free) =
            match first_text_with(card, &self.selectors.installments, " ") {
                Some(text) => {
                    let (count, terms) = parse_installments(&text)?;
                    (count, Some(terms))
                }
                None => (not_available(), None),
            };

        let highlight = first_text(card, &self.selectors.highlight)
            .map(|text| HighlightFlags::from_label(&text.to_uppercase()))
            .unwrap_or_default();

        Ok(Some(ExtractedRecord {
            extraction_date: context.extracted_at,
            cycle_id: context.cycle_id,
            title: first_text(card, &self.selectors.title).unwrap_or_else(not_available),
            seller: first_text(card, &self.selectors.seller).unwrap_or_else(not_available),
            price,
            discount,
            installments,
            interest_free,
            total_sold_raw: self.total_sold(card),
            free_delivery: self.free_delivery(card),
            arrival_estimation: self.arrival_estimation(card),
            is_great_deal: highlight.great_deal,
            is_bestseller: highlight.bestseller,
            is_recommended: highlight.recommended,
            link,
            layout_type: layout,
            price_range_searched: context.price_range_label.clone(),
        }))
    }

    /// Resolve the card link against the site and drop query and fragment.
    fn extract_identity(&self, card: ElementRef<'_>) -> ExtractionResult<String> {
        let href = self
            .selectors
            .link
            .selectors()
            .iter()
            .filter_map(|selector| card.select(selector).next())
            .filter_map(|anchor| anchor.value().attr("href"))
            .map(str::trim)
            .find(|href| !href.is_empty())
            .ok_or(ExtractionError::MissingIdentity)?;

        self.normalize_identity(href)
    }

    pub fn normalize_identity(&self, href: &str) -> ExtractionResult<String> {
        let mut url = self
            .base_url
            .join(href)
            .map_err(|e| ExtractionError::invalid_identity(href, e))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ExtractionError::invalid_identity(
                href,
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }

        url.set_query(None);
        url.set_fragment(None);
        Ok(url.to_string())
    }

    fn total_sold(&self, card: ElementRef<'_>) -> String {
        self.selectors
            .total_sold
            .selectors()
            .iter()
            .flat_map(|selector| card.select(selector))
            .find(|span| span.text().collect::<String>().to_lowercase().contains(SOLD_MARKER))
            .map(|span| stripped_text(span, ""))
            .unwrap_or_else(not_available)
    }

    fn free_delivery(&self, card: ElementRef<'_>) -> bool {
        first_text(card, &self.selectors.shipping)
            .is_some_and(|text| text.to_lowercase().contains(FREE_DELIVERY_MARKER))
    }

    fn arrival_estimation(&self, card: ElementRef<'_>) -> String {
        if first_match(card, &self.selectors.same_day_arrival).is_some() {
            return "Today".to_string();
        }
        if first_match(card, &self.selectors.next_day_arrival).is_some() {
            return "Tomorrow".to_string();
        }
        self.selectors
            .weekday_arrival
            .iter()
            .find_map(|(day, selector)| {
                card.select(selector)
                    .next()
                    .map(|tag| format!("DayWeek {} ({})", day, stripped_text(tag, "")))
            })
            .unwrap_or_else(|| "Standard".to_string())
    }
}

fn not_available() -> String {
    NOT_AVAILABLE.to_string()
}

/// Text nodes trimmed, empties dropped, joined with `separator`
fn stripped_text(element: ElementRef<'_>, separator: &str) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

/// First element matched by any selector of the chain, in chain order
fn first_match<'a>(card: ElementRef<'a>, chain: &SelectorChain) -> Option<ElementRef<'a>> {
    chain
        .selectors()
        .iter()
        .find_map(|selector: &Selector| card.select(selector).next())
}

fn first_text(card: ElementRef<'_>, chain: &SelectorChain) -> Option<String> {
    first_text_with(card, chain, "")
}

/// First non-empty text produced by the chain
fn first_text_with(card: ElementRef<'_>, chain: &SelectorChain, separator: &str) -> Option<String> {
    chain
        .selectors()
        .iter()
        .filter_map(|selector| card.select(selector).next())
        .map(|element| stripped_text(element, separator))
        .find(|text| !text.is_empty())
}
