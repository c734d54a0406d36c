//! Parsing configuration for listing extraction
//!
//! Centralized configuration for CSS selectors. Every field is an ordered
//! fallback chain; layouts are an ordered list tried until one matches.
//! Adding a layout or a fallback is a configuration change.

use scraper::Selector;
use serde::{Deserialize, Serialize};

use super::error::ExtractionError;
use crate::domain::Layout;

/// Container selector that identifies one page layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutSelector {
    pub layout: Layout,
    pub card: String,
}

/// CSS selectors for listing result pages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingSelectors {
    /// Layouts in detection priority order; the first with any card wins
    pub layouts: Vec<LayoutSelector>,

    /// Anchor carrying the listing link (item identity)
    pub link: Vec<String>,

    pub title: Vec<String>,
    pub seller: Vec<String>,

    /// Integer part of the price
    pub price_fraction: Vec<String>,

    /// Fractional part of the price
    pub price_cents: Vec<String>,

    pub discount: Vec<String>,
    pub installments: Vec<String>,

    /// Candidates scanned for the "sold" counter text
    pub total_sold: Vec<String>,

    pub shipping: Vec<String>,
    pub same_day_arrival: Vec<String>,
    pub next_day_arrival: Vec<String>,

    /// Class prefix combined with each weekday name, e.g. `span.poly-shipping--monday`
    pub weekday_arrival_prefix: String,
    pub weekdays: Vec<String>,

    pub highlight: Vec<String>,
}

impl Default for ListingSelectors {
    fn default() -> Self {
        fn chain(selectors: &[&str]) -> Vec<String> {
            selectors.iter().map(|s| s.to_string()).collect()
        }

        Self {
            layouts: vec![
                LayoutSelector {
                    layout: Layout::Grid,
                    card: "div.poly-card__content".to_string(),
                },
                LayoutSelector {
                    layout: Layout::List,
                    card: "li.ui-search-layout__item".to_string(),
                },
            ],
            link: chain(&["a.poly-component__title", "a.ui-search-link", "a"]),
            title: chain(&["h3.poly-component__title-wrapper", "h2.ui-search-item__title"]),
            seller: chain(&[
                "span.poly-component__seller",
                "span.poly-component__brand",
                "p.ui-search-official-store-label",
            ]),
            price_fraction: chain(&["span.andes-money-amount__fraction"]),
            price_cents: chain(&["span.andes-money-amount__cents"]),
            discount: chain(&["span.andes-money-amount__discount"]),
            installments: chain(&["span.poly-price__installments", "span.ui-search-installments"]),
            total_sold: chain(&["span"]),
            shipping: chain(&["div.poly-component-shipping", "p.ui-search-item__shipping"]),
            same_day_arrival: chain(&["span.poly-shipping--same_day"]),
            next_day_arrival: chain(&["span.poly-shipping--next_day"]),
            weekday_arrival_prefix: "span.poly-shipping--".to_string(),
            weekdays: chain(&[
                "monday",
                "tuesday",
                "wednesday",
                "thursday",
                "friday",
                "saturday",
                "sunday",
            ]),
            highlight: chain(&["span.poly-component__highlight"]),
        }
    }
}

/// Ordered selector fallbacks for one field
#[derive(Debug, Clone)]
pub struct SelectorChain {
    field: &'static str,
    selectors: Vec<Selector>,
}

impl SelectorChain {
    pub fn compile(field: &'static str, selector_strings: &[String]) -> Result<Self, ExtractionError> {
        if selector_strings.is_empty() {
            return Err(ExtractionError::EmptySelectorChain { field });
        }
        let selectors = selector_strings
            .iter()
            .map(|s| compile_selector(s))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { field, selectors })
    }

    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn selectors(&self) -> &[Selector] {
        &self.selectors
    }
}

/// Selector chains ready for matching
#[derive(Debug, Clone)]
pub struct CompiledSelectors {
    pub layouts: Vec<(Layout, Selector)>,
    pub link: SelectorChain,
    pub title: SelectorChain,
    pub seller: SelectorChain,
    pub price_fraction: SelectorChain,
    pub price_cents: SelectorChain,
    pub discount: SelectorChain,
    pub installments: SelectorChain,
    pub total_sold: SelectorChain,
    pub shipping: SelectorChain,
    pub same_day_arrival: SelectorChain,
    pub next_day_arrival: SelectorChain,
    pub weekday_arrival: Vec<(String, Selector)>,
    pub highlight: SelectorChain,
}

impl ListingSelectors {
    /// Compile every chain; any invalid selector fails the whole configuration.
    pub fn compile(&self) -> Result<CompiledSelectors, ExtractionError> {
        if self.layouts.is_empty() {
            return Err(ExtractionError::EmptySelectorChain { field: "layouts" });
        }
        let layouts = self
            .layouts
            .iter()
            .map(|entry| Ok((entry.layout, compile_selector(&entry.card)?)))
            .collect::<Result<Vec<_>, ExtractionError>>()?;

        let weekday_arrival = self
            .weekdays
            .iter()
            .map(|day| {
                let selector = format!("{}{}", self.weekday_arrival_prefix, day);
                Ok((day.clone(), compile_selector(&selector)?))
            })
            .collect::<Result<Vec<_>, ExtractionError>>()?;

        Ok(CompiledSelectors {
            layouts,
            link: SelectorChain::compile("link", &self.link)?,
            title: SelectorChain::compile("title", &self.title)?,
            seller: SelectorChain::compile("seller", &self.seller)?,
            price_fraction: SelectorChain::compile("price_fraction", &self.price_fraction)?,
            price_cents: SelectorChain::compile("price_cents", &self.price_cents)?,
            discount: SelectorChain::compile("discount", &self.discount)?,
            installments: SelectorChain::compile("installments", &self.installments)?,
            total_sold: SelectorChain::compile("total_sold", &self.total_sold)?,
            shipping: SelectorChain::compile("shipping", &self.shipping)?,
            same_day_arrival: SelectorChain::compile("same_day_arrival", &self.same_day_arrival)?,
            next_day_arrival: SelectorChain::compile("next_day_arrival", &self.next_day_arrival)?,
            weekday_arrival,
            highlight: SelectorChain::compile("highlight", &self.highlight)?,
        })
    }
}

fn compile_selector(selector: &str) -> Result<Selector, ExtractionError> {
    Selector::parse(selector).map_err(|e| ExtractionError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}
