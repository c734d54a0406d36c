//! Page-level context shared by every card extracted from one fetch.

use chrono::{Local, NaiveDateTime};

use crate::domain::PriceRange;

/// Provenance stamped onto each record of a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContext {
    pub cycle_id: u64,

    /// Inclusive price label as queried, e.g. `1200-1249`
    pub price_range_label: String,

    /// One timestamp per page; all its records share it
    pub extracted_at: NaiveDateTime,
}

impl PageContext {
    pub fn new(cycle_id: u64, range: &PriceRange) -> Self {
        Self {
            cycle_id,
            price_range_label: range.query_label(),
            extracted_at: Local::now().naive_local(),
        }
    }

    /// Fix the extraction timestamp (tests, replays)
    #[must_use]
    pub fn with_timestamp(mut self, extracted_at: NaiveDateTime) -> Self {
        self.extracted_at = extracted_at;
        self
    }
}
