//! The harvested listing record and its label types.
//!
//! Boolean-like fields are kept typed in memory and rendered as the label
//! strings the downstream loader expects (`Yes`/`No`, `Sem Juros`/`Com Juros`)
//! only when serialized.

use chrono::NaiveDateTime;
use serde::{Serialize, Serializer};
use std::fmt;

/// Sentinel for text fields no selector could fill.
pub const NOT_AVAILABLE: &str = "N/A";

/// Output timestamp format.
pub const EXTRACTION_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Column order of the emitted row format.
pub const COLUMNS: [&str; 17] = [
    "extraction_date",
    "cycle_id",
    "title",
    "seller",
    "price",
    "discount",
    "installments",
    "interest_free",
    "total_sold_raw",
    "free_delivery",
    "arrival_estimation",
    "is_great_deal",
    "is_bestseller",
    "is_recommended",
    "link",
    "layout_type",
    "price_range_searched",
];

/// Which of the two listing page structures a card was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    Grid,
    List,
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layout::Grid => write!(f, "grid"),
            Layout::List => write!(f, "list"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterestTerms {
    InterestFree,
    WithInterest,
}

impl InterestTerms {
    pub fn label(self) -> &'static str {
        match self {
            InterestTerms::InterestFree => "Sem Juros",
            InterestTerms::WithInterest => "Com Juros",
        }
    }
}

/// One listing card, as appended to the sink. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedRecord {
    #[serde(serialize_with = "serialize_timestamp")]
    pub extraction_date: NaiveDateTime,
    pub cycle_id: u64,
    pub title: String,
    pub seller: String,
    /// Raw `integer.fraction` string; numeric parsing happens downstream.
    pub price: String,
    pub discount: String,
    pub installments: String,
    #[serde(serialize_with = "serialize_interest")]
    pub interest_free: Option<InterestTerms>,
    pub total_sold_raw: String,
    #[serde(serialize_with = "serialize_yes_no")]
    pub free_delivery: bool,
    pub arrival_estimation: String,
    #[serde(serialize_with = "serialize_yes_no")]
    pub is_great_deal: bool,
    #[serde(serialize_with = "serialize_yes_no")]
    pub is_bestseller: bool,
    #[serde(serialize_with = "serialize_yes_no")]
    pub is_recommended: bool,
    /// Normalized identity: query string and fragment removed.
    pub link: String,
    pub layout_type: Layout,
    pub price_range_searched: String,
}

pub fn yes_no(flag: bool) -> &'static str {
    if flag { "Yes" } else { "No" }
}

fn serialize_yes_no<S: Serializer>(flag: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(yes_no(*flag))
}

fn serialize_interest<S: Serializer>(
    terms: &Option<InterestTerms>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(terms.map_or(NOT_AVAILABLE, InterestTerms::label))
}

fn serialize_timestamp<S: Serializer>(
    timestamp: &NaiveDateTime,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&timestamp.format(EXTRACTION_DATE_FORMAT))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_record() -> ExtractedRecord {
        ExtractedRecord {
            extraction_date: NaiveDate::from_ymd_opt(2024, 5, 1)
                .unwrap()
                .and_hms_opt(8, 30, 0)
                .unwrap(),
            cycle_id: 3,
            title: "Samsung Galaxy A15".to_string(),
            seller: "Loja oficial Samsung".to_string(),
            price: "1.099.90".to_string(),
            discount: "12%".to_string(),
            installments: "10".to_string(),
            interest_free: Some(InterestTerms::InterestFree),
            total_sold_raw: NOT_AVAILABLE.to_string(),
            free_delivery: true,
            arrival_estimation: "Tomorrow".to_string(),
            is_great_deal: false,
            is_bestseller: true,
            is_recommended: false,
            link: "https://produto.example.com/MLB-123".to_string(),
            layout_type: Layout::Grid,
            price_range_searched: "1050-1099".to_string(),
        }
    }

    #[test]
    fn serialized_header_matches_column_order() {
        let mut writer = csv::WriterBuilder::new().delimiter(b';').from_writer(vec![]);
        writer.serialize(sample_record()).unwrap();
        let output = String::from_utf8(writer.into_inner().unwrap()).unwrap();

        let header = output.lines().next().unwrap();
        assert_eq!(header, COLUMNS.join(";"));
    }

    #[test]
    fn flags_are_rendered_as_labels() {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b';')
            .has_headers(false)
            .from_writer(vec![]);
        let mut record = sample_record();
        record.interest_free = None;
        writer.serialize(&record).unwrap();
        let output = String::from_utf8(writer.into_inner().unwrap()).unwrap();

        assert_eq!(
            output.trim_end(),
            "2024-05-01 08:30:00;3;Samsung Galaxy A15;Loja oficial Samsung;1.099.90;12%;10;N/A;N/A;\
             Yes;Tomorrow;No;Yes;No;https://produto.example.com/MLB-123;grid;1050-1099"
        );
    }
}
