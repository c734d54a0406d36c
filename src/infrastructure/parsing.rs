//! HTML parsing infrastructure for listing pages
//!
//! Selector chains are configuration data (`config`), compiled once and
//! applied per card by the `RecordExtractor`.

pub mod config;
pub mod context;
pub mod error;
pub mod listing_parser;

pub use self::config::{CompiledSelectors, LayoutSelector, ListingSelectors, SelectorChain};
pub use context::PageContext;
pub use error::{ExtractionError, ExtractionResult};
pub use listing_parser::{CardFailure, HighlightFlags, PageExtraction, RecordExtractor, parse_installments};
