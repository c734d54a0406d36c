//! Extraction error types
//!
//! Card-level failures are isolated by the extractor and reported with the
//! page result; selector errors surface at configuration time.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("card has no link with a usable href")]
    MissingIdentity,

    #[error("invalid listing link '{href}': {reason}")]
    InvalidIdentity { href: String, reason: String },

    #[error("malformed {field} text: '{value}'")]
    MalformedField { field: &'static str, value: String },

    #[error("invalid CSS selector: {selector} - {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("selector chain for '{field}' is empty")]
    EmptySelectorChain { field: &'static str },

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

impl ExtractionError {
    pub fn malformed(field: &'static str, value: impl Into<String>) -> Self {
        Self::MalformedField {
            field,
            value: value.into(),
        }
    }

    pub fn invalid_identity(href: &str, reason: impl ToString) -> Self {
        Self::InvalidIdentity {
            href: href.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type ExtractionResult<T> = Result<T, ExtractionError>;
