//! Soft-ban detection
//!
//! A challenge page is served with status 200 in place of results, so the
//! only signal is its text. The guard only classifies; cooldown and retry
//! are the controller's decision.

use scraper::Html;

use crate::infrastructure::config::GuardConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardVerdict {
    Clear,
    SoftBanDetected { trigger: String },
}

impl GuardVerdict {
    pub fn is_clear(&self) -> bool {
        matches!(self, GuardVerdict::Clear)
    }
}

#[derive(Debug, Clone)]
pub struct AntiBotGuard {
    trigger_terms: Vec<String>,
}

impl AntiBotGuard {
    pub fn new(trigger_terms: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            trigger_terms: trigger_terms
                .into_iter()
                .map(|term| term.into().to_lowercase())
                .collect(),
        }
    }

    pub fn from_config(config: &GuardConfig) -> Self {
        Self::new(config.trigger_terms.iter().cloned())
    }

    /// Check the rendered text of the page (markup and attributes ignored).
    pub fn inspect(&self, html: &Html) -> GuardVerdict {
        let text = html.root_element().text().collect::<String>().to_lowercase();
        self.inspect_text(&text)
    }

    /// `text` must already be lower-cased.
    pub fn inspect_text(&self, text: &str) -> GuardVerdict {
        self.trigger_terms
            .iter()
            .find(|term| text.contains(term.as_str()))
            .map_or(GuardVerdict::Clear, |term| GuardVerdict::SoftBanDetected {
                trigger: term.clone(),
            })
    }
}

impl Default for AntiBotGuard {
    fn default() -> Self {
        Self::from_config(&GuardConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn challenge_page_is_detected() {
        let html = Html::parse_document(
            "<html><body><h1>Confirme que você é HUMANO</h1><div id='captcha'></div></body></html>",
        );
        assert_eq!(
            AntiBotGuard::default().inspect(&html),
            GuardVerdict::SoftBanDetected {
                trigger: "human".to_string()
            }
        );
    }

    #[test]
    fn trigger_in_markup_only_is_ignored() {
        let html = Html::parse_document(
            r#"<html><body><div class="captcha-free"><div class="poly-card__content">Galaxy</div></div></body></html>"#,
        );
        assert!(AntiBotGuard::default().inspect(&html).is_clear());
    }

    #[test]
    fn custom_terms_are_case_insensitive() {
        let guard = AntiBotGuard::new(["Access Denied"]);
        assert!(!guard.inspect_text("error: access denied").is_clear());
        assert!(guard.inspect_text("results").is_clear());
    }
}
