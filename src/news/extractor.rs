use scraper::{Html, Selector};
use thiserror::Error;

use crate::util::strip_control_chars;

/// Link text under the hot-news block and the tabbed news modules.
pub const DEFAULT_SELECTORS: &[&str] = &["div.hotnews a", "div.mod-tab-content a"];

/// Texts of this many characters or fewer are navigation noise.
const MIN_TEXT_CHARS: usize = 2;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },
}

/// Turns a page into the list of news texts.
pub trait Extractor: Send + Sync {
    /// Extract texts in output order. Markup that matches nothing yields
    /// an empty list, not an error.
    fn extract(&self, markup: &str) -> Vec<String>;
}

/// CSS-selector driven extractor.
///
/// Selectors are applied in configured order; within one selector,
/// matches come out in document order. Duplicates are kept.
#[derive(Debug)]
pub struct SelectorExtractor {
    selectors: Vec<Selector>,
}

impl SelectorExtractor {
    pub fn new<S: AsRef<str>>(selectors: &[S]) -> Result<Self, ExtractError> {
        let selectors = selectors
            .iter()
            .map(|s| {
                let s = s.as_ref();
                Selector::parse(s).map_err(|e| ExtractError::InvalidSelector {
                    selector: s.to_string(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { selectors })
    }

    pub fn with_defaults() -> Result<Self, ExtractError> {
        Self::new(DEFAULT_SELECTORS)
    }
}

impl Extractor for SelectorExtractor {
    fn extract(&self, markup: &str) -> Vec<String> {
        let document = Html::parse_document(markup);
        let mut texts = Vec::new();

        for selector in &self.selectors {
            for element in document.select(selector) {
                let raw: String = element.text().collect();
                let cleaned = strip_control_chars(&raw);
                let text = cleaned.trim();
                if text.chars().count() > MIN_TEXT_CHARS {
                    texts.push(text.to_string());
                }
            }
        }

        tracing::debug!(
            selectors = self.selectors.len(),
            items = texts.len(),
            "Extracted news texts"
        );
        texts
    }
}
