//! Extraction strategies over a rendered weather page.
//!
//! Selector drift on the source site is expected, so the primary reading is
//! located by an ordered chain of strategies; the first one that yields text
//! wins. Strategies are pure functions of the parsed document.

use crate::error::{Result, WxError};
use crate::normalize;
use scraper::{Html, Selector};

/// Default fallback chain for the primary temperature element.
pub const DEFAULT_TEMPERATURE_SELECTORS: &[&str] = &["div#wt-temp", "div.h2", "span.h2"];

const FEELS_LIKE_LABEL: &str = "feels like";

/// One way of locating the primary temperature text in a document.
pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &str;
    /// Raw text of the primary temperature, if this strategy finds one.
    fn extract(&self, doc: &Html) -> Option<String>;
}

/// First element matching a CSS selector with non-empty text.
pub struct SelectorStrategy {
    css: String,
    selector: Selector,
}

impl SelectorStrategy {
    pub fn new(css: &str) -> Result<Self> {
        let selector = Selector::parse(css)
            .map_err(|e| WxError::Config(format!("invalid selector {css:?}: {e}")))?;
        Ok(Self {
            css: css.to_string(),
            selector,
        })
    }
}

impl ExtractionStrategy for SelectorStrategy {
    fn name(&self) -> &str {
        &self.css
    }

    fn extract(&self, doc: &Html) -> Option<String> {
        doc.select(&self.selector)
            .map(|el| el.text().collect::<String>().trim().to_string())
            .find(|text| !text.is_empty())
    }
}

/// Build the selector chain, preserving order.
pub fn selector_chain<S: AsRef<str>>(selectors: &[S]) -> Result<Vec<Box<dyn ExtractionStrategy>>> {
    selectors
        .iter()
        .map(|s| {
            SelectorStrategy::new(s.as_ref()).map(|st| Box::new(st) as Box<dyn ExtractionStrategy>)
        })
        .collect()
}

/// A successful primary match.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimaryMatch {
    pub strategy: String,
    pub text: String,
}

/// Apply the chain in order; the first strategy yielding text wins.
pub fn locate_primary(doc: &Html, chain: &[Box<dyn ExtractionStrategy>]) -> Option<PrimaryMatch> {
    chain.iter().find_map(|strategy| {
        strategy.extract(doc).map(|text| PrimaryMatch {
            strategy: strategy.name().to_string(),
            text,
        })
    })
}

/// Best-effort feels-like scan.
///
/// Looks for an explicit "Feels like" label first, then falls back to the
/// first degree-bearing `div`/`span` whose text differs from the primary
/// reading and normalises cleanly. `None` is a normal outcome.
pub fn scan_feels_like(doc: &Html, primary_text: &str) -> Option<f64> {
    labelled_feels_like(doc).or_else(|| degree_scan(doc, primary_text.trim()))
}

fn labelled_feels_like(doc: &Html) -> Option<f64> {
    let selector = Selector::parse("p, div, span").ok()?;
    doc.select(&selector).find_map(|el| {
        let text = el.text().collect::<String>();
        // ASCII lowering keeps byte offsets aligned with `text`
        let lowered = text.to_ascii_lowercase();
        let idx = lowered.find(FEELS_LIKE_LABEL)?;
        normalize::parse_text(&text[idx + FEELS_LIKE_LABEL.len()..], None).ok()
    })
}

fn degree_scan(doc: &Html, primary_text: &str) -> Option<f64> {
    let selector = Selector::parse("div, span").ok()?;
    doc.select(&selector)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|text| text.contains('°') && text != primary_text)
        .find_map(|text| normalize::parse_text(&text, None).ok())
}
