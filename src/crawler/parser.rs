//! HTML parser for extracting quotations
//!
//! This module reads a rendered listing page and extracts:
//! - One record per quote container (text, author, joined tags)
//! - A fault for each container missing its text or author
//! - Whether an enabled "next page" control is present

use crate::config::SelectorConfig;
use crate::storage::NewQuote;
use crate::ConfigError;
use scraper::{ElementRef, Html, Selector};
use std::fmt;

/// Separator placed between tag tokens
pub const TAG_SEPARATOR: &str = ",";

/// Compiled CSS selectors for a listing page
#[derive(Debug, Clone)]
pub struct QuoteSelectors {
    quote: Selector,
    text: Selector,
    author: Selector,
    tag: Selector,
    next: Selector,
    next_source: String,
}

impl QuoteSelectors {
    /// Compiles the configured selectors
    pub fn from_config(config: &SelectorConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            quote: compile("quote", &config.quote)?,
            text: compile("text", &config.text)?,
            author: compile("author", &config.author)?,
            tag: compile("tag", &config.tag)?,
            next: compile("next", &config.next)?,
            next_source: config.next.clone(),
        })
    }

    /// The "next page" selector as written, for handing to the browser
    pub fn next_selector(&self) -> &str {
        &self.next_source
    }
}

impl Default for QuoteSelectors {
    fn default() -> Self {
        Self::from_config(&SelectorConfig::default())
            .unwrap_or_else(|e| unreachable!("built-in selectors are valid: {}", e))
    }
}

fn compile(name: &str, selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|e| {
        ConfigError::InvalidSelector(format!("{} selector '{}': {:?}", name, selector, e))
    })
}

/// Field a malformed quote container was missing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingField {
    Text,
    Author,
}

impl fmt::Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Author => write!(f, "author"),
        }
    }
}

/// A quote container that could not be read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionFault {
    /// Zero-based position of the container on the page
    pub index: usize,
    pub missing: MissingField,
}

impl fmt::Display for ExtractionFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "quote #{} has no {} element", self.index, self.missing)
    }
}

/// Everything read from one page
#[derive(Debug, Clone, Default)]
pub struct PageExtraction {
    /// Well-formed quotes in document order
    pub quotes: Vec<NewQuote>,

    /// One entry per skipped container
    pub faults: Vec<ExtractionFault>,

    /// An enabled "next page" control is present
    pub has_next: bool,
}

/// Extracts quotes and pagination state from rendered HTML
///
/// Malformed containers are reported in `faults` and never stop extraction
/// of their siblings.
///
/// # Example
///
/// ```
/// use quotebook::crawler::{extract_quotes, QuoteSelectors};
///
/// let html = r#"<div class="quote"><span class="text">Hi</span>
///     <small class="author">Me</small><a class="tag">a</a><a class="tag">b</a></div>"#;
/// let page = extract_quotes(html, &QuoteSelectors::default());
/// assert_eq!(page.quotes[0].tags, "a,b");
/// assert!(!page.has_next);
/// ```
pub fn extract_quotes(html: &str, selectors: &QuoteSelectors) -> PageExtraction {
    let document = Html::parse_document(html);

    let mut extraction = PageExtraction {
        has_next: has_enabled_next(&document, selectors),
        ..PageExtraction::default()
    };

    for (index, container) in document.select(&selectors.quote).enumerate() {
        match read_quote(container, selectors) {
            Ok(quote) => extraction.quotes.push(quote),
            Err(missing) => extraction.faults.push(ExtractionFault { index, missing }),
        }
    }

    extraction
}

/// Counts quote containers without reading them
pub fn count_quotes(html: &str, selectors: &QuoteSelectors) -> usize {
    Html::parse_document(html).select(&selectors.quote).count()
}

fn read_quote(container: ElementRef<'_>, selectors: &QuoteSelectors) -> Result<NewQuote, MissingField> {
    let text = container
        .select(&selectors.text)
        .next()
        .map(element_text)
        .ok_or(MissingField::Text)?;

    let author = container
        .select(&selectors.author)
        .next()
        .map(element_text)
        .ok_or(MissingField::Author)?;

    let tags = container
        .select(&selectors.tag)
        .map(element_text)
        .collect::<Vec<_>>()
        .join(TAG_SEPARATOR);

    Ok(NewQuote { text, author, tags })
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn has_enabled_next(document: &Html, selectors: &QuoteSelectors) -> bool {
    document.select(&selectors.next).any(is_enabled)
}

/// Disabled controls carry a `disabled` attribute, `aria-disabled="true"`,
/// or sit inside an element with the `disabled` class
fn is_enabled(element: ElementRef<'_>) -> bool {
    let value = element.value();
    if value.attr("disabled").is_some() || value.attr("aria-disabled") == Some("true") {
        return false;
    }

    let has_disabled_class = |el: &ElementRef<'_>| {
        el.value()
            .classes()
            .any(|class| class.eq_ignore_ascii_case("disabled"))
    };

    !has_disabled_class(&element)
        && !element
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|el| has_disabled_class(&el))
}
