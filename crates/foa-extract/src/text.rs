//! Text helpers over the parsed tree.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::warn;

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

const SKIPPED_TEXT_PARENTS: &[&str] = &["script", "style", "noscript", "template"];

pub fn clean_text(value: &str) -> String {
    WHITESPACE_RE.replace_all(value.trim(), " ").into_owned()
}

pub fn text_or_none(value: &str) -> Option<String> {
    let cleaned = clean_text(value);
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Whitespace-collapsed text of an element and its descendants.
pub fn element_text(element: ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<Vec<_>>().join(" "))
}

/// Every visible text node of the page, in document order, as one line.
pub fn page_text(document: &Html) -> String {
    let root = document.root_element();
    let parts = root
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let parent = node.parent().and_then(ElementRef::wrap);
            if parent.is_some_and(|p| SKIPPED_TEXT_PARENTS.contains(&p.value().name())) {
                return None;
            }
            let text = text.trim();
            (!text.is_empty()).then_some(text)
        })
        .collect::<Vec<_>>();
    clean_text(&parts.join(" "))
}

/// Parse a CSS selector, logging and skipping it when it is invalid.
pub fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(sel) => Some(sel),
        Err(err) => {
            warn!(selector = css, error = %err, "skipping unparsable selector");
            None
        }
    }
}

pub fn select_first_text(document: &Html, css: &str) -> Option<String> {
    let sel = selector(css)?;
    document
        .select(&sel)
        .find_map(|el| text_or_none(&element_text(el)))
}
