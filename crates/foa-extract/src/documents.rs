use foa_core::{DocumentKind, PrimaryDocument};
use scraper::Html;
use tracing::debug;
use url::Url;

use crate::labels::label_matches;
use crate::tables::OFFICIAL_LINK_LABELS;
use crate::text::{clean_text, selector};

/// A link on the page that could be the primary document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateLink {
    pub url: String,
    pub text: String,
    /// Non-empty `title` and `aria-label` attributes, in that order.
    pub labels: Vec<String>,
}

impl CandidateLink {
    pub fn new(url: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            text: text.into(),
            labels: Vec::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }

    fn is_pdf(&self) -> bool {
        let path = match Url::parse(&self.url) {
            Ok(parsed) => parsed.path().to_string(),
            Err(_) => self
                .url
                .split(['?', '#'])
                .next()
                .unwrap_or_default()
                .to_string(),
        };
        path.to_ascii_lowercase().ends_with(".pdf")
    }

    fn is_official(&self) -> bool {
        OFFICIAL_LINK_LABELS.iter().any(|label| {
            label_matches(&self.text, label)
                || self.labels.iter().any(|attr| label_matches(attr, label))
        })
    }
}

/// Every `<a href>` in document order, resolved against the page URL.
pub fn candidate_links(document: &Html, base_url: &str) -> Vec<CandidateLink> {
    let Some(anchors) = selector("a[href]") else {
        return Vec::new();
    };
    let base = Url::parse(base_url).ok();

    document
        .select(&anchors)
        .filter_map(|anchor| {
            let href = anchor.value().attr("href")?.trim();
            let lower = href.to_ascii_lowercase();
            if href.is_empty()
                || href.starts_with('#')
                || lower.starts_with("javascript:")
                || lower.starts_with("mailto:")
                || lower.starts_with("tel:")
            {
                return None;
            }
            let resolved = match &base {
                Some(base) => base.join(href).ok()?.to_string(),
                None => Url::parse(href).ok()?.to_string(),
            };
            let labels = ["title", "aria-label"]
                .into_iter()
                .filter_map(|name| anchor.value().attr(name))
                .map(clean_text)
                .filter(|label| !label.is_empty())
                .collect();
            Some(CandidateLink {
                url: resolved,
                text: clean_text(&anchor.text().collect::<Vec<_>>().join(" ")),
                labels,
            })
        })
        .collect()
}

/// Pick the primary document: the first PDF link, else the first link labeled
/// as the official announcement, else nothing.
pub fn select_primary_document(candidates: &[CandidateLink]) -> Option<PrimaryDocument> {
    if let Some(pdf) = candidates.iter().find(|c| c.is_pdf()) {
        return Some(PrimaryDocument {
            url: pdf.url.clone(),
            kind: DocumentKind::Pdf,
        });
    }
    if let Some(official) = candidates.iter().find(|c| c.is_official()) {
        return Some(PrimaryDocument {
            url: official.url.clone(),
            kind: DocumentKind::ExternalLink,
        });
    }
    debug!(candidates = candidates.len(), "no primary document among links");
    None
}
