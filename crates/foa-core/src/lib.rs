//! Core record model and error taxonomy for FOA ingestion.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

pub const CRATE_NAME: &str = "foa-core";

/// Structural failures. A missing field is never one of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("url does not match a known page layout: {0}")]
    UnrecognizedVariant(String),
    #[error("malformed document: {0}")]
    MalformedDocument(String),
}

/// The two supported layouts of the opportunity directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageVariant {
    Classic,
    Simpler,
}

impl PageVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageVariant::Classic => "classic",
            PageVariant::Simpler => "simpler",
        }
    }

    /// Infer the layout from the URL path shape.
    pub fn from_url(source_url: &str) -> Result<Self, ExtractError> {
        let parsed = Url::parse(source_url)
            .map_err(|_| ExtractError::UnrecognizedVariant(source_url.to_string()))?;
        let path = parsed.path();
        if path.contains("search-results-detail") {
            Ok(PageVariant::Classic)
        } else if path.contains("opportunity/") {
            Ok(PageVariant::Simpler)
        } else {
            Err(ExtractError::UnrecognizedVariant(source_url.to_string()))
        }
    }
}

impl fmt::Display for PageVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PageVariant {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "classic" => Ok(PageVariant::Classic),
            "simpler" => Ok(PageVariant::Simpler),
            other => Err(ExtractError::UnrecognizedVariant(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Pdf,
    ExternalLink,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::ExternalLink => "external_link",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryDocument {
    pub url: String,
    pub kind: DocumentKind,
}

/// One normalized opportunity page.
///
/// Absent values are `None` or empty collections; serialization skips them, so
/// the serialized form is the stripped payload. `cost_sharing` keeps an explicit
/// `Some(false)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoaRecord {
    pub source_url: String,
    pub page_variant: PageVariant,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub opportunity_id: Option<String>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub opportunity_number: Option<String>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub agency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posted_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub funding_instrument: Option<String>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub funding_category: Option<String>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub opportunity_category: Option<String>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub category_explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assistance_listings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_sharing: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_document: Option<PrimaryDocument>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |s| s.trim().is_empty())
}

fn blank_to_none(field: &mut Option<String>) {
    if is_blank(field) {
        *field = None;
    }
}

impl FoaRecord {
    pub fn new(source_url: impl Into<String>, page_variant: PageVariant) -> Self {
        Self {
            source_url: source_url.into(),
            page_variant,
            opportunity_id: None,
            opportunity_number: None,
            title: None,
            agency: None,
            posted_date: None,
            close_date: None,
            archive_date: None,
            funding_instrument: None,
            funding_category: None,
            opportunity_category: None,
            category_explanation: None,
            assistance_listings: Vec::new(),
            cost_sharing: None,
            primary_document: None,
            tags: BTreeSet::new(),
        }
    }

    /// Normalize blank strings and empty list entries to absence.
    pub fn strip_empty_fields(&mut self) {
        blank_to_none(&mut self.opportunity_id);
        blank_to_none(&mut self.opportunity_number);
        blank_to_none(&mut self.title);
        blank_to_none(&mut self.agency);
        blank_to_none(&mut self.funding_instrument);
        blank_to_none(&mut self.funding_category);
        blank_to_none(&mut self.opportunity_category);
        blank_to_none(&mut self.category_explanation);
        self.assistance_listings.retain(|s| !s.trim().is_empty());
        self.tags.retain(|s| !s.trim().is_empty());
        if self
            .primary_document
            .as_ref()
            .is_some_and(|doc| doc.url.trim().is_empty())
        {
            self.primary_document = None;
        }
    }

    /// The canonical output payload: only populated keys, in declaration order.
    pub fn payload(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}
