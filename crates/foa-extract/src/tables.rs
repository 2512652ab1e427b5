//! Static lookup tables: label spellings, date formats, link labels, tag keywords.

use serde::{Deserialize, Serialize};

/// Canonical fields located through human-readable labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKey {
    OpportunityNumber,
    Agency,
    PostedDate,
    CloseDate,
    ArchiveDate,
    FundingInstrument,
    FundingCategory,
    OpportunityCategory,
    CategoryExplanation,
    CostSharing,
}

impl FieldKey {
    pub const ALL: [FieldKey; 10] = [
        FieldKey::OpportunityNumber,
        FieldKey::Agency,
        FieldKey::PostedDate,
        FieldKey::CloseDate,
        FieldKey::ArchiveDate,
        FieldKey::FundingInstrument,
        FieldKey::FundingCategory,
        FieldKey::OpportunityCategory,
        FieldKey::CategoryExplanation,
        FieldKey::CostSharing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKey::OpportunityNumber => "opportunity_number",
            FieldKey::Agency => "agency",
            FieldKey::PostedDate => "posted_date",
            FieldKey::CloseDate => "close_date",
            FieldKey::ArchiveDate => "archive_date",
            FieldKey::FundingInstrument => "funding_instrument",
            FieldKey::FundingCategory => "funding_category",
            FieldKey::OpportunityCategory => "opportunity_category",
            FieldKey::CategoryExplanation => "category_explanation",
            FieldKey::CostSharing => "cost_sharing",
        }
    }
}

/// Canonical field to label spellings, highest priority first.
pub type LabelTable = &'static [(FieldKey, &'static [&'static str])];

pub const CLASSIC_LABELS: LabelTable = &[
    (
        FieldKey::OpportunityNumber,
        &["Funding Opportunity Number", "Opportunity Number"],
    ),
    (FieldKey::Agency, &["Agency Name", "Agency"]),
    (FieldKey::PostedDate, &["Posted Date"]),
    (
        FieldKey::CloseDate,
        &[
            "Current Closing Date for Applications",
            "Original Closing Date for Applications",
            "Closing Date",
        ],
    ),
    (FieldKey::ArchiveDate, &["Archive Date"]),
    (FieldKey::FundingInstrument, &["Funding Instrument Type"]),
    (FieldKey::FundingCategory, &["Category of Funding Activity"]),
    (FieldKey::OpportunityCategory, &["Opportunity Category"]),
    (
        FieldKey::CategoryExplanation,
        &["Opportunity Category Explanation", "Category Explanation"],
    ),
    (
        FieldKey::CostSharing,
        &["Cost Sharing or Matching Requirement", "Cost Sharing"],
    ),
];

pub const SIMPLER_LABELS: LabelTable = &[
    (
        FieldKey::OpportunityNumber,
        &["Funding opportunity number", "Opportunity number"],
    ),
    (FieldKey::Agency, &["Agency"]),
    (FieldKey::PostedDate, &["Posted date"]),
    (FieldKey::CloseDate, &["Closing", "Close date", "Closing date"]),
    (FieldKey::ArchiveDate, &["Archive date"]),
    (
        FieldKey::FundingInstrument,
        &["Funding instrument type", "Funding instrument"],
    ),
    (
        FieldKey::FundingCategory,
        &["Category of Funding Activity", "Funding activity category"],
    ),
    (FieldKey::OpportunityCategory, &["Opportunity Category"]),
    (
        FieldKey::CategoryExplanation,
        &["Opportunity Category Explanation", "Category Explanation"],
    ),
    (
        FieldKey::CostSharing,
        &["Cost sharing or matching requirement", "Cost sharing"],
    ),
];

/// Labels that terminate a value during the whole-page scan, beyond the
/// label tables themselves.
pub const EXTRA_STOP_LABELS: &[&str] = &[
    "Assistance Listings",
    "CFDA Number(s)",
    "Last Updated",
    "Last Updated Date",
    "Version",
    "Expected Number of Awards",
    "Estimated Total Program Funding",
    "Award Ceiling",
    "Award Floor",
    "Eligible Applicants",
    "Additional Information on Eligibility",
    "Description",
    "Grantor Contact Information",
];

/// Longest value the whole-page scan will return.
pub const PAGE_SCAN_MAX_CHARS: usize = 500;

/// Anchor labels marking the official announcement page.
pub const OFFICIAL_LINK_LABELS: &[&str] = &[
    "View Full Announcement",
    "Full Announcement",
    "View Announcement",
    "Official Announcement",
    "Link to Additional Information",
];

/// One recognized input date shape: a token pattern plus the chrono formats
/// tried on each token it finds.
#[derive(Debug, Clone, Copy)]
pub struct DateFormat {
    pub name: &'static str,
    pub token: &'static str,
    pub parse: &'static [&'static str],
}

pub const DATE_FORMATS: &[DateFormat] = &[
    DateFormat {
        name: "month_day_year",
        token: r"\b[A-Za-z]{3,9}\.?\s+\d{1,2},\s*\d{4}\b",
        parse: &["%B %d, %Y", "%b %d, %Y"],
    },
    DateFormat {
        name: "us_slash",
        token: r"\b\d{1,2}/\d{1,2}/\d{4}\b",
        parse: &["%m/%d/%Y"],
    },
    DateFormat {
        name: "iso",
        token: r"\b\d{4}-\d{2}-\d{2}\b",
        parse: &["%Y-%m-%d"],
    },
];

pub const ASSISTANCE_LISTING_PATTERN: &str = r"\b\d{2}\.\d{3}\b";

/// Classic numbers start with an agency prefix: `HHS-2025-ACF-OCS-EE-0012`.
pub const CLASSIC_OPPORTUNITY_NUMBER_PATTERN: &str = r"\b[A-Z][A-Z0-9]*(?:-[A-Z0-9]+)+\b";

/// The simpler layout also lists bare numeric announcements such as `24-567`.
pub const SIMPLER_OPPORTUNITY_NUMBER_PATTERN: &str = r"\b[A-Z0-9]+(?:-[A-Z0-9]+)+\b";

/// A value already labeled as the announcement number: any hyphen-joined token.
pub const LABELED_OPPORTUNITY_NUMBER_PATTERN: &str = r"\b[A-Za-z0-9]+(?:-[A-Za-z0-9]+)*\b";

pub const TAG_RULES_VERSION: u32 = 1;

pub const TAG_HAS_DEADLINE: &str = "has_deadline";
pub const TAG_COST_SHARING: &str = "cost_sharing";

/// Keyword rule over `title + agency + funding_category`.
#[derive(Debug, Clone, Copy)]
pub struct StaticTagRule {
    pub tag: &'static str,
    /// Case-insensitive substrings.
    pub contains_any: &'static [&'static str],
    /// Case-insensitive whole words.
    pub words_any: &'static [&'static str],
}

pub const DEFAULT_TAG_RULES: &[StaticTagRule] = &[
    StaticTagRule {
        tag: "health_biomed",
        contains_any: &["health", "disease", "registry", "biomedical", "clinical"],
        words_any: &["cdc", "nih"],
    },
    StaticTagRule {
        tag: "ai_ml",
        contains_any: &[
            "machine learning",
            "artificial intelligence",
            "deep learning",
        ],
        words_any: &["ai", "ml", "llm", "nlp"],
    },
    StaticTagRule {
        tag: "cybersecurity",
        contains_any: &["cyber", "ransomware", "phishing", "zero trust", "infosec"],
        words_any: &[],
    },
    StaticTagRule {
        tag: "education",
        contains_any: &["education", "teacher", "school", "curriculum"],
        words_any: &[],
    },
    StaticTagRule {
        tag: "climate_environment",
        contains_any: &["climate", "environment", "sustainability", "emissions"],
        words_any: &[],
    },
    StaticTagRule {
        tag: "energy",
        contains_any: &["energy", "renewable", "solar", "battery"],
        words_any: &["wind", "grid"],
    },
];
