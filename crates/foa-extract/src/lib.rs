//! Extraction and normalization of a single opportunity page into a [`FoaRecord`].

pub mod dates;
pub mod documents;
pub mod labels;
pub mod patterns;
pub mod tables;
pub mod tags;
pub mod text;

use std::sync::LazyLock;

use foa_core::{ExtractError, FoaRecord, PageVariant};
use scraper::Html;
use tracing::{debug, info};

pub use dates::{normalize_date, to_iso_date};
pub use documents::{candidate_links, select_primary_document, CandidateLink};
pub use labels::{layout_for_variant, LabelExtractor, LabeledValue, PageLayout};
pub use tables::FieldKey;
pub use tags::{TagRule, TagRules, TagRulesError};

pub const CRATE_NAME: &str = "foa-extract";

static DEFAULT_RULES: LazyLock<TagRules> = LazyLock::new(TagRules::default);

/// Build a tree from raw HTML. Only input with no content at all is rejected;
/// markup errors are recovered by the parser.
pub fn parse_document(html: &str) -> Result<Html, ExtractError> {
    if html.trim().is_empty() {
        return Err(ExtractError::MalformedDocument("empty document".to_string()));
    }
    let document = Html::parse_document(html);
    if !document.errors.is_empty() {
        debug!(errors = document.errors.len(), "html parser recovered from markup errors");
    }
    let has_title = text::select_first_text(&document, "title").is_some();
    let body_has_content = text::selector("body")
        .and_then(|sel| document.select(&sel).next())
        .is_some_and(|body| {
            body.children().any(|child| {
                child.value().is_element()
                    || child
                        .value()
                        .as_text()
                        .is_some_and(|t| !t.trim().is_empty())
            })
        });
    if !has_title && !body_has_content {
        return Err(ExtractError::MalformedDocument(
            "no title and no body content".to_string(),
        ));
    }
    Ok(document)
}

/// Resolve the variant, parse, and extract. An explicit variant wins over the
/// one inferred from the URL.
pub fn extract_from_html(
    source_url: &str,
    html: &str,
    variant: Option<PageVariant>,
    rules: &TagRules,
) -> Result<FoaRecord, ExtractError> {
    let variant = match variant {
        Some(v) => v,
        None => PageVariant::from_url(source_url)?,
    };
    let document = parse_document(html)?;
    Ok(extract_with_rules(&document, variant, source_url, rules))
}

/// Extract with the default tag rules.
pub fn extract(document: &Html, variant: PageVariant, source_url: &str) -> FoaRecord {
    extract_with_rules(document, variant, source_url, &DEFAULT_RULES)
}

pub fn extract_with_rules(
    document: &Html,
    variant: PageVariant,
    source_url: &str,
    rules: &TagRules,
) -> FoaRecord {
    let layout = layout_for_variant(variant);
    let labels = LabelExtractor::new(document, layout);
    let mut record = FoaRecord::new(source_url, variant);

    record.opportunity_id = patterns::opportunity_id_from_url(source_url);
    record.title = extract_title(document);
    record.agency = labels.find(FieldKey::Agency);

    record.opportunity_number = labels
        .find(FieldKey::OpportunityNumber)
        .as_deref()
        .and_then(patterns::labeled_opportunity_number)
        .or_else(|| {
            let region = layout.identifier_region(document)?;
            patterns::opportunity_number(&region, layout.opportunity_number_pattern())
        });

    record.posted_date = labels.find(FieldKey::PostedDate).as_deref().and_then(normalize_date);
    record.close_date = labels.find(FieldKey::CloseDate).as_deref().and_then(normalize_date);
    record.archive_date = labels.find(FieldKey::ArchiveDate).as_deref().and_then(normalize_date);

    record.funding_instrument = labels.find(FieldKey::FundingInstrument);
    record.funding_category = labels.find(FieldKey::FundingCategory);
    record.opportunity_category = labels.find(FieldKey::OpportunityCategory);
    record.category_explanation = labels.find(FieldKey::CategoryExplanation);
    record.cost_sharing = labels
        .find(FieldKey::CostSharing)
        .as_deref()
        .and_then(parse_cost_sharing);

    record.assistance_listings = patterns::assistance_listings(labels.page_text());
    record.primary_document = select_primary_document(&candidate_links(document, source_url));
    record.tags = rules.apply(&record);
    record.strip_empty_fields();

    info!(
        source_url,
        variant = %variant,
        title = record.title.is_some(),
        listings = record.assistance_listings.len(),
        tags = record.tags.len(),
        "extracted record"
    );
    record
}

fn extract_title(document: &Html) -> Option<String> {
    text::select_first_text(document, "h1").or_else(|| text::select_first_text(document, "title"))
}

/// `Yes…` / `No…`; anything else is undetermined.
fn parse_cost_sharing(value: &str) -> Option<bool> {
    match value.trim().chars().next().map(|c| c.to_ascii_lowercase()) {
        Some('y') => Some(true),
        Some('n') => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use foa_core::DocumentKind;
    use serde_json::Value as JsonValue;
    use std::fs;
    use std::path::{Path, PathBuf};

    const CLASSIC_URL: &str = "https://www.grants.gov/search-results-detail/357842";
    const SIMPLER_URL: &str =
        "https://simpler.grants.gov/opportunity/0b5a4e2c-1f3d-4c2b-9e77-6a1f2d3c4b5a";

    fn workspace_root() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../..")
            .canonicalize()
            .expect("workspace root")
    }

    fn fixture(variant: &str, name: &str) -> String {
        let path = workspace_root().join("fixtures").join(variant).join(name);
        fs::read_to_string(&path).unwrap_or_else(|e| panic!("reading {}: {e}", path.display()))
    }

    fn snapshot(variant: &str) -> JsonValue {
        serde_json::from_str(&fixture(variant, "snapshot.json")).expect("parse snapshot")
    }

    #[test]
    fn golden_json_snapshot_classic() {
        let record =
            extract_from_html(CLASSIC_URL, &fixture("classic", "page.html"), None, &TagRules::default())
                .unwrap();
        assert_eq!(record.payload().unwrap(), snapshot("classic"));
    }

    #[test]
    fn golden_json_snapshot_simpler() {
        let record =
            extract_from_html(SIMPLER_URL, &fixture("simpler", "page.html"), None, &TagRules::default())
                .unwrap();
        assert_eq!(record.payload().unwrap(), snapshot("simpler"));
    }

    #[test]
    fn extraction_is_deterministic() {
        let html = fixture("classic", "page.html");
        let doc = parse_document(&html).unwrap();
        let first = extract(&doc, PageVariant::Classic, CLASSIC_URL);
        let second = extract(&parse_document(&html).unwrap(), PageVariant::Classic, CLASSIC_URL);
        assert_eq!(first, second);
    }

    #[test]
    fn unrecognized_url_fails_before_parsing() {
        let err = extract_from_html("https://www.grants.gov/about", "", None, &TagRules::default())
            .unwrap_err();
        assert!(matches!(err, ExtractError::UnrecognizedVariant(_)));
    }

    #[test]
    fn explicit_variant_overrides_url() {
        let record = extract_from_html(
            "file:///tmp/saved.html",
            "<html><body><h1>Saved Page</h1></body></html>",
            Some(PageVariant::Simpler),
            &TagRules::default(),
        )
        .unwrap();
        assert_eq!(record.page_variant, PageVariant::Simpler);
        assert_eq!(record.title.as_deref(), Some("Saved Page"));
    }

    #[test]
    fn empty_documents_are_malformed() {
        for html in ["", "   \n", "<html><head></head><body>  </body></html>"] {
            let err = parse_document(html).unwrap_err();
            assert!(matches!(err, ExtractError::MalformedDocument(_)), "{html:?}");
        }
        assert!(parse_document("<p>unclosed <b>tags").is_ok());
    }

    #[test]
    fn sparse_page_degrades_to_small_record() {
        let html = "<html><head><title>Opportunity</title></head><body><p>Nothing here.</p></body></html>";
        let record = extract_from_html(CLASSIC_URL, html, None, &TagRules::default()).unwrap();
        assert_eq!(record.title.as_deref(), Some("Opportunity"));
        assert_eq!(record.opportunity_id.as_deref(), Some("357842"));
        assert_eq!(record.cost_sharing, None);
        assert!(record.tags.is_empty());

        let payload = record.payload().unwrap();
        let keys: Vec<&str> = payload.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["source_url", "page_variant", "opportunity_id", "title"]);
    }

    #[test]
    fn negative_cost_sharing_is_kept() {
        let html = "<html><body><h1>Rural Roads</h1><dl>\
                    <dt>Cost Sharing or Matching Requirement:</dt><dd>No</dd>\
                    <dt>Current Closing Date for Applications:</dt><dd>Not yet posted</dd>\
                    </dl></body></html>";
        let record = extract_from_html(CLASSIC_URL, html, None, &TagRules::default()).unwrap();
        assert_eq!(record.cost_sharing, Some(false));
        assert_eq!(record.close_date, None);
        assert_eq!(record.payload().unwrap()["cost_sharing"], JsonValue::Bool(false));
        assert!(!record.tags.contains("has_deadline"));
    }

    #[test]
    fn labeled_number_is_kept_on_classic_layout() {
        let html = "<html><body><h1>Mathematical Sciences</h1><dl>\
                    <dt>Funding Opportunity Number:</dt><dd>24-567</dd>\
                    </dl></body></html>";
        let record = extract_from_html(CLASSIC_URL, html, None, &TagRules::default()).unwrap();
        assert_eq!(record.opportunity_number.as_deref(), Some("24-567"));
    }

    #[test]
    fn unusable_labeled_number_falls_back_to_header() {
        let html = "<html><body><div class=\"header\"><h1>Rural Broadband</h1>\
                    <h2>USDA-RUS-2025-0101</h2></div><dl>\
                    <dt>Funding Opportunity Number:</dt><dd>N/A</dd>\
                    </dl></body></html>";
        let record = extract_from_html(CLASSIC_URL, html, None, &TagRules::default()).unwrap();
        assert_eq!(record.opportunity_number.as_deref(), Some("USDA-RUS-2025-0101"));
    }

    #[test]
    fn hyphenated_title_words_are_not_numbers() {
        let html = "<html><body><section><h1>COVID-19 Vaccine Outreach for K-12 Schools</h1>\
                    <p>Posted by the program office.</p></section></body></html>";
        for (url, variant) in [(CLASSIC_URL, "classic"), (SIMPLER_URL, "simpler")] {
            let record = extract_from_html(url, html, None, &TagRules::default()).unwrap();
            assert_eq!(record.opportunity_number, None, "{variant}");
        }

        let html = "<html><body><section><h1>COVID-19 Vaccine Outreach</h1>\
                    <p>HHS-2025-CDC-0007</p></section></body></html>";
        let record = extract_from_html(CLASSIC_URL, html, None, &TagRules::default()).unwrap();
        assert_eq!(record.opportunity_number.as_deref(), Some("HHS-2025-CDC-0007"));
    }

    #[test]
    fn cost_sharing_parsing() {
        assert_eq!(parse_cost_sharing("Yes"), Some(true));
        assert_eq!(parse_cost_sharing(" no "), Some(false));
        assert_eq!(parse_cost_sharing("See announcement"), None);
        assert_eq!(parse_cost_sharing(""), None);
    }

    #[test]
    fn classic_fixture_fields() {
        let record =
            extract_from_html(CLASSIC_URL, &fixture("classic", "page.html"), None, &TagRules::default())
                .unwrap();
        assert_eq!(record.close_date, NaiveDate::from_ymd_opt(2025, 7, 15));
        assert_eq!(
            record.primary_document.as_ref().map(|d| d.kind),
            Some(DocumentKind::Pdf)
        );
        assert!(record.tags.contains("ai_ml"));
        assert!(record.tags.contains("cybersecurity"));
    }
}
