use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::tables::{
    ASSISTANCE_LISTING_PATTERN, CLASSIC_OPPORTUNITY_NUMBER_PATTERN,
    LABELED_OPPORTUNITY_NUMBER_PATTERN, SIMPLER_OPPORTUNITY_NUMBER_PATTERN,
};

static ASSISTANCE_LISTING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(ASSISTANCE_LISTING_PATTERN).unwrap());
pub(crate) static CLASSIC_OPPORTUNITY_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(CLASSIC_OPPORTUNITY_NUMBER_PATTERN).unwrap());
pub(crate) static SIMPLER_OPPORTUNITY_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(SIMPLER_OPPORTUNITY_NUMBER_PATTERN).unwrap());
static LABELED_OPPORTUNITY_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(LABELED_OPPORTUNITY_NUMBER_PATTERN).unwrap());
static CLASSIC_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/search-results-detail/(\d+)").unwrap());
static SIMPLER_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/opportunity/([0-9a-fA-F-]{16,})").unwrap());

/// All `NN.NNN` assistance listing numbers in the text, deduplicated, in order
/// of first appearance.
pub fn assistance_listings(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    ASSISTANCE_LISTING_RE
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|code| seen.insert(*code))
        .map(ToString::to_string)
        .collect()
}

/// First announcement-number token in the region. Tokens without a digit are
/// words that merely contain a hyphen.
pub fn opportunity_number(region: &str, pattern: &Regex) -> Option<String> {
    pattern
        .find_iter(region)
        .map(|m| m.as_str())
        .find(|token| token.chars().any(|c| c.is_ascii_digit()))
        .map(ToString::to_string)
}

/// Announcement number from a labeled value. The label already says what the
/// value is, so any digit-bearing token is accepted regardless of layout.
pub fn labeled_opportunity_number(value: &str) -> Option<String> {
    opportunity_number(value, &LABELED_OPPORTUNITY_NUMBER_RE)
}

/// Site-internal identifier carried in the page URL.
pub fn opportunity_id_from_url(url: &str) -> Option<String> {
    CLASSIC_ID_RE
        .captures(url)
        .or_else(|| SIMPLER_ID_RE.captures(url))
        .map(|caps| caps[1].to_string())
}
