use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::tables::{DateFormat, DATE_FORMATS};

static COMPILED_FORMATS: LazyLock<Vec<(DateFormat, Regex)>> = LazyLock::new(|| {
    DATE_FORMATS
        .iter()
        .map(|format| {
            let re = Regex::new(format.token).expect("static date pattern");
            (*format, re)
        })
        .collect()
});

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static COMMA_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*,\s*").unwrap());

/// Parse the first recognizable date out of free text.
///
/// Formats are tried in table order; within a format, tokens are tried in the
/// order they appear. Returns `None` when nothing parses.
pub fn normalize_date(raw: &str) -> Option<NaiveDate> {
    let text = WHITESPACE_RE.replace_all(raw.trim(), " ");
    if text.is_empty() {
        return None;
    }
    for (format, re) in COMPILED_FORMATS.iter() {
        for token in re.find_iter(&text) {
            let token = canonical_token(token.as_str());
            if let Some(date) = format
                .parse
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(&token, fmt).ok())
            {
                return Some(date);
            }
        }
    }
    None
}

/// `YYYY-MM-DD` rendering of [`normalize_date`].
pub fn to_iso_date(raw: &str) -> Option<String> {
    normalize_date(raw).map(|d| d.format("%Y-%m-%d").to_string())
}

fn canonical_token(token: &str) -> String {
    let token = token.replace('.', "");
    let token = COMMA_RE.replace_all(&token, ", ");
    let token = WHITESPACE_RE.replace_all(&token, " ");
    // chrono only knows the three-letter abbreviation.
    if let Some((month, rest)) = token.split_once(' ') {
        if month.eq_ignore_ascii_case("sept") {
            return format!("Sep {rest}");
        }
    }
    token.into_owned()
}
