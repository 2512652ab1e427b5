//! Label-driven field lookup over the two page layouts.
//!
//! Each layout knows its own label spellings and its own key/value containers.
//! Lookup for one field tries every label spelling against the layout's
//! containers first, then falls back to scanning the page text for
//! `Label: value`. First match wins; no step ever fails hard.

use foa_core::PageVariant;
use regex::Regex;
use scraper::{ElementRef, Html};
use tracing::debug;

use crate::patterns::{CLASSIC_OPPORTUNITY_NUMBER_RE, SIMPLER_OPPORTUNITY_NUMBER_RE};
use crate::tables::{
    FieldKey, LabelTable, CLASSIC_LABELS, EXTRA_STOP_LABELS, PAGE_SCAN_MAX_CHARS, SIMPLER_LABELS,
};
use crate::text::{clean_text, element_text, page_text, selector, text_or_none};

/// One label/value pair found inside a layout container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledValue {
    pub label: String,
    pub value: String,
}

/// Variant-specific extraction strategy.
pub trait PageLayout: Send + Sync {
    fn variant(&self) -> PageVariant;

    fn label_table(&self) -> LabelTable;

    /// Label/value pairs from the layout's structural containers, in a fixed order.
    fn labeled_values(&self, document: &Html) -> Vec<LabeledValue>;

    fn opportunity_number_pattern(&self) -> &'static Regex;

    /// Text of the page header block around the title, where the announcement
    /// number is printed. The title itself is left out.
    fn identifier_region(&self, document: &Html) -> Option<String> {
        let h1 = selector("h1")?;
        let heading = document.select(&h1).next()?;
        let header = heading.parent()?;
        let parts = header
            .children()
            .filter(|node| node.id() != heading.id())
            .flat_map(|node| node.descendants())
            .filter_map(|node| node.value().as_text().map(|text| text.trim().to_string()))
            .collect::<Vec<_>>();
        text_or_none(&parts.join(" "))
    }

    fn labels_for(&self, field: FieldKey) -> &'static [&'static str] {
        self.label_table()
            .iter()
            .find(|(key, _)| *key == field)
            .map(|(_, labels)| *labels)
            .unwrap_or_default()
    }
}

/// Classic layout: `<dl>` definition lists, then two-column table rows.
#[derive(Debug, Clone, Copy)]
pub struct ClassicLayout;

/// Simpler layout: inline `<strong>Label:</strong> value` blocks, then
/// headings followed by a value element.
#[derive(Debug, Clone, Copy)]
pub struct SimplerLayout;

static CLASSIC: ClassicLayout = ClassicLayout;
static SIMPLER: SimplerLayout = SimplerLayout;

pub fn layout_for_variant(variant: PageVariant) -> &'static dyn PageLayout {
    match variant {
        PageVariant::Classic => &CLASSIC,
        PageVariant::Simpler => &SIMPLER,
    }
}

fn push_pair(out: &mut Vec<LabeledValue>, label: ElementRef<'_>, value: ElementRef<'_>) {
    out.push(LabeledValue {
        label: element_text(label),
        value: element_text(value),
    });
}

fn next_element_sibling(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element.next_siblings().find_map(ElementRef::wrap)
}

impl PageLayout for ClassicLayout {
    fn variant(&self) -> PageVariant {
        PageVariant::Classic
    }

    fn label_table(&self) -> LabelTable {
        CLASSIC_LABELS
    }

    fn labeled_values(&self, document: &Html) -> Vec<LabeledValue> {
        let mut out = Vec::new();

        if let Some(dt) = selector("dl > dt") {
            for term in document.select(&dt) {
                if let Some(def) = next_element_sibling(term).filter(|e| e.value().name() == "dd") {
                    push_pair(&mut out, term, def);
                }
            }
        }

        if let Some(tr) = selector("tr") {
            for row in document.select(&tr) {
                let cells: Vec<ElementRef<'_>> = row
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|c| matches!(c.value().name(), "th" | "td"))
                    .collect();
                match cells.as_slice() {
                    [head, value, ..] if head.value().name() == "th" && value.value().name() == "td" => {
                        push_pair(&mut out, *head, *value)
                    }
                    [label, value, ..] if label.value().name() == "td" => {
                        push_pair(&mut out, *label, *value)
                    }
                    _ => {}
                }
            }
        }

        out
    }

    fn opportunity_number_pattern(&self) -> &'static Regex {
        &CLASSIC_OPPORTUNITY_NUMBER_RE
    }
}

impl PageLayout for SimplerLayout {
    fn variant(&self) -> PageVariant {
        PageVariant::Simpler
    }

    fn label_table(&self) -> LabelTable {
        SIMPLER_LABELS
    }

    fn labeled_values(&self, document: &Html) -> Vec<LabeledValue> {
        let mut out = Vec::new();

        if let Some(blocks) = selector("p, li, div") {
            for block in document.select(&blocks) {
                let Some(label_el) = block.children().find_map(ElementRef::wrap) else {
                    continue;
                };
                if !matches!(label_el.value().name(), "strong" | "b" | "span" | "label") {
                    continue;
                }
                let label = element_text(label_el);
                let full = element_text(block);
                let Some(rest) = full.strip_prefix(label.as_str()) else {
                    continue;
                };
                let value = rest.trim().trim_start_matches(':').trim();
                if label.is_empty() || value.is_empty() {
                    continue;
                }
                out.push(LabeledValue {
                    label,
                    value: value.to_string(),
                });
            }
        }

        if let Some(headings) = selector("h2, h3, h4, h5, h6") {
            for heading in document.select(&headings) {
                if let Some(value) = next_element_sibling(heading) {
                    push_pair(&mut out, heading, value);
                }
            }
        }

        out
    }

    fn opportunity_number_pattern(&self) -> &'static Regex {
        &SIMPLER_OPPORTUNITY_NUMBER_RE
    }
}

/// Case-, whitespace- and trailing-colon-insensitive form of a label.
pub fn normalize_label(label: &str) -> String {
    clean_text(label)
        .trim_end_matches(':')
        .trim()
        .to_lowercase()
}

/// Partial, case-insensitive label match.
pub fn label_matches(candidate: &str, wanted: &str) -> bool {
    let wanted = normalize_label(wanted);
    !wanted.is_empty() && normalize_label(candidate).contains(&wanted)
}

/// First non-empty value whose label matches, trying each label spelling in
/// priority order: exact matches before partial ones, document order within each.
pub fn find_in_pairs(pairs: &[LabeledValue], labels: &[&str]) -> Option<String> {
    for label in labels {
        let wanted = normalize_label(label);
        if wanted.is_empty() {
            continue;
        }
        let usable = || pairs.iter().filter(|p| !p.value.trim().is_empty());
        if let Some(pair) = usable().find(|p| normalize_label(&p.label) == wanted) {
            return Some(clean_text(&pair.value));
        }
        if let Some(pair) = usable().find(|p| normalize_label(&p.label).contains(&wanted)) {
            return Some(clean_text(&pair.value));
        }
    }
    None
}

/// Scan flattened page text for `label: value`, ending the value at the next
/// known label followed by a colon.
pub fn find_in_page_text(text: &str, label: &str, stop_labels: &[&str]) -> Option<String> {
    let label_re = Regex::new(&format!(r"(?i)\b{}\s*:", regex::escape(label.trim()))).ok()?;
    let start = label_re.find(text)?.end();
    let rest = &text[start..];

    let mut stops: Vec<&str> = stop_labels
        .iter()
        .copied()
        .filter(|stop| !stop.eq_ignore_ascii_case(label.trim()))
        .collect();
    stops.sort_by_key(|stop| std::cmp::Reverse(stop.len()));
    let end = if stops.is_empty() {
        rest.len()
    } else {
        let alternation = stops
            .iter()
            .map(|stop| regex::escape(stop))
            .collect::<Vec<_>>()
            .join("|");
        Regex::new(&format!(r"(?i)\b(?:{alternation})\s*:"))
            .ok()
            .and_then(|re| re.find(rest))
            .map_or(rest.len(), |m| m.start())
    };

    let value: String = rest[..end].trim().chars().take(PAGE_SCAN_MAX_CHARS).collect();
    text_or_none(&value)
}

/// Field lookup bound to one parsed page and its layout.
pub struct LabelExtractor {
    layout: &'static dyn PageLayout,
    pairs: Vec<LabeledValue>,
    page_text: String,
    stop_labels: Vec<&'static str>,
}

impl LabelExtractor {
    pub fn new(document: &Html, layout: &'static dyn PageLayout) -> Self {
        let pairs = layout.labeled_values(document);
        let stop_labels = layout
            .label_table()
            .iter()
            .flat_map(|(_, labels)| labels.iter().copied())
            .chain(EXTRA_STOP_LABELS.iter().copied())
            .collect();
        Self {
            layout,
            pairs,
            page_text: page_text(document),
            stop_labels,
        }
    }

    pub fn page_text(&self) -> &str {
        &self.page_text
    }

    pub fn find(&self, field: FieldKey) -> Option<String> {
        let labels = self.layout.labels_for(field);
        if let Some(value) = find_in_pairs(&self.pairs, labels) {
            return Some(value);
        }
        for label in labels {
            if let Some(value) = find_in_page_text(&self.page_text, label, &self.stop_labels) {
                debug!(field = field.as_str(), label, "field found by page text scan");
                return Some(value);
            }
        }
        debug!(
            field = field.as_str(),
            variant = %self.layout.variant(),
            "field absent"
        );
        None
    }
}
