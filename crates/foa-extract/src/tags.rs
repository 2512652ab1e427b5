//! Rule-based tagging over record text and structure.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use foa_core::FoaRecord;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tables::{DEFAULT_TAG_RULES, TAG_COST_SHARING, TAG_HAS_DEADLINE, TAG_RULES_VERSION};

#[derive(Debug, Error)]
pub enum TagRulesError {
    #[error("invalid tag rules: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("tag rule `{0}` has no keywords")]
    EmptyRule(String),
    #[error("unsupported tag rules version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRule {
    pub tag: String,
    #[serde(default)]
    pub contains_any: Vec<String>,
    #[serde(default)]
    pub words_any: Vec<String>,
}

impl TagRule {
    fn matches(&self, haystack: &str) -> bool {
        self.contains_any
            .iter()
            .any(|needle| haystack.contains(&needle.to_lowercase()))
            || self
                .words_any
                .iter()
                .any(|word| contains_word(haystack, &word.to_lowercase()))
    }
}

#[derive(Debug, Clone, Deserialize)]
struct TagRulesFile {
    version: u32,
    #[serde(default)]
    rules: Vec<TagRule>,
}

/// Keyword rules plus the fixed structural tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRules {
    rules: Vec<TagRule>,
}

impl Default for TagRules {
    fn default() -> Self {
        Self {
            rules: DEFAULT_TAG_RULES
                .iter()
                .map(|rule| TagRule {
                    tag: rule.tag.to_string(),
                    contains_any: rule.contains_any.iter().map(ToString::to_string).collect(),
                    words_any: rule.words_any.iter().map(ToString::to_string).collect(),
                })
                .collect(),
        }
    }
}

impl TagRules {
    pub fn new(rules: Vec<TagRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[TagRule] {
        &self.rules
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, TagRulesError> {
        let file: TagRulesFile = serde_yaml::from_str(yaml)?;
        if file.version != TAG_RULES_VERSION {
            return Err(TagRulesError::UnsupportedVersion {
                found: file.version,
                expected: TAG_RULES_VERSION,
            });
        }
        if let Some(empty) = file
            .rules
            .iter()
            .find(|r| r.contains_any.is_empty() && r.words_any.is_empty())
        {
            return Err(TagRulesError::EmptyRule(empty.tag.clone()));
        }
        Ok(Self::new(file.rules))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_yaml_str(&yaml).with_context(|| format!("parsing {}", path.display()))
    }

    /// Tags for a record. Depends only on `title`, `agency`, `funding_category`,
    /// `close_date` and `cost_sharing`.
    pub fn apply(&self, record: &FoaRecord) -> BTreeSet<String> {
        let haystack = [
            record.title.as_deref(),
            record.agency.as_deref(),
            record.funding_category.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

        let mut tags: BTreeSet<String> = self
            .rules
            .iter()
            .filter(|rule| rule.matches(&haystack))
            .map(|rule| rule.tag.clone())
            .collect();

        if record.close_date.is_some() {
            tags.insert(TAG_HAS_DEADLINE.to_string());
        }
        if record.cost_sharing == Some(true) {
            tags.insert(TAG_COST_SHARING.to_string());
        }
        tags
    }
}

fn contains_word(haystack: &str, word: &str) -> bool {
    if word.is_empty() {
        return false;
    }
    haystack.match_indices(word).any(|(start, _)| {
        let end = start + word.len();
        let before = haystack[..start].chars().next_back();
        let after = haystack[end..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}
