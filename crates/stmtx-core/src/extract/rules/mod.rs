//! Prioritized keyword rules mapping row labels to canonical fields.
//!
//! A [`RuleTable`] is built once from configuration and never mutated
//! afterwards; share it behind an `Arc` between workers.

pub mod dictionary;
pub mod patterns;

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::models::config::StmtxConfig;
use crate::models::fields::{CanonicalField, StatementType};

use patterns::{APOSTROPHES, CJK, HYPHENS, NON_WORD};

/// Built-in label dictionary selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dictionary {
    /// US/IFRS English filings.
    #[default]
    English,
    /// Simplified Chinese (A-share) reports.
    Chinese,
    /// Both dictionaries.
    Bilingual,
}

/// Rule as declared in configuration, before priority assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub pattern: String,
    pub field: CanonicalField,
    #[serde(default)]
    pub excluded: Vec<String>,
    /// Explicit priority; derived from the pattern shape when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
}

impl RuleSpec {
    pub fn new(pattern: impl Into<String>, field: CanonicalField) -> Self {
        Self {
            pattern: pattern.into(),
            field,
            excluded: Vec::new(),
            priority: None,
        }
    }

    pub fn excluding<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded.extend(terms.into_iter().map(Into::into));
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }
}

/// Label text reduced to comparable form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedLabel {
    /// Lowercased word tokens.
    pub tokens: Vec<String>,
    /// Tokens concatenated without separators, for CJK matching.
    pub compact: String,
}

impl NormalizedLabel {
    pub fn new(text: &str) -> Self {
        let lowered = text.to_lowercase();
        let lowered = HYPHENS.replace_all(&lowered, "-");
        let lowered = APOSTROPHES.replace_all(&lowered, "");
        let spaced = NON_WORD.replace_all(&lowered, " ");

        let tokens: Vec<String> = spaced
            .split_whitespace()
            .map(|t| t.trim_matches('-').to_string())
            .filter(|t| !t.is_empty())
            .collect();
        let compact = tokens.concat();

        Self { tokens, compact }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// A normalized phrase, matched as whole words or as a CJK run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phrase {
    /// Latin-script phrase; must occur as a contiguous token sequence.
    Words(Vec<String>),
    /// Han-script phrase; no word boundaries exist, so it matches as a contiguous run.
    Han(String),
}

impl Phrase {
    pub fn parse(text: &str) -> Option<Self> {
        let normalized = NormalizedLabel::new(text);
        if normalized.is_empty() {
            return None;
        }

        if CJK.is_match(&normalized.compact) {
            Some(Phrase::Han(normalized.compact))
        } else {
            Some(Phrase::Words(normalized.tokens))
        }
    }

    /// Whether the phrase occurs in the label.
    pub fn occurs_in(&self, label: &NormalizedLabel) -> bool {
        match self {
            Phrase::Words(words) => {
                words.len() <= label.tokens.len()
                    && label
                        .tokens
                        .windows(words.len())
                        .any(|window| window == words.as_slice())
            }
            Phrase::Han(run) => label.compact.contains(run.as_str()),
        }
    }

    /// Specificity score used to derive rule priority.
    ///
    /// Latin phrases score ten per word plus five for a leading "total";
    /// Han phrases score ten per character plus five for a "合计"/"总计" suffix.
    pub fn specificity(&self) -> i32 {
        match self {
            Phrase::Words(words) => {
                let bonus = if words.first().map(String::as_str) == Some("total") { 5 } else { 0 };
                words.len() as i32 * 10 + bonus
            }
            Phrase::Han(run) => {
                let bonus = if run.ends_with("合计") || run.ends_with("总计") { 5 } else { 0 };
                run.chars().count() as i32 * 10 + bonus
            }
        }
    }

    fn display_len(&self) -> usize {
        match self {
            Phrase::Words(words) => words.iter().map(String::len).sum::<usize>() + words.len(),
            Phrase::Han(run) => run.chars().count(),
        }
    }
}

impl fmt::Display for Phrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phrase::Words(words) => f.write_str(&words.join(" ")),
            Phrase::Han(run) => f.write_str(run),
        }
    }
}

/// An immutable label rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordRule {
    pattern: String,
    phrase: Phrase,
    field: CanonicalField,
    priority: i32,
    excluded: Vec<Phrase>,
}

impl KeywordRule {
    fn from_spec(spec: &RuleSpec) -> Result<Self, ConfigError> {
        let phrase = Phrase::parse(&spec.pattern).ok_or_else(|| ConfigError::EmptyPattern {
            field: spec.field.to_string(),
        })?;

        let excluded = spec
            .excluded
            .iter()
            .map(|term| {
                Phrase::parse(term).ok_or_else(|| ConfigError::EmptyExcludedTerm {
                    pattern: spec.pattern.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let priority = spec.priority.unwrap_or_else(|| phrase.specificity());

        Ok(Self {
            pattern: spec.pattern.clone(),
            phrase,
            field: spec.field,
            priority,
            excluded,
        })
    }

    /// Pattern as declared.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn field(&self) -> CanonicalField {
        self.field
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn excluded_terms(&self) -> &[Phrase] {
        &self.excluded
    }

    /// Pattern present and no excluded term present.
    pub fn matches(&self, label: &NormalizedLabel) -> bool {
        self.phrase.occurs_in(label) && !self.excluded.iter().any(|term| term.occurs_in(label))
    }
}

/// Rules sorted by descending priority.
#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: Vec<KeywordRule>,
}

impl RuleTable {
    /// Build a table from rule specs.
    ///
    /// Ties on priority are broken by longer pattern first, then by
    /// declaration order, so the resulting order is fully deterministic.
    pub fn from_specs(specs: &[RuleSpec]) -> Result<Self, ConfigError> {
        let mut indexed = specs
            .iter()
            .enumerate()
            .map(|(i, spec)| KeywordRule::from_spec(spec).map(|rule| (i, rule)))
            .collect::<Result<Vec<_>, _>>()?;

        indexed.sort_by(|(ia, a), (ib, b)| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| b.phrase.display_len().cmp(&a.phrase.display_len()))
                .then_with(|| ia.cmp(ib))
        });

        Ok(Self {
            rules: indexed.into_iter().map(|(_, rule)| rule).collect(),
        })
    }

    /// Table of a built-in dictionary.
    pub fn builtin(dictionary: Dictionary) -> Result<Self, ConfigError> {
        Self::from_specs(&dictionary::specs(dictionary))
    }

    /// Table described by a configuration: built-in dictionary plus extra rules.
    pub fn from_config(config: &StmtxConfig) -> Result<Self, ConfigError> {
        let mut specs = if config.rules.replace_builtin {
            Vec::new()
        } else {
            dictionary::specs(config.extraction.dictionary)
        };
        specs.extend(config.rules.extra.iter().cloned());

        let table = Self::from_specs(&specs)?;
        debug!(
            "Built rule table with {} rules ({} custom)",
            table.len(),
            config.rules.extra.len()
        );
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// All rules in evaluation order.
    pub fn iter(&self) -> impl Iterator<Item = &KeywordRule> {
        self.rules.iter()
    }

    /// Rules for fields of one statement, in evaluation order.
    pub fn for_statement(&self, statement: StatementType) -> impl Iterator<Item = &KeywordRule> {
        self.rules
            .iter()
            .filter(move |rule| rule.field.statement() == statement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize_label() {
        let label = NormalizedLabel::new("Total Stockholders’ Equity (Deficit)");
        assert_eq!(label.tokens, ["total", "stockholders", "equity", "deficit"]);

        let label = NormalizedLabel::new("Other non‑current assets");
        assert_eq!(label.tokens, ["other", "non-current", "assets"]);

        let label = NormalizedLabel::new("流动资产 合计");
        assert_eq!(label.compact, "流动资产合计");
    }

    #[test]
    fn test_phrase_whole_word() {
        let phrase = Phrase::parse("cost").unwrap();
        assert!(phrase.occurs_in(&NormalizedLabel::new("Total cost of revenues")));
        assert!(!phrase.occurs_in(&NormalizedLabel::new("Costco membership fees")));

        let phrase = Phrase::parse("current assets").unwrap();
        assert!(!phrase.occurs_in(&NormalizedLabel::new("Other non-current assets")));
        assert!(phrase.occurs_in(&NormalizedLabel::new("Total current assets")));
        assert_eq!(phrase.to_string(), "current assets");
    }

    #[test]
    fn test_han_phrase() {
        let phrase = Phrase::parse("流动资产").unwrap();
        assert!(matches!(phrase, Phrase::Han(_)));
        assert!(phrase.occurs_in(&NormalizedLabel::new("流动资产合计")));
    }

    #[test]
    fn test_priority_by_construction() {
        let table = RuleTable::from_specs(&[
            RuleSpec::new("revenues", CanonicalField::Revenue),
            RuleSpec::new("total revenues", CanonicalField::Revenue),
            RuleSpec::new("total cost of revenues", CanonicalField::OperatingCost),
        ])
        .unwrap();

        let order: Vec<&str> = table.iter().map(|r| r.pattern()).collect();
        assert_eq!(order, ["total cost of revenues", "total revenues", "revenues"]);
        assert!(table.iter().zip(table.iter().skip(1)).all(|(a, b)| a.priority() >= b.priority()));
    }

    #[test]
    fn test_explicit_priority_wins() {
        let table = RuleTable::from_specs(&[
            RuleSpec::new("total revenues", CanonicalField::Revenue),
            RuleSpec::new("turnover", CanonicalField::Revenue).with_priority(100),
        ])
        .unwrap();
        assert_eq!(table.iter().next().unwrap().pattern(), "turnover");
    }

    #[test]
    fn test_empty_pattern_rejected() {
        let err = RuleTable::from_specs(&[RuleSpec::new(" -- ", CanonicalField::Revenue)]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::EmptyPattern {
                field: "revenue".to_string()
            }
        );
    }

    #[test]
    fn test_excluded_term_blocks_match() {
        let table = RuleTable::from_specs(&[
            RuleSpec::new("revenues", CanonicalField::Revenue).excluding(["cost"]),
        ])
        .unwrap();
        let rule = table.iter().next().unwrap();

        assert!(rule.matches(&NormalizedLabel::new("Total revenues")));
        assert!(!rule.matches(&NormalizedLabel::new("Total cost of revenues")));
    }

    #[test]
    fn test_builtin_tables_build() {
        for dictionary in [Dictionary::English, Dictionary::Chinese, Dictionary::Bilingual] {
            assert!(!RuleTable::builtin(dictionary).unwrap().is_empty());
        }
    }
}
