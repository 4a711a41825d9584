//! Scale unit detection ("in millions", "单位：万元").

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::config::UnitConfig;
use crate::models::document::CandidateTable;

use super::rules::patterns::{UNIT_EN, UNIT_EN_ZEROS, UNIT_ZH, UNIT_ZH_CURRENCY};

/// Where a table's unit declaration was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitSource {
    Caption,
    Headers,
    /// Text immediately preceding the table.
    Local,
    /// Document-wide fallback.
    Document,
    /// Nothing found; the configured default applies.
    Default,
}

/// Resolved scale of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitResolution {
    pub multiplier: Decimal,
    pub source: UnitSource,
    /// Matched declaration text, if any.
    pub declaration: Option<String>,
}

impl UnitResolution {
    pub fn is_ambiguous(&self) -> bool {
        self.source == UnitSource::Default
    }
}

/// A unit declaration found in some text.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Declaration {
    multiplier: Decimal,
    text: String,
    start: usize,
}

fn english_multiplier(word: &str) -> Option<Decimal> {
    match word.to_lowercase().as_str() {
        "thousands" => Some(Decimal::new(1_000, 0)),
        "millions" => Some(Decimal::new(1_000_000, 0)),
        "billions" => Some(Decimal::new(1_000_000_000, 0)),
        _ => None,
    }
}

fn chinese_multiplier(unit: &str) -> Option<Decimal> {
    match unit {
        "元" => Some(Decimal::ONE),
        "千元" => Some(Decimal::new(1_000, 0)),
        "万元" => Some(Decimal::new(10_000, 0)),
        "百万元" => Some(Decimal::new(1_000_000, 0)),
        "亿元" => Some(Decimal::new(100_000_000, 0)),
        _ => None,
    }
}

/// All unit declarations in `text`, in order of appearance.
fn declarations(text: &str) -> Vec<Declaration> {
    let mut found = Vec::new();

    for caps in UNIT_EN.captures_iter(text) {
        if let (Some(m), Some(multiplier)) = (caps.get(0), english_multiplier(&caps[1])) {
            found.push(Declaration {
                multiplier,
                text: m.as_str().to_string(),
                start: m.start(),
            });
        }
    }

    for m in UNIT_EN_ZEROS.find_iter(text) {
        found.push(Declaration {
            multiplier: Decimal::new(1_000, 0),
            text: m.as_str().to_string(),
            start: m.start(),
        });
    }

    for pattern in [&*UNIT_ZH, &*UNIT_ZH_CURRENCY] {
        for caps in pattern.captures_iter(text) {
            if let (Some(m), Some(multiplier)) = (caps.get(0), chinese_multiplier(&caps[1])) {
                found.push(Declaration {
                    multiplier,
                    text: m.as_str().to_string(),
                    start: m.start(),
                });
            }
        }
    }

    found.sort_by_key(|d| d.start);
    found.dedup_by_key(|d| d.start);
    found
}

/// Last `window` characters of `text`.
fn tail_chars(text: &str, window: usize) -> &str {
    let count = text.chars().count();
    if count <= window {
        return text;
    }
    let skip = count - window;
    let offset = text.char_indices().nth(skip).map(|(i, _)| i).unwrap_or(0);
    &text[offset..]
}

/// Resolves the unit multiplier of a table.
#[derive(Debug, Clone)]
pub struct UnitDetector {
    window_chars: usize,
    default_multiplier: Decimal,
}

impl UnitDetector {
    pub fn new(window_chars: usize, default_multiplier: Decimal) -> Self {
        Self {
            window_chars,
            default_multiplier,
        }
    }

    pub fn from_config(config: &UnitConfig) -> Self {
        Self::new(config.window_chars, config.default_multiplier)
    }

    /// Resolve the unit of `table`, falling back to `document_text`.
    ///
    /// Lookup order is caption, headers, the preceding-text window (the
    /// declaration closest to the table wins), then the first declaration
    /// in the document text.
    pub fn resolve(&self, table: &CandidateTable, document_text: &str) -> UnitResolution {
        if let Some(found) = declarations(&table.caption).into_iter().next() {
            return self.resolved(table, found, UnitSource::Caption);
        }

        let headers = table.headers.join(" ");
        if let Some(found) = declarations(&headers).into_iter().next() {
            return self.resolved(table, found, UnitSource::Headers);
        }

        let window = tail_chars(&table.preceding_text, self.window_chars);
        if let Some(found) = declarations(window).pop() {
            return self.resolved(table, found, UnitSource::Local);
        }

        if let Some(found) = declarations(document_text).into_iter().next() {
            return self.resolved(table, found, UnitSource::Document);
        }

        debug!("No unit declaration for table {}", table.id);
        UnitResolution {
            multiplier: self.default_multiplier,
            source: UnitSource::Default,
            declaration: None,
        }
    }

    fn resolved(&self, table: &CandidateTable, found: Declaration, source: UnitSource) -> UnitResolution {
        debug!(
            "Table {} unit '{}' (x{}) from {:?}",
            table.id, found.text, found.multiplier, source
        );
        UnitResolution {
            multiplier: found.multiplier,
            source,
            declaration: Some(found.text),
        }
    }
}

impl Default for UnitDetector {
    fn default() -> Self {
        Self::from_config(&UnitConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_caption_declaration() {
        let table = CandidateTable::new("t1")
            .with_caption("CONSOLIDATED STATEMENTS OF OPERATIONS (In millions, except per share amounts)");

        let unit = UnitDetector::default().resolve(&table, "");
        assert_eq!(unit.multiplier, Decimal::new(1_000_000, 0));
        assert_eq!(unit.source, UnitSource::Caption);
    }

    #[test]
    fn test_local_beats_document() {
        let table = CandidateTable::new("t1")
            .with_preceding_text("Amounts in millions below. (Dollars in thousands)");

        let unit = UnitDetector::default().resolve(&table, "All figures in billions");
        assert_eq!(unit.multiplier, Decimal::new(1_000, 0));
        assert_eq!(unit.source, UnitSource::Local);
    }

    #[test]
    fn test_window_is_bounded() {
        let preceding = format!("in millions{}", " filler".repeat(200));
        let table = CandidateTable::new("t1").with_preceding_text(preceding);

        let unit = UnitDetector::new(100, Decimal::ONE).resolve(&table, "(in thousands)");
        assert_eq!(unit.source, UnitSource::Document);
        assert_eq!(unit.multiplier, Decimal::new(1_000, 0));
    }

    #[test]
    fn test_chinese_units() {
        let table = CandidateTable::new("t1").with_preceding_text("合并资产负债表\n单位：人民币万元");
        let unit = UnitDetector::default().resolve(&table, "");
        assert_eq!(unit.multiplier, Decimal::new(10_000, 0));

        let table = CandidateTable::new("t2").with_caption("单位：元");
        assert_eq!(UnitDetector::default().resolve(&table, "").multiplier, Decimal::ONE);

        let table = CandidateTable::new("t3");
        let unit = UnitDetector::default().resolve(&table, "金额单位：亿元");
        assert_eq!(unit.multiplier, Decimal::new(100_000_000, 0));
    }

    #[test]
    fn test_no_declaration_is_ambiguous() {
        let unit = UnitDetector::default().resolve(&CandidateTable::new("t1"), "Annual report");
        assert!(unit.is_ambiguous());
        assert_eq!(unit.multiplier, Decimal::ONE);
    }
}
