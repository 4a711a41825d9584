//! Numeric cell parsing and period selection.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::document::RowRecord;

use super::rules::patterns::{CURRENCY, NUMBER_SHAPE};

/// Cell contents that mean "no value".
const NULL_MARKERS: &[&str] = &["-", "--", "---", "—", "–", "−", "n/a", "na", "nm", "n.m.", "*"];

/// Which values of a row to return.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractMode {
    /// First non-null value in period order.
    #[default]
    Latest,
    /// Every non-null value with its column header.
    AllPeriods,
}

/// Column order of reporting periods.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodOrder {
    /// Leftmost value column is the most recent period.
    #[default]
    NewestFirst,
    /// Rightmost value column is the most recent period.
    OldestFirst,
}

/// A value paired with the header of its column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodValue {
    pub period: String,
    pub value: Decimal,
}

/// Output of [`ValueExtractor::extract`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted {
    Latest(Option<Decimal>),
    Periods(Vec<PeriodValue>),
}

/// Parse a raw cell into a decimal amount.
///
/// Thousands separators and currency symbols are stripped, parentheses
/// mean negative, and dashes, blanks and "n/a" are null.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || NULL_MARKERS.contains(&trimmed.to_lowercase().as_str()) {
        return None;
    }

    let stripped = CURRENCY.replace_all(trimmed, "");
    let mut text: String = stripped
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',' && *c != '\u{00a0}')
        .collect();

    let mut negative = false;
    if let Some(inner) = text.strip_prefix('(') {
        negative = true;
        text = inner.strip_suffix(')').unwrap_or(inner).to_string();
    } else if let Some(rest) = text.strip_prefix(['-', '−', '–']) {
        negative = true;
        text = rest.to_string();
    }

    // Footnote markers and stray percent signs
    let text = text.trim_end_matches(['*', '%']);

    if !NUMBER_SHAPE.is_match(text) {
        return None;
    }

    let value = Decimal::from_str(text).ok()?;
    Some(if negative { -value } else { value })
}

/// Selects the value(s) of a matched row.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueExtractor {
    order: PeriodOrder,
}

impl ValueExtractor {
    pub fn new(order: PeriodOrder) -> Self {
        Self { order }
    }

    pub fn period_order(&self) -> PeriodOrder {
        self.order
    }

    /// Extract according to `mode`, scaling every value by `multiplier`.
    pub fn extract(
        &self,
        row: &RowRecord,
        headers: &[String],
        mode: ExtractMode,
        multiplier: Decimal,
    ) -> Extracted {
        match mode {
            ExtractMode::Latest => Extracted::Latest(self.latest(row, multiplier)),
            ExtractMode::AllPeriods => Extracted::Periods(self.all_periods(row, headers, multiplier)),
        }
    }

    /// First non-null value in period order.
    pub fn latest(&self, row: &RowRecord, multiplier: Decimal) -> Option<Decimal> {
        let cells = row.value_cells();
        let mut values = cells.iter().filter_map(|c| parse_amount(c));
        let raw = match self.order {
            PeriodOrder::NewestFirst => values.next(),
            PeriodOrder::OldestFirst => values.last(),
        }?;
        raw.checked_mul(multiplier)
    }

    /// Every non-null value with its column header, in column order.
    pub fn all_periods(&self, row: &RowRecord, headers: &[String], multiplier: Decimal) -> Vec<PeriodValue> {
        row.cells
            .iter()
            .enumerate()
            .skip(1)
            .filter_map(|(i, cell)| {
                let value = parse_amount(cell)?.checked_mul(multiplier)?;
                let period = headers
                    .get(i)
                    .map(|h| h.trim())
                    .filter(|h| !h.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("col{i}"));
                Some(PeriodValue { period, value })
            })
            .collect()
    }
}
