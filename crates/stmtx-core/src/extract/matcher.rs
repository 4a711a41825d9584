//! Row label to canonical field matching.

use std::sync::Arc;

use tracing::trace;

use crate::models::fields::{CanonicalField, StatementType};

use super::rules::{KeywordRule, NormalizedLabel, RuleTable};

/// A label matched against the rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineMatch<'a> {
    pub field: CanonicalField,
    pub rule: &'a KeywordRule,
}

/// Maps row labels to at most one canonical field.
#[derive(Debug, Clone)]
pub struct LineItemMatcher {
    table: Arc<RuleTable>,
}

impl LineItemMatcher {
    pub fn new(table: Arc<RuleTable>) -> Self {
        Self { table }
    }

    pub fn rules(&self) -> &RuleTable {
        &self.table
    }

    /// Match a label against every rule.
    pub fn match_label(&self, label_text: &str) -> Option<LineMatch<'_>> {
        let label = NormalizedLabel::new(label_text);
        if label.is_empty() {
            return None;
        }
        first_match(self.table.iter(), &label, label_text)
    }

    /// Match a label against rules of one statement only.
    pub fn match_in(&self, label_text: &str, statement: StatementType) -> Option<LineMatch<'_>> {
        let label = NormalizedLabel::new(label_text);
        if label.is_empty() {
            return None;
        }
        first_match(self.table.for_statement(statement), &label, label_text)
    }
}

fn first_match<'a>(
    mut rules: impl Iterator<Item = &'a KeywordRule>,
    label: &NormalizedLabel,
    label_text: &str,
) -> Option<LineMatch<'a>> {
    let rule = rules.find(|rule| rule.matches(label))?;
    trace!("'{}' matched '{}' -> {}", label_text, rule.pattern(), rule.field());
    Some(LineMatch {
        field: rule.field(),
        rule,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::rules::Dictionary;
    use pretty_assertions::assert_eq;

    fn english() -> LineItemMatcher {
        LineItemMatcher::new(Arc::new(RuleTable::builtin(Dictionary::English).unwrap()))
    }

    fn chinese() -> LineItemMatcher {
        LineItemMatcher::new(Arc::new(RuleTable::builtin(Dictionary::Chinese).unwrap()))
    }

    fn field_of(matcher: &LineItemMatcher, label: &str) -> Option<CanonicalField> {
        matcher.match_label(label).map(|m| m.field)
    }

    #[test]
    fn test_revenue_vs_cost_of_revenue() {
        let matcher = english();
        assert_eq!(field_of(&matcher, "Total revenues"), Some(CanonicalField::Revenue));
        assert_eq!(
            field_of(&matcher, "Total cost of revenues"),
            Some(CanonicalField::OperatingCost)
        );
        assert_eq!(field_of(&matcher, "Net sales"), Some(CanonicalField::Revenue));
        assert_eq!(field_of(&matcher, "Deferred revenue"), None);
    }

    #[test]
    fn test_current_vs_non_current() {
        let matcher = english();
        assert_eq!(
            field_of(&matcher, "Total current assets"),
            Some(CanonicalField::CurrentAssets)
        );
        assert_eq!(field_of(&matcher, "Other non-current assets"), None);
        assert_eq!(
            field_of(&matcher, "Total non-current liabilities"),
            Some(CanonicalField::NonCurrentLiabilities)
        );
        assert_eq!(
            field_of(&matcher, "Total liabilities"),
            Some(CanonicalField::TotalLiabilities)
        );
        assert_eq!(field_of(&matcher, "Total liabilities and stockholders' equity"), None);
    }

    #[test]
    fn test_income_from_operations() {
        assert_eq!(
            field_of(&english(), "Income from operations"),
            Some(CanonicalField::OperatingProfit)
        );
    }

    #[test]
    fn test_no_substring_matches() {
        let matcher = english();
        assert_eq!(field_of(&matcher, "Basic materials sector description"), None);
        assert_eq!(
            field_of(&matcher, "Basic earnings per share"),
            Some(CanonicalField::EpsBasic)
        );
        assert_eq!(
            field_of(&matcher, "Diluted earnings per share"),
            Some(CanonicalField::EpsDiluted)
        );
    }

    #[test]
    fn test_net_income_variants() {
        let matcher = english();
        assert_eq!(field_of(&matcher, "Net income"), Some(CanonicalField::NetProfit));
        assert_eq!(field_of(&matcher, "Comprehensive net income"), None);
        assert_eq!(
            field_of(&matcher, "Income before provision for income taxes"),
            Some(CanonicalField::TotalProfit)
        );
        assert_eq!(
            field_of(&matcher, "Provision for income taxes"),
            Some(CanonicalField::TaxExpense)
        );
    }

    #[test]
    fn test_match_in_restricts_statement() {
        let matcher = english();
        let label = "Net cash provided by operating activities";
        assert_eq!(
            matcher.match_in(label, StatementType::CashFlow).map(|m| m.field),
            Some(CanonicalField::OperatingCashFlow)
        );
        assert_eq!(matcher.match_in(label, StatementType::Income), None);
    }

    #[test]
    fn test_chinese_labels() {
        let matcher = chinese();
        assert_eq!(field_of(&matcher, "一、营业收入"), Some(CanonicalField::Revenue));
        assert_eq!(field_of(&matcher, "流动资产合计"), Some(CanonicalField::CurrentAssets));
        assert_eq!(
            field_of(&matcher, "非流动资产合计"),
            Some(CanonicalField::NonCurrentAssets)
        );
        assert_eq!(field_of(&matcher, "其他流动资产"), None);
        assert_eq!(
            field_of(&matcher, "负债和所有者权益总计"),
            None
        );
        assert_eq!(field_of(&matcher, "扣除非经常性损益后的净利润"), None);
    }

    #[test]
    fn test_blank_label() {
        assert!(english().match_label("  ").is_none());
    }
}
