//! Arbitration between rows that map to the same field.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use tracing::debug;

use crate::models::fields::{CanonicalField, FieldSet};
use crate::models::result::{ExtractedField, IssueCode, ValidationIssue};

/// Write-once-unless-more-specific accumulator for one statement.
#[derive(Debug, Clone, Default)]
pub struct ConflictResolver {
    fields: FieldSet,
    winners: BTreeMap<CanonicalField, ExtractedField>,
    issues: Vec<ValidationIssue>,
}

/// Fields, winning extractions and arbitration issues of one statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub fields: FieldSet,
    pub provenance: BTreeMap<CanonicalField, ExtractedField>,
    pub issues: Vec<ValidationIssue>,
}

impl ConflictResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a candidate extraction.
    ///
    /// A null value never claims a slot. An empty slot takes the value;
    /// an occupied slot is replaced only by a strictly higher priority rule.
    /// The returned issue is also kept in the resolver.
    pub fn accumulate(&mut self, candidate: ExtractedField) -> Option<ValidationIssue> {
        let value = candidate.value?;
        let field = candidate.field;

        let Some(current) = self.winners.get(&field) else {
            self.fields.set(field, Some(value));
            self.winners.insert(field, candidate);
            return None;
        };

        let current_value = current.value.unwrap_or_default();
        let issue = if candidate.rule_used.priority > current.rule_used.priority {
            debug!(
                "{} superseded: '{}' ({}) replaces '{}' ({})",
                field,
                candidate.source_row.label,
                value,
                current.source_row.label,
                current_value
            );
            let issue = ValidationIssue::new(
                IssueCode::ValueSuperseded,
                Some(field),
                format!(
                    "'{}' = {} replaced '{}' = {}",
                    candidate.source_row.label, value, current.source_row.label, current_value
                ),
            );
            self.fields.set(field, Some(value));
            self.winners.insert(field, candidate);
            issue
        } else if value == current_value {
            return None;
        } else {
            debug!(
                "{} conflict ignored: kept '{}' ({}), dropped '{}' ({})",
                field, current.source_row.label, current_value, candidate.source_row.label, value
            );
            ValidationIssue::new(
                IssueCode::ConflictIgnored,
                Some(field),
                format!(
                    "kept '{}' = {}, ignored '{}' = {}",
                    current.source_row.label, current_value, candidate.source_row.label, value
                ),
            )
        };

        self.issues.push(issue.clone());
        Some(issue)
    }

    /// Current value of a field.
    pub fn get(&self, field: CanonicalField) -> Option<Decimal> {
        self.fields.get(field)
    }

    pub fn finish(self) -> Resolved {
        Resolved {
            fields: self.fields,
            provenance: self.winners,
            issues: self.issues,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::result::{RuleRef, SourceRow};
    use pretty_assertions::assert_eq;

    fn candidate(field: CanonicalField, label: &str, value: Option<i64>, priority: i32) -> ExtractedField {
        ExtractedField {
            field,
            value: value.map(Decimal::from),
            source_row: SourceRow {
                table_id: "t1".to_string(),
                row_index: 0,
                label: label.to_string(),
            },
            rule_used: RuleRef {
                pattern: label.to_lowercase(),
                priority,
            },
            unit_multiplier: Decimal::ONE,
        }
    }

    #[test]
    fn test_empty_slot_is_set() {
        let mut resolver = ConflictResolver::new();
        assert!(resolver.accumulate(candidate(CanonicalField::Revenue, "Revenue", Some(10), 10)).is_none());
        assert_eq!(resolver.get(CanonicalField::Revenue), Some(Decimal::from(10)));
    }

    #[test]
    fn test_null_never_claims_slot() {
        let mut resolver = ConflictResolver::new();
        resolver.accumulate(candidate(CanonicalField::Revenue, "Total revenues", None, 25));
        resolver.accumulate(candidate(CanonicalField::Revenue, "Revenues", Some(7), 10));

        let resolved = resolver.finish();
        assert_eq!(resolved.fields.get(CanonicalField::Revenue), Some(Decimal::from(7)));
        assert!(resolved.issues.is_empty());
    }

    #[test]
    fn test_higher_priority_supersedes() {
        let mut resolver = ConflictResolver::new();
        resolver.accumulate(candidate(CanonicalField::CurrentAssets, "Current assets", Some(5), 20));
        let issue = resolver
            .accumulate(candidate(CanonicalField::CurrentAssets, "Total current assets", Some(100), 35))
            .unwrap();

        assert_eq!(issue.code, IssueCode::ValueSuperseded);
        assert!(issue.message.contains("5"));
        assert_eq!(resolver.get(CanonicalField::CurrentAssets), Some(Decimal::from(100)));
    }

    #[test]
    fn test_lower_priority_ignored_either_order() {
        let mut forward = ConflictResolver::new();
        forward.accumulate(candidate(CanonicalField::CurrentAssets, "Total current assets", Some(100), 35));
        let issue = forward
            .accumulate(candidate(CanonicalField::CurrentAssets, "Current assets", Some(5), 20))
            .unwrap();
        assert_eq!(issue.code, IssueCode::ConflictIgnored);

        let mut backward = ConflictResolver::new();
        backward.accumulate(candidate(CanonicalField::CurrentAssets, "Current assets", Some(5), 20));
        backward.accumulate(candidate(CanonicalField::CurrentAssets, "Total current assets", Some(100), 35));

        assert_eq!(forward.finish().fields, backward.finish().fields);
    }

    #[test]
    fn test_equal_priority_keeps_first() {
        let mut resolver = ConflictResolver::new();
        resolver.accumulate(candidate(CanonicalField::Revenue, "Net sales", Some(1), 20));
        resolver.accumulate(candidate(CanonicalField::Revenue, "Net revenue", Some(2), 20));

        let resolved = resolver.finish();
        assert_eq!(resolved.fields.get(CanonicalField::Revenue), Some(Decimal::from(1)));
        assert_eq!(resolved.issues.len(), 1);
        assert_eq!(resolved.provenance[&CanonicalField::Revenue].source_row.label, "Net sales");
    }

    #[test]
    fn test_identical_values_are_silent() {
        let mut resolver = ConflictResolver::new();
        resolver.accumulate(candidate(CanonicalField::TotalAssets, "Total assets", Some(9), 25));
        assert!(resolver
            .accumulate(candidate(CanonicalField::TotalAssets, "Total assets", Some(9), 25))
            .is_none());
        assert!(resolver.finish().issues.is_empty());
    }
}
