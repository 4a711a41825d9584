//! Cross-field consistency checks and confidence scoring.

use rust_decimal::Decimal;
use tracing::debug;

use crate::models::config::{Bounds, ValidationConfig};
use crate::models::fields::{CanonicalField, CanonicalField::*, FieldSet, StatementType};
use crate::models::result::{IssueCode, ValidationIssue};
use crate::ratios;

/// Validates the field map of one statement and scores it.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    config: ValidationConfig,
}

impl Validator {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Issues and confidence of a statement, from its fields alone.
    pub fn validate(&self, fields: &FieldSet, statement: StatementType) -> (Vec<ValidationIssue>, f64) {
        let issues = self.check(fields, statement);
        let confidence = self.confidence(fields, statement, &issues);
        (issues, confidence)
    }

    /// Run every check that applies to `statement`.
    pub fn check(&self, fields: &FieldSet, statement: StatementType) -> Vec<ValidationIssue> {
        let mut issues = self.check_required(fields, statement);

        match statement {
            StatementType::Income => {
                if let Some(revenue) = fields.get(Revenue).filter(|r| *r < Decimal::ZERO) {
                    issues.push(ValidationIssue::new(
                        IssueCode::RangeViolation,
                        Some(Revenue),
                        format!("revenue is negative: {revenue}"),
                    ));
                }
                self.check_range(
                    &mut issues,
                    "gross margin",
                    ratios::gross_margin(fields),
                    &self.config.gross_margin,
                    Some(OperatingCost),
                );
                self.check_range(
                    &mut issues,
                    "net margin",
                    ratios::net_margin(fields),
                    &self.config.net_margin,
                    Some(NetProfit),
                );
                self.check_cost_to_revenue(&mut issues, fields);
            }
            StatementType::Balance => {
                if let Some(assets) = fields.get(TotalAssets).filter(|a| *a <= Decimal::ZERO) {
                    issues.push(ValidationIssue::new(
                        IssueCode::RangeViolation,
                        Some(TotalAssets),
                        format!("total assets must be positive: {assets}"),
                    ));
                }
                self.check_identity(&mut issues, fields);
                self.check_range(
                    &mut issues,
                    "asset-liability ratio",
                    ratios::asset_liability_ratio(fields),
                    &self.config.leverage,
                    Some(TotalLiabilities),
                );
                self.check_range(
                    &mut issues,
                    "current ratio",
                    ratios::current_ratio(fields),
                    &self.config.current_ratio,
                    Some(CurrentAssets),
                );
                self.check_part_of_whole(&mut issues, fields, CurrentAssets, TotalAssets);
                self.check_part_of_whole(&mut issues, fields, CurrentLiabilities, TotalLiabilities);
            }
            StatementType::CashFlow => {}
        }

        if !issues.is_empty() {
            debug!("{} validation raised {} issues", statement, issues.len());
        }
        issues
    }

    /// Checks spanning statements, run on the merged document fields.
    pub fn validate_cross(&self, fields: &FieldSet) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        self.check_range(&mut issues, "ROE", ratios::roe(fields), &self.config.roe, Some(NetProfit));
        self.check_range(
            &mut issues,
            "OCF to net profit",
            ratios::ocf_to_net_profit(fields),
            &self.config.ocf_to_net_profit,
            Some(OperatingCashFlow),
        );
        self.check_positive(&mut issues, "asset turnover", ratios::asset_turnover(fields), Revenue);
        self.check_positive(&mut issues, "inventory turnover", ratios::inventory_turnover(fields), Inventory);
        issues
    }

    /// `completeness x product(1 - weight)` over `issues`, clamped to [0, 1].
    ///
    /// Completeness is the share of present P0 fields. A statement without
    /// configured P0 fields is complete as soon as any of its fields is present.
    pub fn confidence(&self, fields: &FieldSet, statement: StatementType, issues: &[ValidationIssue]) -> f64 {
        let required = self.config.required.for_statement(statement);
        let completeness = if required.is_empty() {
            if fields.count_present(statement.fields()) > 0 { 1.0 } else { 0.0 }
        } else {
            fields.count_present(required.iter().copied()) as f64 / required.len() as f64
        };

        let retained: f64 = issues
            .iter()
            .map(|issue| 1.0 - self.config.weights.weight(issue.code))
            .product();

        (completeness * retained).clamp(0.0, 1.0)
    }

    fn check_required(&self, fields: &FieldSet, statement: StatementType) -> Vec<ValidationIssue> {
        self.config
            .required
            .for_statement(statement)
            .iter()
            .filter(|field| !fields.is_present(**field))
            .map(|field| {
                ValidationIssue::new(
                    IssueCode::MissingRequiredField,
                    Some(*field),
                    format!("required field {field} not found"),
                )
            })
            .collect()
    }

    /// `total_assets = total_liabilities + total_equity` within relative tolerance.
    fn check_identity(&self, issues: &mut Vec<ValidationIssue>, fields: &FieldSet) {
        let (Some(assets), Some(liabilities), Some(equity)) =
            (fields.get(TotalAssets), fields.get(TotalLiabilities), fields.get(TotalEquity))
        else {
            return;
        };
        let Some(sum) = liabilities.checked_add(equity) else {
            return;
        };

        let scale = assets.abs().max(sum.abs());
        let Some(gap) = assets.checked_sub(sum).map(|g| g.abs()) else {
            return;
        };
        let Some(allowed) = scale.checked_mul(self.config.identity_tolerance) else {
            return;
        };
        if gap > allowed {
            issues.push(ValidationIssue::new(
                IssueCode::IdentityViolation,
                Some(TotalAssets),
                format!("total assets {assets} != liabilities {liabilities} + equity {equity}"),
            ));
        }
    }

    fn check_range(
        &self,
        issues: &mut Vec<ValidationIssue>,
        name: &str,
        value: Option<Decimal>,
        bounds: &Bounds,
        field: Option<CanonicalField>,
    ) {
        let Some(value) = value else {
            return;
        };
        if !bounds.contains(value, self.config.range_tolerance) {
            issues.push(ValidationIssue::new(
                IssueCode::RangeViolation,
                field,
                format!("{name} {value} outside [{}, {}]", bounds.min, bounds.max),
            ));
        }
    }

    /// Turnover-style ratios must be strictly positive.
    fn check_positive(
        &self,
        issues: &mut Vec<ValidationIssue>,
        name: &str,
        value: Option<Decimal>,
        field: CanonicalField,
    ) {
        if let Some(value) = value.filter(|v| *v <= Decimal::ZERO) {
            issues.push(ValidationIssue::new(
                IssueCode::RangeViolation,
                Some(field),
                format!("{name} must be positive: {value}"),
            ));
        }
    }

    fn check_part_of_whole(
        &self,
        issues: &mut Vec<ValidationIssue>,
        fields: &FieldSet,
        part: CanonicalField,
        whole: CanonicalField,
    ) {
        let (Some(part_value), Some(whole_value)) = (fields.get(part), fields.get(whole)) else {
            return;
        };
        let Some(limit) = whole_value.checked_mul(Decimal::ONE + self.config.consistency_tolerance) else {
            return;
        };
        if part_value > limit {
            issues.push(ValidationIssue::new(
                IssueCode::ConsistencyViolation,
                Some(part),
                format!("{part} {part_value} exceeds {whole} {whole_value}"),
            ));
        }
    }

    fn check_cost_to_revenue(&self, issues: &mut Vec<ValidationIssue>, fields: &FieldSet) {
        let (Some(cost), Some(revenue)) = (fields.get(OperatingCost), fields.get(Revenue)) else {
            return;
        };
        let Some(limit) = revenue.checked_mul(self.config.max_cost_to_revenue) else {
            return;
        };
        if revenue > Decimal::ZERO && cost > limit {
            issues.push(ValidationIssue::new(
                IssueCode::ConsistencyViolation,
                Some(OperatingCost),
                format!(
                    "operating cost {cost} exceeds {} x revenue {revenue}",
                    self.config.max_cost_to_revenue
                ),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn balance(assets: i64, liabilities: i64, equity: i64) -> FieldSet {
        FieldSet::new()
            .with(TotalAssets, Decimal::from(assets))
            .with(TotalLiabilities, Decimal::from(liabilities))
            .with(TotalEquity, Decimal::from(equity))
    }

    fn codes(issues: &[ValidationIssue]) -> Vec<IssueCode> {
        issues.iter().map(|i| i.code).collect()
    }

    #[test]
    fn test_clean_balance_sheet() {
        let (issues, confidence) = Validator::default().validate(&balance(1000, 600, 400), StatementType::Balance);
        assert!(issues.is_empty());
        assert_eq!(confidence, 1.0);
    }

    #[test]
    fn test_identity_tolerance() {
        let validator = Validator::default();
        assert!(validator.check(&balance(1000, 600, 405), StatementType::Balance).is_empty());
        assert_eq!(
            codes(&validator.check(&balance(1000, 600, 450), StatementType::Balance)),
            [IssueCode::IdentityViolation]
        );
    }

    #[test]
    fn test_missing_required_fields() {
        let fields = FieldSet::new().with(Revenue, Decimal::from(100));
        let (issues, confidence) = Validator::default().validate(&fields, StatementType::Income);

        assert_eq!(codes(&issues), [IssueCode::MissingRequiredField]);
        assert_eq!(issues[0].field, Some(NetProfit));
        assert!((confidence - 0.5 * 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_range_and_consistency() {
        let fields = balance(1000, 1200, -200).with(CurrentAssets, Decimal::from(1100));
        let issues = Validator::default().check(&fields, StatementType::Balance);
        assert_eq!(codes(&issues), [IssueCode::RangeViolation, IssueCode::ConsistencyViolation]);

        let fields = FieldSet::new()
            .with(Revenue, Decimal::from(100))
            .with(NetProfit, Decimal::from(5))
            .with(OperatingCost, Decimal::from(200));
        let issues = Validator::default().check(&fields, StatementType::Income);
        assert_eq!(codes(&issues), [IssueCode::RangeViolation, IssueCode::ConsistencyViolation]);
    }

    #[test]
    fn test_negative_revenue() {
        let fields = FieldSet::new()
            .with(Revenue, Decimal::from(-5))
            .with(NetProfit, Decimal::from(-1));
        let issues = Validator::default().check(&fields, StatementType::Income);
        assert!(issues.iter().any(|i| i.code == IssueCode::RangeViolation && i.field == Some(Revenue)));
    }

    #[test]
    fn test_cross_statement_roe() {
        let fields = balance(1000, 990, 10).with(NetProfit, Decimal::from(50));
        let issues = Validator::default().validate_cross(&fields);
        assert_eq!(codes(&issues), [IssueCode::RangeViolation]);
    }

    #[test]
    fn test_cross_statement_cash_quality_and_turnover() {
        let validator = Validator::default();

        let healthy = balance(1000, 600, 400)
            .with(Revenue, Decimal::from(800))
            .with(NetProfit, Decimal::from(50))
            .with(OperatingCashFlow, Decimal::from(60))
            .with(OperatingCost, Decimal::from(500))
            .with(Inventory, Decimal::from(100));
        assert!(validator.validate_cross(&healthy).is_empty());

        let burning = healthy.clone().with(OperatingCashFlow, Decimal::from(-40));
        let issues = validator.validate_cross(&burning);
        assert_eq!(codes(&issues), [IssueCode::RangeViolation]);
        assert_eq!(issues[0].field, Some(OperatingCashFlow));

        let inflated = healthy.clone().with(OperatingCashFlow, Decimal::from(400));
        assert_eq!(codes(&validator.validate_cross(&inflated)), [IssueCode::RangeViolation]);

        let negative_inventory = healthy.with(Inventory, Decimal::from(-10));
        let issues = validator.validate_cross(&negative_inventory);
        assert_eq!(codes(&issues), [IssueCode::RangeViolation]);
        assert_eq!(issues[0].field, Some(Inventory));
    }

    #[test]
    fn test_huge_totals_do_not_abort() {
        let fields = FieldSet::new()
            .with(TotalAssets, Decimal::MAX)
            .with(TotalLiabilities, Decimal::MAX)
            .with(TotalEquity, Decimal::ONE)
            .with(CurrentAssets, Decimal::ONE)
            .with(CurrentLiabilities, Decimal::ONE);

        let issues = Validator::default().check(&fields, StatementType::Balance);
        assert!(issues.iter().all(|i| i.code != IssueCode::ConsistencyViolation));
    }

    #[test]
    fn test_confidence_non_increasing() {
        let validator = Validator::default();
        let fields = balance(1000, 600, 400);
        let mut issues = Vec::new();
        let mut last = validator.confidence(&fields, StatementType::Balance, &issues);

        for code in [
            IssueCode::RangeViolation,
            IssueCode::IdentityViolation,
            IssueCode::RangeViolation,
            IssueCode::IdentityViolation,
        ] {
            issues.push(ValidationIssue::new(code, None, "synthetic"));
            let next = validator.confidence(&fields, StatementType::Balance, &issues);
            assert!(next < last, "{next} !< {last}");
            last = next;
        }
    }

    #[test]
    fn test_confidence_without_required_fields() {
        let mut config = ValidationConfig::default();
        config.required.cash_flow.clear();
        let validator = Validator::new(config);

        assert_eq!(validator.confidence(&FieldSet::new(), StatementType::CashFlow, &[]), 0.0);
        let fields = FieldSet::new().with(NetCashFlow, Decimal::from(3));
        assert_eq!(validator.confidence(&fields, StatementType::CashFlow, &[]), 1.0);
    }
}
