//! Configuration structures for the extraction pipeline.

use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::extract::rules::{Dictionary, RuleSpec};
use crate::extract::values::{ExtractMode, PeriodOrder};
use crate::models::fields::{CanonicalField, StatementType};
use crate::models::result::IssueCode;

/// Main configuration for the stmtx pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StmtxConfig {
    /// Row matching and value selection.
    pub extraction: ExtractionConfig,

    /// Unit declaration detection.
    pub units: UnitConfig,

    /// Additional label rules layered over the built-in dictionary.
    pub rules: RulesConfig,

    /// Validation tolerances, bounds and confidence weights.
    pub validation: ValidationConfig,

    /// Accept/degrade policy of the caller.
    pub fallback: FallbackConfig,
}

/// Extraction configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Built-in label dictionary.
    pub dictionary: Dictionary,

    /// Values reported per matched row: the latest period or all of them.
    pub mode: ExtractMode,

    /// Column order of reporting periods in source tables.
    pub period_order: PeriodOrder,

    /// Classify tables the locator did not tag with a statement type.
    pub classify_untagged_tables: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            dictionary: Dictionary::English,
            mode: ExtractMode::Latest,
            period_order: PeriodOrder::NewestFirst,
            classify_untagged_tables: true,
        }
    }
}

/// Unit detection configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitConfig {
    /// Number of characters of preceding text scanned for a local declaration.
    pub window_chars: usize,

    /// Multiplier used when no declaration is found anywhere.
    pub default_multiplier: Decimal,
}

impl Default for UnitConfig {
    fn default() -> Self {
        Self {
            window_chars: 400,
            default_multiplier: Decimal::ONE,
        }
    }
}

/// Custom rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Rules added on top of the selected dictionary.
    pub extra: Vec<RuleSpec>,

    /// Drop the built-in dictionary and use only `extra`.
    pub replace_builtin: bool,
}

/// Inclusive bounds of a plausible value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Decimal,
    pub max: Decimal,
}

impl Bounds {
    pub fn new(min: Decimal, max: Decimal) -> Self {
        Self { min, max }
    }

    /// Whether `value` lies within the bounds widened by `tolerance` on each side.
    pub fn contains(&self, value: Decimal, tolerance: Decimal) -> bool {
        value >= self.min - tolerance && value <= self.max + tolerance
    }
}

/// P0 fields per statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequiredFields {
    pub income: Vec<CanonicalField>,
    pub balance: Vec<CanonicalField>,
    pub cash_flow: Vec<CanonicalField>,
}

impl RequiredFields {
    pub fn for_statement(&self, statement: StatementType) -> &[CanonicalField] {
        match statement {
            StatementType::Income => &self.income,
            StatementType::Balance => &self.balance,
            StatementType::CashFlow => &self.cash_flow,
        }
    }
}

impl Default for RequiredFields {
    fn default() -> Self {
        Self {
            income: vec![CanonicalField::Revenue, CanonicalField::NetProfit],
            balance: vec![
                CanonicalField::TotalAssets,
                CanonicalField::TotalLiabilities,
                CanonicalField::TotalEquity,
            ],
            cash_flow: vec![CanonicalField::OperatingCashFlow],
        }
    }
}

/// Confidence penalty per issue kind, each in [0, 1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssueWeights {
    pub missing_required_field: f64,
    pub identity_violation: f64,
    pub range_violation: f64,
    pub consistency_violation: f64,
    pub conflict_ignored: f64,
    pub value_superseded: f64,
    pub unit_detection_ambiguous: f64,
}

impl IssueWeights {
    pub fn weight(&self, code: IssueCode) -> f64 {
        match code {
            IssueCode::MissingRequiredField => self.missing_required_field,
            IssueCode::IdentityViolation => self.identity_violation,
            IssueCode::RangeViolation => self.range_violation,
            IssueCode::ConsistencyViolation => self.consistency_violation,
            IssueCode::ConflictIgnored => self.conflict_ignored,
            IssueCode::ValueSuperseded => self.value_superseded,
            IssueCode::UnitDetectionAmbiguous => self.unit_detection_ambiguous,
        }
    }

    fn all(&self) -> [(&'static str, f64); 7] {
        [
            ("missing_required_field", self.missing_required_field),
            ("identity_violation", self.identity_violation),
            ("range_violation", self.range_violation),
            ("consistency_violation", self.consistency_violation),
            ("conflict_ignored", self.conflict_ignored),
            ("value_superseded", self.value_superseded),
            ("unit_detection_ambiguous", self.unit_detection_ambiguous),
        ]
    }
}

impl Default for IssueWeights {
    fn default() -> Self {
        Self {
            missing_required_field: 0.15,
            identity_violation: 0.20,
            range_violation: 0.10,
            consistency_violation: 0.10,
            conflict_ignored: 0.02,
            value_superseded: 0.01,
            unit_detection_ambiguous: 0.05,
        }
    }
}

/// Validation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Relative tolerance of `assets = liabilities + equity`.
    pub identity_tolerance: Decimal,

    /// Relative slack for "part <= whole" consistency checks.
    pub consistency_tolerance: Decimal,

    /// Absolute slack added to every ratio bound.
    pub range_tolerance: Decimal,

    /// Total liabilities over total assets.
    pub leverage: Bounds,

    pub gross_margin: Bounds,

    pub net_margin: Bounds,

    pub current_ratio: Bounds,

    pub roe: Bounds,

    /// Operating cash flow over net profit.
    pub ocf_to_net_profit: Bounds,

    /// Operating cost may exceed revenue by at most this factor.
    pub max_cost_to_revenue: Decimal,

    pub required: RequiredFields,

    pub weights: IssueWeights,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            identity_tolerance: Decimal::new(1, 2),
            consistency_tolerance: Decimal::new(1, 2),
            range_tolerance: Decimal::new(5, 2),
            leverage: Bounds::new(Decimal::ZERO, Decimal::ONE),
            gross_margin: Bounds::new(Decimal::new(-5, 1), Decimal::ONE),
            net_margin: Bounds::new(Decimal::NEGATIVE_ONE, Decimal::ONE),
            current_ratio: Bounds::new(Decimal::ZERO, Decimal::TEN),
            roe: Bounds::new(Decimal::NEGATIVE_ONE, Decimal::ONE),
            ocf_to_net_profit: Bounds::new(Decimal::ZERO, Decimal::from(5)),
            max_cost_to_revenue: Decimal::new(15, 1),
            required: RequiredFields::default(),
            weights: IssueWeights::default(),
        }
    }
}

/// Caller policy for accepting or degrading results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Minimum document confidence for an accepted extraction.
    pub min_confidence: f64,

    /// Confidence ceiling of results marked as degraded.
    pub degraded_confidence_cap: f64,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.5,
            degraded_confidence_cap: 0.3,
        }
    }
}

impl StmtxConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check numeric settings against their domains.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, weight) in self.validation.weights.all() {
            if !(0.0..1.0).contains(&weight) {
                return Err(ConfigError::InvalidValue {
                    key: format!("validation.weights.{key}"),
                    reason: format!("{weight} is outside [0, 1)"),
                });
            }
        }

        for (key, value) in [
            ("fallback.min_confidence", self.fallback.min_confidence),
            ("fallback.degraded_confidence_cap", self.fallback.degraded_confidence_cap),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    reason: format!("{value} is outside [0, 1]"),
                });
            }
        }

        if self.units.default_multiplier <= Decimal::ZERO {
            return Err(ConfigError::InvalidValue {
                key: "units.default_multiplier".to_string(),
                reason: "must be positive".to_string(),
            });
        }

        for (key, tolerance) in [
            ("validation.identity_tolerance", self.validation.identity_tolerance),
            ("validation.consistency_tolerance", self.validation.consistency_tolerance),
            ("validation.range_tolerance", self.validation.range_tolerance),
        ] {
            if tolerance.is_sign_negative() {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    reason: "must not be negative".to_string(),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(StmtxConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{"fallback": {"min_confidence": 0.8}, "extraction": {"dictionary": "chinese"}}"#;
        let config: StmtxConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.fallback.min_confidence, 0.8);
        assert_eq!(config.fallback.degraded_confidence_cap, 0.3);
        assert_eq!(config.extraction.dictionary, Dictionary::Chinese);
        assert_eq!(config.validation.identity_tolerance, Decimal::new(1, 2));
    }

    #[test]
    fn test_invalid_weight_rejected() {
        let mut config = StmtxConfig::default();
        config.validation.weights.identity_violation = 1.0;

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("identity_violation"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = StmtxConfig::default();
        config.units.window_chars = 1200;
        config.save(&path).unwrap();

        let loaded = StmtxConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_bounds_tolerance() {
        let bounds = Bounds::new(Decimal::ZERO, Decimal::ONE);
        let tol = Decimal::new(5, 2);

        assert!(bounds.contains(Decimal::new(104, 2), tol));
        assert!(!bounds.contains(Decimal::new(106, 2), tol));
        assert!(!bounds.contains(Decimal::new(-1, 1), tol));
    }
}
