//! Extraction results handed to collaborators.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::document::{ReportPeriod, SourceFormat};
use super::fields::{CanonicalField, FieldSet, StatementType};
use super::metrics::RatioSet;
use crate::fallback::Decision;

/// Kind of a soft extraction problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    /// A P0 field is null.
    MissingRequiredField,
    /// Assets differ from liabilities plus equity beyond tolerance.
    IdentityViolation,
    /// A value or ratio lies outside its plausible domain.
    RangeViolation,
    /// Two related fields contradict each other (e.g. current assets above total assets).
    ConsistencyViolation,
    /// A lower-or-equal priority candidate was discarded.
    ConflictIgnored,
    /// A higher priority candidate replaced an earlier value.
    ValueSuperseded,
    /// No unit declaration was found; values are unscaled.
    UnitDetectionAmbiguous,
}

impl IssueCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCode::MissingRequiredField => "missing_required_field",
            IssueCode::IdentityViolation => "identity_violation",
            IssueCode::RangeViolation => "range_violation",
            IssueCode::ConsistencyViolation => "consistency_violation",
            IssueCode::ConflictIgnored => "conflict_ignored",
            IssueCode::ValueSuperseded => "value_superseded",
            IssueCode::UnitDetectionAmbiguous => "unit_detection_ambiguous",
        }
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A soft problem recorded during extraction or validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub code: IssueCode,
    pub field: Option<CanonicalField>,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(code: IssueCode, field: Option<CanonicalField>, message: impl Into<String>) -> Self {
        Self {
            code,
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.field {
            Some(field) => write!(f, "[{}] {}: {}", self.code, field, self.message),
            None => write!(f, "[{}] {}", self.code, self.message),
        }
    }
}

/// Where an extracted value came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRow {
    pub table_id: String,
    pub row_index: usize,
    pub label: String,
}

/// The rule that matched a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleRef {
    pub pattern: String,
    pub priority: i32,
}

/// One successfully matched row, before conflict resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedField {
    pub field: CanonicalField,
    pub value: Option<Decimal>,
    pub source_row: SourceRow,
    pub rule_used: RuleRef,
    pub unit_multiplier: Decimal,
}

/// Extraction outcome for one statement of one document.
///
/// Immutable once built; read through the accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementResult {
    statement: StatementType,
    fields: FieldSet,
    ratios: RatioSet,
    unit_multiplier: Decimal,
    confidence: f64,
    issues: Vec<ValidationIssue>,
    /// Winning extraction per populated field.
    provenance: BTreeMap<CanonicalField, ExtractedField>,
}

impl StatementResult {
    pub(crate) fn new(
        statement: StatementType,
        fields: FieldSet,
        ratios: RatioSet,
        unit_multiplier: Decimal,
        confidence: f64,
        issues: Vec<ValidationIssue>,
        provenance: BTreeMap<CanonicalField, ExtractedField>,
    ) -> Self {
        Self {
            statement,
            fields,
            ratios,
            unit_multiplier,
            confidence: confidence.clamp(0.0, 1.0),
            issues,
            provenance,
        }
    }

    pub fn statement(&self) -> StatementType {
        self.statement
    }

    pub fn fields(&self) -> &FieldSet {
        &self.fields
    }

    /// Shorthand for `fields().get(field)`.
    pub fn get(&self, field: CanonicalField) -> Option<Decimal> {
        self.fields.get(field)
    }

    pub fn ratios(&self) -> &RatioSet {
        &self.ratios
    }

    pub fn unit_multiplier(&self) -> Decimal {
        self.unit_multiplier
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    pub fn provenance(&self, field: CanonicalField) -> Option<&ExtractedField> {
        self.provenance.get(&field)
    }

    /// Issues of a given kind.
    pub fn issues_with(&self, code: IssueCode) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(move |i| i.code == code)
    }
}

/// Trust tier of a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultTier {
    /// Values come from a genuine extraction.
    #[default]
    Extracted,
    /// Values come from a synthetic or placeholder source.
    Degraded,
}

/// Identity of a report in persistent storage.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReportKey {
    pub entity_id: String,
    pub fiscal_year: i32,
    pub period: ReportPeriod,
}

impl ReportKey {
    pub fn new(entity_id: impl Into<String>, fiscal_year: i32, period: ReportPeriod) -> Self {
        Self {
            entity_id: entity_id.into(),
            fiscal_year,
            period,
        }
    }

    /// Key of the same period one fiscal year earlier.
    pub fn prior_year(&self) -> Self {
        Self {
            entity_id: self.entity_id.clone(),
            fiscal_year: self.fiscal_year - 1,
            period: self.period,
        }
    }
}

impl fmt::Display for ReportKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.entity_id, self.fiscal_year, self.period)
    }
}

/// Every statement extracted from one document, plus the document-wide view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentReport {
    pub key: ReportKey,

    pub report_date: Option<NaiveDate>,

    pub format: SourceFormat,

    /// One result per statement type found in the document.
    pub statements: BTreeMap<StatementType, StatementResult>,

    /// Union of all statement fields.
    pub fields: FieldSet,

    /// Ratios computed over the union, including cross-statement ones.
    pub ratios: RatioSet,

    /// Issues raised by checks spanning statements.
    #[serde(default)]
    pub cross_issues: Vec<ValidationIssue>,

    /// Mean of statement confidences over the three statement types
    /// (a missing statement counts as zero).
    pub confidence: f64,

    pub decision: Decision,

    pub tier: ResultTier,
}

impl DocumentReport {
    pub fn statement(&self, statement: StatementType) -> Option<&StatementResult> {
        self.statements.get(&statement)
    }

    /// All issues, statement by statement, then cross-statement ones.
    pub fn issues(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.statements
            .values()
            .flat_map(|s| s.issues().iter())
            .chain(self.cross_issues.iter())
    }

    /// Mark the report as coming from a synthetic source, capping its confidence.
    pub fn into_degraded(mut self, confidence_cap: f64) -> Self {
        self.tier = ResultTier::Degraded;
        self.confidence = self.confidence.min(confidence_cap).clamp(0.0, 1.0);
        self
    }
}
