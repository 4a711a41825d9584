//! Rule-based document extraction pipeline.

use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::error::{ConfigError, DocumentFormatError};
use crate::fallback::{DegradeReason, FallbackController, SyntheticSource};
use crate::models::config::StmtxConfig;
use crate::models::document::{CandidateTable, Document};
use crate::models::fields::{CanonicalField, FieldSet, StatementType};
use crate::models::result::{
    DocumentReport, ExtractedField, IssueCode, ReportKey, ResultTier, RuleRef, SourceRow,
    StatementResult, ValidationIssue,
};
use crate::ratios::RatioCalculator;
use crate::validation::Validator;

use super::classify::classify_table;
use super::matcher::LineItemMatcher;
use super::resolver::ConflictResolver;
use super::rules::RuleTable;
use super::units::UnitDetector;
use super::values::{ExtractMode, Extracted, PeriodOrder, PeriodValue, ValueExtractor};
use super::{DocumentExtractor, Result};

/// Every period value of each populated field.
pub type PeriodSeries = BTreeMap<CanonicalField, Vec<PeriodValue>>;

/// Document extractor driven by a keyword rule table.
#[derive(Debug, Clone)]
pub struct RuleBasedExtractor {
    matcher: LineItemMatcher,
    values: ValueExtractor,
    units: UnitDetector,
    validator: Validator,
    ratios: RatioCalculator,
    fallback: FallbackController,
    /// Classify tables the locator left untagged.
    classify_untagged: bool,
}

impl RuleBasedExtractor {
    /// Create an extractor over a shared rule table with default settings.
    pub fn new(table: Arc<RuleTable>) -> Self {
        Self {
            matcher: LineItemMatcher::new(table),
            values: ValueExtractor::default(),
            units: UnitDetector::default(),
            validator: Validator::default(),
            ratios: RatioCalculator::new(),
            fallback: FallbackController::default(),
            classify_untagged: true,
        }
    }

    /// Build the rule table and every component from a configuration.
    pub fn from_config(config: &StmtxConfig) -> std::result::Result<Self, ConfigError> {
        let table = Arc::new(RuleTable::from_config(config)?);
        Ok(Self::with_rule_table(table, config))
    }

    /// Configure components from `config` around an already built table.
    pub fn with_rule_table(table: Arc<RuleTable>, config: &StmtxConfig) -> Self {
        Self::new(table)
            .with_period_order(config.extraction.period_order)
            .with_classification(config.extraction.classify_untagged_tables)
            .with_unit_detector(UnitDetector::from_config(&config.units))
            .with_validator(Validator::new(config.validation.clone()))
            .with_fallback(FallbackController::from_config(&config.fallback))
    }

    /// Set the column order of reporting periods.
    pub fn with_period_order(mut self, order: PeriodOrder) -> Self {
        self.values = ValueExtractor::new(order);
        self
    }

    /// Enable or disable classification of untagged tables.
    pub fn with_classification(mut self, enabled: bool) -> Self {
        self.classify_untagged = enabled;
        self
    }

    pub fn with_unit_detector(mut self, units: UnitDetector) -> Self {
        self.units = units;
        self
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_fallback(mut self, fallback: FallbackController) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn matcher(&self) -> &LineItemMatcher {
        &self.matcher
    }

    pub fn fallback(&self) -> &FallbackController {
        &self.fallback
    }

    /// Reject documents that cannot be processed at all.
    fn check_structure(&self, document: &Document) -> Result<()> {
        if document.tables.is_empty() {
            return Err(DocumentFormatError::NoTables(document.entity_id.clone()));
        }
        for table in &document.tables {
            if table.rows.is_empty() {
                return Err(DocumentFormatError::EmptyTable(table.id.clone()));
            }
            if table.rows.iter().all(|row| row.value_cells().is_empty()) {
                return Err(DocumentFormatError::NoValueColumns(table.id.clone()));
            }
        }
        Ok(())
    }

    /// Group tables by statement, classifying untagged ones when enabled.
    fn group_tables<'a>(&self, document: &'a Document) -> BTreeMap<StatementType, Vec<&'a CandidateTable>> {
        let mut grouped: BTreeMap<StatementType, Vec<&CandidateTable>> = BTreeMap::new();
        for table in &document.tables {
            let statement = match table.statement {
                Some(statement) => Some(statement),
                None if self.classify_untagged => classify_table(table),
                None => None,
            };
            match statement {
                Some(statement) => {
                    debug!("Table {} holds the {} statement", table.id, statement);
                    grouped.entry(statement).or_default().push(table);
                }
                None => debug!("Skipping unclassified table {}", table.id),
            }
        }
        grouped
    }

    /// Extract one statement from its tables.
    pub fn extract_statement(
        &self,
        statement: StatementType,
        tables: &[&CandidateTable],
        document_text: &str,
        prior: Option<&FieldSet>,
    ) -> StatementResult {
        let mut resolver = ConflictResolver::new();
        let mut issues = Vec::new();
        let mut statement_multiplier = None;

        for table in tables {
            let unit = self.units.resolve(table, document_text);
            if unit.is_ambiguous() {
                warn!("No unit declaration for table {}, values left unscaled", table.id);
                issues.push(ValidationIssue::new(
                    IssueCode::UnitDetectionAmbiguous,
                    None,
                    format!("no unit declaration for table {}; multiplier {} assumed", table.id, unit.multiplier),
                ));
            }
            statement_multiplier.get_or_insert(unit.multiplier);

            for (row_index, row) in table.rows.iter().enumerate() {
                let label = if row.label_text.trim().is_empty() {
                    row.cells.first().map(String::as_str).unwrap_or_default()
                } else {
                    row.label_text.as_str()
                };
                let Some(matched) = self.matcher.match_in(label, statement) else {
                    continue;
                };

                let multiplier = matched.field.effective_multiplier(unit.multiplier);
                let value = self.values.latest(row, multiplier);
                debug!("{} row {} '{}' -> {} = {:?}", table.id, row_index, label, matched.field, value);

                resolver.accumulate(ExtractedField {
                    field: matched.field,
                    value,
                    source_row: SourceRow {
                        table_id: table.id.clone(),
                        row_index,
                        label: label.to_string(),
                    },
                    rule_used: RuleRef {
                        pattern: matched.rule.pattern().to_string(),
                        priority: matched.rule.priority(),
                    },
                    unit_multiplier: multiplier,
                });
            }
        }

        let resolved = resolver.finish();
        issues.extend(resolved.issues);
        issues.extend(self.validator.check(&resolved.fields, statement));

        let ratios = self.ratios.calculate(&resolved.fields, prior);
        let confidence = self.validator.confidence(&resolved.fields, statement, &issues);
        debug!(
            "{} statement: {} fields, confidence {:.3}",
            statement,
            resolved.fields.count_present(statement.fields()),
            confidence
        );

        StatementResult::new(
            statement,
            resolved.fields,
            ratios,
            statement_multiplier.unwrap_or(Decimal::ONE),
            confidence,
            issues,
            resolved.provenance,
        )
    }

    /// Every period value of the rows that won each field.
    pub fn period_series(&self, document: &Document, report: &DocumentReport) -> PeriodSeries {
        let mut series = PeriodSeries::new();
        for result in report.statements.values() {
            for field in result.statement().fields() {
                let Some(origin) = result.provenance(field) else {
                    continue;
                };
                let Some(table) = document.tables.iter().find(|t| t.id == origin.source_row.table_id) else {
                    continue;
                };
                let Some(row) = table.rows.get(origin.source_row.row_index) else {
                    continue;
                };
                if let Extracted::Periods(values) =
                    self.values.extract(row, &table.headers, ExtractMode::AllPeriods, origin.unit_multiplier)
                {
                    series.insert(field, values);
                }
            }
        }
        series
    }

    /// Extract a document, substituting a degraded result when extraction
    /// fails or is not trusted.
    pub fn extract_or_degrade(
        &self,
        document: &Document,
        prior: Option<&FieldSet>,
        source: &dyn SyntheticSource,
    ) -> DocumentReport {
        let key = ReportKey::new(document.entity_id.clone(), document.fiscal_year, document.period);
        match self.extract_document(document, prior) {
            Ok(report) if report.decision.is_accept() => report,
            Ok(report) => {
                if source.fields(&report.key).is_some() {
                    self.fallback.substitute(key, DegradeReason::LowConfidence, source)
                } else {
                    report.into_degraded(self.fallback.degraded_confidence_cap())
                }
            }
            Err(e) => {
                warn!("Extraction of {} failed: {}", key, e);
                self.fallback.substitute(key, DegradeReason::UpstreamFailed, source)
            }
        }
    }
}

impl DocumentExtractor for RuleBasedExtractor {
    fn extract_document(&self, document: &Document, prior: Option<&FieldSet>) -> Result<DocumentReport> {
        let key = ReportKey::new(document.entity_id.clone(), document.fiscal_year, document.period);
        info!("Extracting {} from {} tables", key, document.tables.len());

        self.check_structure(document)?;

        let grouped = self.group_tables(document);
        if grouped.is_empty() {
            return Err(DocumentFormatError::Unclassified(document.entity_id.clone()));
        }

        let statements: BTreeMap<StatementType, StatementResult> = grouped
            .iter()
            .map(|(statement, tables)| {
                let result = self.extract_statement(*statement, tables, &document.text, prior);
                (*statement, result)
            })
            .collect();

        let mut fields = FieldSet::new();
        for result in statements.values() {
            fields.merge(result.fields());
        }
        let ratios = self.ratios.calculate(&fields, prior);
        let cross_issues = self.validator.validate_cross(&fields);

        let weights = &self.validator.config().weights;
        let retained: f64 = cross_issues
            .iter()
            .map(|issue| 1.0 - weights.weight(issue.code))
            .product();
        let mean = StatementType::ALL
            .iter()
            .map(|s| statements.get(s).map(StatementResult::confidence).unwrap_or(0.0))
            .sum::<f64>()
            / StatementType::ALL.len() as f64;
        let confidence = (mean * retained).clamp(0.0, 1.0);

        let decision = self.fallback.decide(confidence, true);
        info!(
            "Extracted {}: {} statements, {} fields, confidence {:.3}",
            key,
            statements.len(),
            fields.count_present(CanonicalField::ALL),
            confidence
        );

        Ok(DocumentReport {
            key,
            report_date: document.report_date,
            format: document.format,
            statements,
            fields,
            ratios,
            cross_issues,
            confidence,
            decision,
            tier: ResultTier::Extracted,
        })
    }
}
