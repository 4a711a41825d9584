//! Accept/degrade decisions and synthetic substitutes.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::config::FallbackConfig;
use crate::models::document::SourceFormat;
use crate::models::fields::FieldSet;
use crate::models::result::{DocumentReport, ReportKey, ResultTier};
use crate::ratios::RatioCalculator;

/// Why an extraction was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradeReason {
    /// Acquisition or table location failed, or the document was unusable.
    UpstreamFailed,
    /// Confidence fell below the caller's threshold.
    LowConfidence,
}

/// Outcome of [`FallbackController::decide`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Accept,
    Degrade(DegradeReason),
}

impl Decision {
    pub fn is_accept(&self) -> bool {
        matches!(self, Decision::Accept)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Accept => f.write_str("accept"),
            Decision::Degrade(DegradeReason::UpstreamFailed) => f.write_str("degrade (upstream failed)"),
            Decision::Degrade(DegradeReason::LowConfidence) => f.write_str("degrade (low confidence)"),
        }
    }
}

/// A source of stand-in values for documents that could not be extracted.
pub trait SyntheticSource {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Stand-in fields for a report, or `None` when the source has nothing.
    fn fields(&self, key: &ReportKey) -> Option<FieldSet>;
}

/// Source that never has values; substitutes are all-null.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderSource;

impl SyntheticSource for PlaceholderSource {
    fn name(&self) -> &str {
        "placeholder"
    }

    fn fields(&self, _key: &ReportKey) -> Option<FieldSet> {
        None
    }
}

/// Decides whether an extraction is usable.
#[derive(Debug, Clone)]
pub struct FallbackController {
    min_confidence: f64,
    degraded_confidence_cap: f64,
}

impl FallbackController {
    pub fn new(min_confidence: f64) -> Self {
        Self {
            min_confidence: min_confidence.clamp(0.0, 1.0),
            degraded_confidence_cap: FallbackConfig::default().degraded_confidence_cap,
        }
    }

    pub fn from_config(config: &FallbackConfig) -> Self {
        Self::new(config.min_confidence).with_confidence_cap(config.degraded_confidence_cap)
    }

    /// Set the confidence ceiling of degraded results.
    pub fn with_confidence_cap(mut self, cap: f64) -> Self {
        self.degraded_confidence_cap = cap.clamp(0.0, 1.0);
        self
    }

    pub fn min_confidence(&self) -> f64 {
        self.min_confidence
    }

    pub fn degraded_confidence_cap(&self) -> f64 {
        self.degraded_confidence_cap
    }

    /// Degrade when upstream failed or confidence is below the threshold.
    pub fn decide(&self, confidence: f64, upstream_ok: bool) -> Decision {
        let decision = if !upstream_ok {
            Decision::Degrade(DegradeReason::UpstreamFailed)
        } else if confidence < self.min_confidence {
            Decision::Degrade(DegradeReason::LowConfidence)
        } else {
            Decision::Accept
        };

        match decision {
            Decision::Accept => debug!("Accepting result (confidence {:.3})", confidence),
            Decision::Degrade(reason) => warn!(
                "Degrading result: {:?} (confidence {:.3}, threshold {:.3})",
                reason, confidence, self.min_confidence
            ),
        }
        decision
    }

    /// Build a degraded report for `key` from a synthetic source.
    ///
    /// Confidence is the cap when the source supplied values and zero otherwise.
    pub fn substitute(&self, key: ReportKey, reason: DegradeReason, source: &dyn SyntheticSource) -> DocumentReport {
        let supplied = source.fields(&key);
        debug!(
            "Substituting {} from {} source ({})",
            key,
            source.name(),
            if supplied.is_some() { "values" } else { "empty" }
        );

        let confidence = if supplied.is_some() { 1.0 } else { 0.0 };
        let fields = supplied.unwrap_or_default();
        let ratios = RatioCalculator::new().calculate(&fields, None);

        DocumentReport {
            key,
            report_date: None,
            format: SourceFormat::Unknown,
            statements: Default::default(),
            fields,
            ratios,
            cross_issues: Vec::new(),
            confidence,
            decision: Decision::Degrade(reason),
            tier: ResultTier::Extracted,
        }
        .into_degraded(self.degraded_confidence_cap)
    }
}

impl Default for FallbackController {
    fn default() -> Self {
        Self::from_config(&FallbackConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::document::ReportPeriod;
    use crate::models::fields::CanonicalField;
    use rust_decimal::Decimal;

    struct FixedSource(FieldSet);

    impl SyntheticSource for FixedSource {
        fn name(&self) -> &str {
            "fixed"
        }

        fn fields(&self, _key: &ReportKey) -> Option<FieldSet> {
            Some(self.0.clone())
        }
    }

    #[test]
    fn test_decide() {
        let controller = FallbackController::new(0.6);

        assert_eq!(controller.decide(0.9, true), Decision::Accept);
        assert_eq!(controller.decide(0.6, true), Decision::Accept);
        assert_eq!(
            controller.decide(0.59, true),
            Decision::Degrade(DegradeReason::LowConfidence)
        );
        assert_eq!(
            controller.decide(1.0, false),
            Decision::Degrade(DegradeReason::UpstreamFailed)
        );
    }

    #[test]
    fn test_placeholder_substitute() {
        let key = ReportKey::new("600519", 2023, ReportPeriod::Annual);
        let report = FallbackController::default().substitute(key, DegradeReason::UpstreamFailed, &PlaceholderSource);

        assert_eq!(report.tier, ResultTier::Degraded);
        assert_eq!(report.confidence, 0.0);
        assert!(report.fields.iter().all(|(_, v)| v.is_none()));
        assert!(!report.decision.is_accept());
    }

    #[test]
    fn test_substitute_confidence_capped() {
        let source = FixedSource(FieldSet::new().with(CanonicalField::Revenue, Decimal::from(10)));
        let key = ReportKey::new("AAPL", 2024, ReportPeriod::Annual);
        let report = FallbackController::new(0.5)
            .with_confidence_cap(0.25)
            .substitute(key, DegradeReason::LowConfidence, &source);

        assert_eq!(report.tier, ResultTier::Degraded);
        assert_eq!(report.confidence, 0.25);
        assert_eq!(report.fields.get(CanonicalField::Revenue), Some(Decimal::from(10)));
    }

    #[test]
    fn test_decision_serialization() {
        let json = serde_json::to_string(&Decision::Degrade(DegradeReason::LowConfidence)).unwrap();
        assert_eq!(json, r#"{"degrade":"low_confidence"}"#);
        assert_eq!(serde_json::to_string(&Decision::Accept).unwrap(), r#""accept""#);
    }
}
