//! Core library for financial statement line item extraction.
//!
//! This crate provides:
//! - Prioritized keyword rules mapping row labels to canonical fields (English and Chinese)
//! - Cell parsing, period selection and scale unit detection
//! - Conflict resolution between rows mapping to the same field
//! - Accounting identity, range and consistency validation with confidence scoring
//! - Derived ratios, accept/degrade decisions and result persistence

pub mod error;
pub mod extract;
pub mod fallback;
pub mod models;
pub mod ratios;
pub mod store;
pub mod validation;

pub use error::{ConfigError, DocumentFormatError, Result, StmtxError, StoreError};
pub use extract::{
    classify_table, Dictionary, DocumentExtractor, ExtractMode, LineItemMatcher, PeriodOrder,
    RuleBasedExtractor, RuleSpec, RuleTable,
};
pub use fallback::{Decision, DegradeReason, FallbackController, PlaceholderSource, SyntheticSource};
pub use models::config::StmtxConfig;
pub use models::document::{CandidateTable, Document, ReportPeriod, RowRecord, SourceFormat};
pub use models::fields::{CanonicalField, FieldSet, StatementType};
pub use models::metrics::{Ratio, RatioSet};
pub use models::result::{
    DocumentReport, ExtractedField, IssueCode, ReportKey, ResultTier, StatementResult,
    ValidationIssue,
};
pub use ratios::RatioCalculator;
pub use store::{JsonDirStore, MemoryStore, ResultStore, UpsertOutcome};
pub use validation::Validator;
