//! Line item extraction from located statement tables.

pub mod classify;
pub mod matcher;
mod pipeline;
pub mod resolver;
pub mod rules;
pub mod units;
pub mod values;

pub use classify::classify_table;
pub use matcher::{LineItemMatcher, LineMatch};
pub use pipeline::{PeriodSeries, RuleBasedExtractor};
pub use resolver::{ConflictResolver, Resolved};
pub use rules::{Dictionary, KeywordRule, RuleSpec, RuleTable};
pub use units::{UnitDetector, UnitResolution, UnitSource};
pub use values::{parse_amount, ExtractMode, Extracted, PeriodOrder, PeriodValue, ValueExtractor};

use crate::error::DocumentFormatError;
use crate::models::document::Document;
use crate::models::fields::FieldSet;
use crate::models::result::DocumentReport;

/// Result type for extraction operations.
pub type Result<T> = std::result::Result<T, DocumentFormatError>;

/// Trait for document extractors.
pub trait DocumentExtractor {
    /// Extract every statement of a document.
    ///
    /// `prior` holds the fields of the same period one year earlier and
    /// feeds the growth rates.
    fn extract_document(&self, document: &Document, prior: Option<&FieldSet>) -> Result<DocumentReport>;
}
