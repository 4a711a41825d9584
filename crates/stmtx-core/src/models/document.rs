//! Input model handed over by the document/table locator.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::fields::StatementType;

/// Source format family of the located tables.
///
/// Matching is format-agnostic; the format is carried for reporting only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    /// Tables located in an HTML filing (e.g. SEC EDGAR).
    HtmlTable,
    /// Tables recovered from a PDF report.
    PdfTable,
    #[default]
    Unknown,
}

/// Reporting period covered by a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportPeriod {
    #[default]
    Annual,
    SemiAnnual,
    Q1,
    Q2,
    Q3,
    Q4,
}

impl ReportPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportPeriod::Annual => "annual",
            ReportPeriod::SemiAnnual => "semi_annual",
            ReportPeriod::Q1 => "q1",
            ReportPeriod::Q2 => "q2",
            ReportPeriod::Q3 => "q3",
            ReportPeriod::Q4 => "q4",
        }
    }
}

impl fmt::Display for ReportPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of a located table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRecord {
    /// Row label text (usually the first cell).
    pub label_text: String,

    /// Raw cell text in column order; cell 0 is the label column.
    pub cells: Vec<String>,

    /// Identifier of the table the row belongs to.
    #[serde(default)]
    pub table_id: String,
}

impl RowRecord {
    /// Build a row from its cells, taking the label from the first cell.
    pub fn from_cells<I, S>(table_id: impl Into<String>, cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let cells: Vec<String> = cells.into_iter().map(Into::into).collect();
        Self {
            label_text: cells.first().cloned().unwrap_or_default(),
            cells,
            table_id: table_id.into(),
        }
    }

    /// Cells after the label column.
    pub fn value_cells(&self) -> &[String] {
        self.cells.get(1..).unwrap_or(&[])
    }
}

/// A table located in the source document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateTable {
    /// Table identifier, unique within the document.
    pub id: String,

    /// Statement type inferred by the locator, if any.
    pub statement: Option<StatementType>,

    /// Table caption or title.
    pub caption: String,

    /// Text immediately preceding the table (unit notices usually live here).
    pub preceding_text: String,

    /// Column headers, aligned with row cells (header 0 is the label column).
    pub headers: Vec<String>,

    /// Table rows in source order.
    pub rows: Vec<RowRecord>,
}

impl CandidateTable {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_statement(mut self, statement: StatementType) -> Self {
        self.statement = Some(statement);
        self
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = caption.into();
        self
    }

    pub fn with_preceding_text(mut self, text: impl Into<String>) -> Self {
        self.preceding_text = text.into();
        self
    }

    pub fn with_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.headers = headers.into_iter().map(Into::into).collect();
        self
    }

    /// Append a row given as cells; the row inherits the table id.
    pub fn with_row<I, S>(mut self, cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let row = RowRecord::from_cells(self.id.clone(), cells);
        self.rows.push(row);
        self
    }
}

/// A located document: metadata plus its candidate tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Document {
    /// Reporting entity (ticker, stock code, CIK...).
    pub entity_id: String,

    /// Fiscal year the document reports on.
    pub fiscal_year: i32,

    /// Period within the fiscal year.
    pub period: ReportPeriod,

    /// Balance sheet date, when known.
    pub report_date: Option<NaiveDate>,

    /// Format family the tables were recovered from.
    pub format: SourceFormat,

    /// Document-wide text, used as the unit declaration fallback.
    pub text: String,

    /// Candidate tables in document order.
    pub tables: Vec<CandidateTable>,
}

impl Document {
    pub fn new(entity_id: impl Into<String>, fiscal_year: i32, period: ReportPeriod) -> Self {
        Self {
            entity_id: entity_id.into(),
            fiscal_year,
            period,
            ..Default::default()
        }
    }

    pub fn with_table(mut self, table: CandidateTable) -> Self {
        self.tables.push(table);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_format(mut self, format: SourceFormat) -> Self {
        self.format = format;
        self
    }

    /// Load a document from its JSON representation.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_from_cells() {
        let row = RowRecord::from_cells("t1", ["Total revenues", "28,095", "25,182"]);
        assert_eq!(row.label_text, "Total revenues");
        assert_eq!(row.value_cells(), ["28,095", "25,182"]);
        assert_eq!(row.table_id, "t1");
    }

    #[test]
    fn test_empty_row_has_no_value_cells() {
        let row = RowRecord::from_cells("t1", Vec::<String>::new());
        assert!(row.label_text.is_empty());
        assert!(row.value_cells().is_empty());
    }

    #[test]
    fn test_document_from_json() {
        let json = r#"{
            "entity_id": "AAPL",
            "fiscal_year": 2024,
            "period": "annual",
            "format": "html_table",
            "tables": [{
                "id": "t1",
                "statement": "income",
                "headers": ["", "2024", "2023"],
                "rows": [{"label_text": "Net sales", "cells": ["Net sales", "391,035", "383,285"]}]
            }]
        }"#;

        let doc = Document::from_json(json).unwrap();
        assert_eq!(doc.entity_id, "AAPL");
        assert_eq!(doc.format, SourceFormat::HtmlTable);
        assert_eq!(doc.tables[0].statement, Some(StatementType::Income));
        assert_eq!(doc.tables[0].rows[0].value_cells().len(), 2);
    }
}
