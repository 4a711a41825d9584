//! Error types for the stmtx-core library.

use thiserror::Error;

/// Main error type for the stmtx library.
#[derive(Error, Debug)]
pub enum StmtxError {
    /// The document could not be processed at all.
    #[error("document format error: {0}")]
    DocumentFormat(#[from] DocumentFormatError),

    /// Configuration or rule table construction error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Result store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Hard failures that make a whole document unusable.
///
/// Every other extraction problem is soft and is reported as a
/// [`ValidationIssue`](crate::models::result::ValidationIssue) instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentFormatError {
    /// The locator produced no candidate tables.
    #[error("no tables located in document {0}")]
    NoTables(String),

    /// A table has no rows.
    #[error("table {0} has no rows")]
    EmptyTable(String),

    /// A table has rows but none carries a cell beyond the label column.
    #[error("table {0} has no value columns")]
    NoValueColumns(String),

    /// None of the tables could be attributed to a financial statement.
    #[error("no table in document {0} looks like a financial statement")]
    Unclassified(String),
}

/// Errors raised while building configuration-derived structures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A rule pattern is empty after normalization.
    #[error("rule for {field} has an empty pattern")]
    EmptyPattern { field: String },

    /// An excluded term is empty after normalization.
    #[error("rule '{pattern}' has an empty excluded term")]
    EmptyExcludedTerm { pattern: String },

    /// A numeric setting is out of its domain.
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Errors related to the result store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    Poisoned,

    /// Failed to read or write a stored record.
    #[error("failed to access record {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// A stored record could not be decoded.
    #[error("corrupt record {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for the stmtx library.
pub type Result<T> = std::result::Result<T, StmtxError>;
