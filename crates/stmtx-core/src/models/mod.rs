//! Data models for statement extraction.

pub mod config;
pub mod document;
pub mod fields;
pub mod metrics;
pub mod result;
