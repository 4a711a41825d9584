//! Subcommands and the helpers they share.

pub mod batch;
pub mod config;
pub mod extract;
pub mod rules;

use std::path::Path;

use stmtx_core::{Dictionary, StatementType, StmtxConfig};
use tracing::debug;

/// Load the configuration from an explicit path, the default location, or
/// fall back to built-in defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<StmtxConfig> {
    if let Some(path) = config_path {
        debug!("Loading config from {}", path);
        return Ok(StmtxConfig::from_file(Path::new(path))?);
    }

    let default_path = config::default_config_path();
    if default_path.exists() {
        debug!("Loading config from {}", default_path.display());
        Ok(StmtxConfig::from_file(&default_path)?)
    } else {
        Ok(StmtxConfig::default())
    }
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum DictionaryArg {
    English,
    Chinese,
    Bilingual,
}

impl From<DictionaryArg> for Dictionary {
    fn from(arg: DictionaryArg) -> Self {
        match arg {
            DictionaryArg::English => Dictionary::English,
            DictionaryArg::Chinese => Dictionary::Chinese,
            DictionaryArg::Bilingual => Dictionary::Bilingual,
        }
    }
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum StatementArg {
    Income,
    Balance,
    CashFlow,
}

impl From<StatementArg> for StatementType {
    fn from(arg: StatementArg) -> Self {
        match arg {
            StatementArg::Income => StatementType::Income,
            StatementArg::Balance => StatementType::Balance,
            StatementArg::CashFlow => StatementType::CashFlow,
        }
    }
}
