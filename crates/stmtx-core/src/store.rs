//! Result persistence keyed by (entity, fiscal year, period).
//!
//! Upserts are idempotent: writing the same report twice leaves the
//! store unchanged and reports [`UpsertOutcome::Unchanged`].

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::error::StoreError;
use crate::models::fields::FieldSet;
use crate::models::result::{DocumentReport, ReportKey};

/// What an upsert did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    Unchanged,
}

/// Persistence collaborator for document reports.
pub trait ResultStore: Send + Sync {
    /// Insert or replace the report stored under its key.
    fn upsert(&self, report: &DocumentReport) -> Result<UpsertOutcome, StoreError>;

    fn get(&self, key: &ReportKey) -> Result<Option<DocumentReport>, StoreError>;

    /// Stored keys in ascending order.
    fn keys(&self) -> Result<Vec<ReportKey>, StoreError>;

    /// Fields of the same period one year earlier, for growth rates.
    fn prior_fields(&self, key: &ReportKey) -> Result<Option<FieldSet>, StoreError> {
        Ok(self.get(&key.prior_year())?.map(|report| report.fields))
    }
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    reports: Mutex<BTreeMap<ReportKey, DocumentReport>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.reports.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResultStore for MemoryStore {
    fn upsert(&self, report: &DocumentReport) -> Result<UpsertOutcome, StoreError> {
        let mut reports = self.reports.lock().map_err(|_| StoreError::Poisoned)?;
        let outcome = match reports.get(&report.key) {
            None => UpsertOutcome::Inserted,
            Some(existing) if existing == report => return Ok(UpsertOutcome::Unchanged),
            Some(_) => UpsertOutcome::Updated,
        };
        reports.insert(report.key.clone(), report.clone());
        Ok(outcome)
    }

    fn get(&self, key: &ReportKey) -> Result<Option<DocumentReport>, StoreError> {
        let reports = self.reports.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(reports.get(key).cloned())
    }

    fn keys(&self) -> Result<Vec<ReportKey>, StoreError> {
        let reports = self.reports.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(reports.keys().cloned().collect())
    }
}

/// Store writing one pretty-printed JSON file per report.
#[derive(Debug)]
pub struct JsonDirStore {
    root: PathBuf,
    /// Per-key write locks.
    locks: Mutex<BTreeMap<ReportKey, Arc<Mutex<()>>>>,
}

impl JsonDirStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| StoreError::Io {
            key: root.display().to_string(),
            source,
        })?;
        info!("Opened result store at {}", root.display());
        Ok(Self {
            root,
            locks: Mutex::new(BTreeMap::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File holding the report of `key`.
    pub fn path_for(&self, key: &ReportKey) -> PathBuf {
        let entity: String = key
            .entity_id
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.root
            .join(format!("{}_{}_{}.json", entity, key.fiscal_year, key.period))
    }

    fn lock_for(&self, key: &ReportKey) -> Result<Arc<Mutex<()>>, StoreError> {
        let mut locks = self.locks.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(locks.entry(key.clone()).or_default().clone())
    }

    fn read(&self, path: &Path, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}

impl ResultStore for JsonDirStore {
    fn upsert(&self, report: &DocumentReport) -> Result<UpsertOutcome, StoreError> {
        let key = report.key.to_string();
        let lock = self.lock_for(&report.key)?;
        let _guard = lock.lock().map_err(|_| StoreError::Poisoned)?;

        let content = serde_json::to_string_pretty(report).map_err(|source| StoreError::Corrupt {
            key: key.clone(),
            source,
        })?;

        let path = self.path_for(&report.key);
        let outcome = match self.read(&path, &key)? {
            None => UpsertOutcome::Inserted,
            Some(existing) if existing == content => {
                debug!("Report {} unchanged", key);
                return Ok(UpsertOutcome::Unchanged);
            }
            Some(_) => UpsertOutcome::Updated,
        };

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, &content)
            .and_then(|_| fs::rename(&tmp, &path))
            .map_err(|source| StoreError::Io {
                key: key.clone(),
                source,
            })?;

        debug!("Report {} {:?}", key, outcome);
        Ok(outcome)
    }

    fn get(&self, key: &ReportKey) -> Result<Option<DocumentReport>, StoreError> {
        let name = key.to_string();
        let Some(content) = self.read(&self.path_for(key), &name)? else {
            return Ok(None);
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| StoreError::Corrupt { key: name, source })
    }

    fn keys(&self) -> Result<Vec<ReportKey>, StoreError> {
        let root = self.root.display().to_string();
        let entries = fs::read_dir(&self.root).map_err(|source| StoreError::Io {
            key: root.clone(),
            source,
        })?;

        let mut keys = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|source| StoreError::Io {
                    key: root.clone(),
                    source,
                })?
                .path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let name = path.display().to_string();
            if let Some(content) = self.read(&path, &name)? {
                let report: DocumentReport = serde_json::from_str(&content)
                    .map_err(|source| StoreError::Corrupt { key: name, source })?;
                keys.push(report.key);
            }
        }

        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback::{DegradeReason, FallbackController, PlaceholderSource};
    use crate::models::document::ReportPeriod;
    use crate::models::fields::CanonicalField;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    fn report(entity: &str, year: i32, revenue: i64) -> DocumentReport {
        let key = ReportKey::new(entity, year, ReportPeriod::Annual);
        let mut report =
            FallbackController::default().substitute(key, DegradeReason::UpstreamFailed, &PlaceholderSource);
        report.fields.set(CanonicalField::Revenue, Some(Decimal::from(revenue)));
        report
    }

    fn exercise(store: &dyn ResultStore) {
        let first = report("AAPL", 2024, 100);
        assert_eq!(store.upsert(&first).unwrap(), UpsertOutcome::Inserted);
        assert_eq!(store.upsert(&first).unwrap(), UpsertOutcome::Unchanged);

        let changed = report("AAPL", 2024, 120);
        assert_eq!(store.upsert(&changed).unwrap(), UpsertOutcome::Updated);
        assert_eq!(store.get(&changed.key).unwrap(), Some(changed.clone()));

        store.upsert(&report("AAPL", 2023, 90)).unwrap();
        store.upsert(&report("600519.SH", 2024, 5)).unwrap();

        let keys = store.keys().unwrap();
        assert_eq!(keys.len(), 3);
        assert_eq!(keys[0].entity_id, "600519.SH");

        let prior = store.prior_fields(&changed.key).unwrap().unwrap();
        assert_eq!(prior.get(CanonicalField::Revenue), Some(Decimal::from(90)));
        assert!(store.prior_fields(&keys[0]).unwrap().is_none());
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        exercise(&store);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_json_dir_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDirStore::open(dir.path().join("reports")).unwrap();
        exercise(&store);

        let path = store.path_for(&ReportKey::new("600519.SH", 2024, ReportPeriod::Annual));
        assert!(path.ends_with("600519_SH_2024_annual.json"));
        assert!(path.exists());
    }

    #[test]
    fn test_corrupt_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDirStore::open(dir.path()).unwrap();
        let key = ReportKey::new("AAPL", 2024, ReportPeriod::Annual);
        fs::write(store.path_for(&key), "{not json").unwrap();

        assert!(matches!(store.get(&key), Err(StoreError::Corrupt { .. })));
    }
}
