//! Per-account watermark state: the timestamp below which all messages are
//! considered already processed.
//!
//! Monotone by construction; persisted as one JSON map after a batch's
//! reconciliation and write-back both succeed, never before.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::ConfigError;

const WATERMARK_FILE: &str = "watermarks.json";

#[derive(Debug, Error)]
pub enum WatermarkError {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub struct WatermarkStore {
    path: PathBuf,
    marks: HashMap<String, i64>,
}

impl WatermarkStore {
    /// Load persisted watermarks, or start empty on first run.
    pub fn load(state_dir: &Path) -> Result<Self, WatermarkError> {
        let path = state_dir.join(WATERMARK_FILE);
        let marks = if path.exists() {
            serde_json::from_str(&std::fs::read_to_string(&path)?)?
        } else {
            HashMap::new()
        };
        Ok(Self { path, marks })
    }

    pub fn get(&self, account: &str) -> Option<i64> {
        self.marks.get(account).copied()
    }

    /// The watermark to poll from: persisted value, else the configured
    /// start timestamp. Neither existing is a configuration error: polling
    /// from epoch zero would re-ingest the whole mailbox.
    pub fn resolve(&self, account: &str, start_timestamp: Option<i64>) -> Result<i64, ConfigError> {
        self.get(account)
            .or(start_timestamp)
            .ok_or_else(|| ConfigError::MissingStartDate(account.to_string()))
    }

    /// Advance an account's watermark to `candidate` if it is newer.
    /// Never moves backwards.
    pub fn advance(&mut self, account: &str, candidate: i64) -> i64 {
        let mark = self.marks.entry(account.to_string()).or_insert(candidate);
        *mark = (*mark).max(candidate);
        *mark
    }

    pub fn persist(&self) -> Result<(), WatermarkError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&self.marks)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_is_monotonic() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = WatermarkStore::load(dir.path()).unwrap();

        assert_eq!(store.advance("personal", 100), 100);
        assert_eq!(store.advance("personal", 50), 100);
        assert_eq!(store.advance("personal", 200), 200);
        assert_eq!(store.get("personal"), Some(200));
    }

    #[test]
    fn test_accounts_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = WatermarkStore::load(dir.path()).unwrap();

        store.advance("personal", 100);
        assert_eq!(store.get("work"), None);
        store.advance("work", 40);
        assert_eq!(store.get("personal"), Some(100));
        assert_eq!(store.get("work"), Some(40));
    }

    #[test]
    fn test_persist_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut store = WatermarkStore::load(dir.path()).unwrap();
            store.advance("personal", 123);
            store.persist().unwrap();
        }
        let store = WatermarkStore::load(dir.path()).unwrap();
        assert_eq!(store.get("personal"), Some(123));
    }

    #[test]
    fn test_resolve_prefers_persisted_over_start() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = WatermarkStore::load(dir.path()).unwrap();
        assert_eq!(store.resolve("personal", Some(10)).unwrap(), 10);
        store.advance("personal", 99);
        assert_eq!(store.resolve("personal", Some(10)).unwrap(), 99);
    }

    #[test]
    fn test_resolve_without_start_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = WatermarkStore::load(dir.path()).unwrap();
        assert!(matches!(
            store.resolve("personal", None),
            Err(ConfigError::MissingStartDate(_))
        ));
    }
}
