//! Durable queue of deferred follow-up messages.
//!
//! Entries are created when a connect request goes out and consumed by the
//! scheduler once the connection is accepted. The file is a pretty-printed
//! JSON array replaced wholesale on save; a single scheduler instance is the
//! only writer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// A queued follow-up message awaiting connection acceptance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingMessage {
    pub profile_url: String,
    pub template_id: String,
    pub vars: BTreeMap<String, String>,
    pub enqueued_at: DateTime<Utc>,
}

/// Whole-file JSON store for the pending queue.
pub struct PendingStore {
    path: PathBuf,
}

impl PendingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the queue in stored order. An absent file is an empty queue;
    /// malformed content is an error, never silently replaced.
    pub fn load(&self) -> Result<Vec<PendingMessage>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content =
            fs::read_to_string(&self.path).map_err(|e| Error::storage(&self.path, e))?;
        serde_json::from_str(&content).map_err(|e| Error::storage(&self.path, e))
    }

    /// Replace the stored queue with `entries`, creating parent directories.
    pub fn save(&self, entries: &[PendingMessage]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::storage(&self.path, e))?;
        }
        let content =
            serde_json::to_string_pretty(entries).map_err(|e| Error::storage(&self.path, e))?;
        fs::write(&self.path, content).map_err(|e| Error::storage(&self.path, e))
    }

    /// Append one entry. Duplicate profile URLs are preserved independently.
    pub fn push(&self, entry: PendingMessage) -> Result<()> {
        let mut entries = self.load()?;
        entries.push(entry);
        self.save(&entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(url: &str) -> PendingMessage {
        PendingMessage {
            profile_url: url.to_string(),
            template_id: "welcome_1".to_string(),
            vars: BTreeMap::from([("first_name".to_string(), "Ada".to_string())]),
            enqueued_at: Utc::now(),
        }
    }

    #[test]
    fn test_absent_file_is_empty_queue() {
        let dir = TempDir::new().unwrap();
        let store = PendingStore::new(dir.path().join("pending.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_push_preserves_order_and_duplicates() {
        let dir = TempDir::new().unwrap();
        let store = PendingStore::new(dir.path().join("pending.json"));

        store.push(entry("mock://p/1")).unwrap();
        store.push(entry("mock://p/2")).unwrap();
        store.push(entry("mock://p/1")).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded[0].profile_url, "mock://p/1");
        assert_eq!(loaded[1].profile_url, "mock://p/2");
        assert_eq!(loaded[2].profile_url, "mock://p/1");
    }

    #[test]
    fn test_save_load_round_trips_file_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pending.json");
        let store = PendingStore::new(&path);

        store.save(&[entry("mock://p/1"), entry("mock://p/2")]).unwrap();
        let before = fs::read_to_string(&path).unwrap();

        let loaded = store.load().unwrap();
        store.save(&loaded).unwrap();
        let after = fs::read_to_string(&path).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_malformed_content_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pending.json");
        fs::write(&path, "[{\"profile_url\": 42}]").unwrap();

        let store = PendingStore::new(&path);
        assert!(matches!(store.load(), Err(Error::Storage { .. })));
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/data/pending.json");
        let store = PendingStore::new(&path);
        store.save(&[entry("mock://p/1")]).unwrap();
        assert_eq!(store.load().unwrap().len(), 1);
    }
}
