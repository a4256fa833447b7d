//! Process-wide data store rooted at a single directory.
//!
//! Every persistent concern (quotas, pending queue, templates, audit logs,
//! session cookie) lives under one data directory with a fixed layout.
//! The store is opened once at process start and passed to the actions and
//! scheduler explicitly; there are no ambient singletons.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::pending::PendingStore;
use crate::ratelimit::QuotaTracker;
use crate::records::{AuditLog, SentMessage, SentRequest};
use crate::templates::TemplateStore;

pub const QUOTAS_FILE: &str = "quotas.json";
pub const PENDING_FILE: &str = "pending_messages.json";
pub const TEMPLATES_FILE: &str = "templates.json";
pub const SENT_REQUESTS_FILE: &str = "sent_requests.jsonl";
pub const SENT_MESSAGES_FILE: &str = "sent_messages.jsonl";
pub const COOKIE_FILE: &str = "session.cookie";

/// All file-backed state, rooted at one directory.
pub struct DataStore {
    data_dir: PathBuf,
    pub quotas: QuotaTracker,
    pub pending: PendingStore,
    pub templates: TemplateStore,
    pub sent_requests: AuditLog<SentRequest>,
    pub sent_messages: AuditLog<SentMessage>,
}

impl DataStore {
    /// Open the store, creating the data directory if needed.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir).map_err(|e| Error::storage(&data_dir, e))?;
        Ok(Self {
            quotas: QuotaTracker::new(data_dir.join(QUOTAS_FILE)),
            pending: PendingStore::new(data_dir.join(PENDING_FILE)),
            templates: TemplateStore::new(data_dir.join(TEMPLATES_FILE)),
            sent_requests: AuditLog::new(data_dir.join(SENT_REQUESTS_FILE)),
            sent_messages: AuditLog::new(data_dir.join(SENT_MESSAGES_FILE)),
            data_dir,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn cookie_path(&self) -> PathBuf {
        self.data_dir.join(COOKIE_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_creates_data_dir() {
        let dir = TempDir::new().unwrap();
        let data_dir = dir.path().join("state/data");
        let store = DataStore::open(&data_dir).unwrap();

        assert!(data_dir.is_dir());
        assert_eq!(store.quotas.path(), data_dir.join(QUOTAS_FILE));
        assert_eq!(store.pending.path(), data_dir.join(PENDING_FILE));
        assert_eq!(store.cookie_path(), data_dir.join(COOKIE_FILE));
    }
}
