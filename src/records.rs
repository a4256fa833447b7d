//! Append-only audit logs for outbound actions.
//!
//! One JSON record per line. Records are never mutated or pruned; the logs
//! exist purely as history. Same-day counting lives in the quota tracker,
//! not here.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// A sent connection request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentRequest {
    pub profile_url: String,
    pub timestamp: DateTime<Utc>,
}

/// A sent follow-up or outreach message, with the rendered body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentMessage {
    pub profile_url: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// JSON-lines log of records of type `T`.
pub struct AuditLog<T> {
    path: PathBuf,
    _record: PhantomData<T>,
}

impl<T: Serialize + DeserializeOwned> AuditLog<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _record: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record, creating parent directories on first write.
    pub fn append(&self, record: &T) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::storage(&self.path, e))?;
        }
        let line = serde_json::to_string(record).map_err(|e| Error::storage(&self.path, e))?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| Error::storage(&self.path, e))?;
        writeln!(file, "{}", line).map_err(|e| Error::storage(&self.path, e))
    }

    /// Read all records in append order. Unparseable lines are skipped.
    pub fn read_all(&self) -> Result<Vec<T>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content =
            fs::read_to_string(&self.path).map_err(|e| Error::storage(&self.path, e))?;
        Ok(content
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_append_and_read_in_order() {
        let dir = TempDir::new().unwrap();
        let log: AuditLog<SentRequest> = AuditLog::new(dir.path().join("sent_requests.jsonl"));

        for i in 0..3 {
            log.append(&SentRequest {
                profile_url: format!("mock://p/{}", i),
                timestamp: Utc::now(),
            })
            .unwrap();
        }

        let records = log.read_all().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[2].profile_url, "mock://p/2");
    }

    #[test]
    fn test_read_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let log: AuditLog<SentMessage> = AuditLog::new(dir.path().join("sent_messages.jsonl"));
        assert!(log.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_bad_lines_are_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sent_messages.jsonl");
        let log: AuditLog<SentMessage> = AuditLog::new(&path);

        log.append(&SentMessage {
            profile_url: "mock://p/1".to_string(),
            message: "hi".to_string(),
            timestamp: Utc::now(),
        })
        .unwrap();
        let mut content = fs::read_to_string(&path).unwrap();
        content.push_str("not json\n");
        fs::write(&path, content).unwrap();

        assert_eq!(log.read_all().unwrap().len(), 1);
    }
}
