//! Daily action quotas persisted to a JSON file.
//!
//! One entry per action kind, each holding the calendar date it was counted
//! on. The reset is lazy: whenever the stored date is not today, the count is
//! treated as zero. Days are UTC-normalized.
//!
//! `REACHBOT_IGNORE_QUOTAS=1` turns every check into a no-op before any
//! storage I/O, for dev and test runs.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{Error, Result};

/// Environment flag that disables all quota gates.
pub const IGNORE_QUOTAS_ENV: &str = "REACHBOT_IGNORE_QUOTAS";

/// Date and count for one action kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionQuota {
    pub date: String,
    pub count: u32,
}

type Quotas = BTreeMap<String, ActionQuota>;

fn quotas_ignored() -> bool {
    std::env::var(IGNORE_QUOTAS_ENV).map(|v| v == "1").unwrap_or(false)
}

fn today() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

/// Per-action-kind daily counter backed by a single JSON file.
///
/// All read-modify-write cycles run under one mutex so concurrent in-process
/// callers cannot lose updates. A limit of 0 means unlimited.
pub struct QuotaTracker {
    path: PathBuf,
    lock: Mutex<()>,
}

impl QuotaTracker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Verify the action is under its daily limit without incrementing.
    pub fn check(&self, action: &str, limit: u32) -> Result<()> {
        if quotas_ignored() || limit == 0 {
            return Ok(());
        }
        let _guard = self.lock.lock().unwrap();
        let quotas = self.load()?;
        Self::check_loaded(&quotas, action, limit)
    }

    /// Count one completed action. Call only after the action succeeded.
    pub fn increment(&self, action: &str) -> Result<()> {
        if quotas_ignored() {
            return Ok(());
        }
        let _guard = self.lock.lock().unwrap();
        let mut quotas = self.load()?;
        let entry = Self::entry_for_today(&mut quotas, action);
        entry.count += 1;
        self.save(&quotas)
    }

    /// Check and increment under a single critical section.
    ///
    /// The historical gate discipline: the count is charged up front, before
    /// the gated action runs, so a later failure still consumes one unit.
    pub fn check_and_increment(&self, action: &str, limit: u32) -> Result<()> {
        if quotas_ignored() || limit == 0 {
            return Ok(());
        }
        let _guard = self.lock.lock().unwrap();
        let mut quotas = self.load()?;
        Self::check_loaded(&quotas, action, limit)?;
        let entry = Self::entry_for_today(&mut quotas, action);
        entry.count += 1;
        self.save(&quotas)
    }

    /// Current stored counters, for display.
    pub fn snapshot(&self) -> Result<BTreeMap<String, ActionQuota>> {
        let _guard = self.lock.lock().unwrap();
        self.load()
    }

    fn check_loaded(quotas: &Quotas, action: &str, limit: u32) -> Result<()> {
        match quotas.get(action) {
            Some(q) if q.date == today() && q.count >= limit => Err(Error::LimitExceeded {
                action: action.to_string(),
                limit,
            }),
            _ => Ok(()),
        }
    }

    fn entry_for_today<'a>(quotas: &'a mut Quotas, action: &str) -> &'a mut ActionQuota {
        let day = today();
        let entry = quotas.entry(action.to_string()).or_insert_with(|| ActionQuota {
            date: day.clone(),
            count: 0,
        });
        if entry.date != day {
            entry.date = day;
            entry.count = 0;
        }
        entry
    }

    fn load(&self) -> Result<Quotas> {
        if !self.path.exists() {
            return Ok(Quotas::new());
        }
        let content =
            fs::read_to_string(&self.path).map_err(|e| Error::storage(&self.path, e))?;
        serde_json::from_str(&content).map_err(|e| Error::storage(&self.path, e))
    }

    fn save(&self, quotas: &Quotas) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::storage(&self.path, e))?;
        }
        let content =
            serde_json::to_string_pretty(quotas).map_err(|e| Error::storage(&self.path, e))?;
        fs::write(&self.path, content).map_err(|e| Error::storage(&self.path, e))
    }
}
