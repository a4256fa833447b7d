//! Failure taxonomy shared across the automation core.
//!
//! Actions return these typed errors to their caller; the orchestrating flow
//! decides whether to skip, requeue, or abort. Only setup failures (cannot
//! open the initial page) should terminate a run.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// Daily quota gate tripped. Recoverable; skip and retry tomorrow.
    #[error("daily limit reached for {action} ({limit})")]
    LimitExceeded { action: String, limit: u32 },

    /// An expected page control is absent. Fatal to the current action.
    #[error("element not found: {0}")]
    ElementNotFound(String),

    /// Page failed to load or reach an expected state.
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// Bounded wait elapsed without the page reaching the expected state.
    #[error("timed out waiting for {0}")]
    Timeout(String),

    /// A `{{placeholder}}` in the template had no matching variable.
    #[error("unresolved template variable: {0}")]
    UnresolvedVariable(String),

    /// Connection-status gate unmet. Recoverable; the scheduler requeues.
    #[error("connection not accepted yet")]
    NotConnectedYet,

    /// Rendered message exceeds the site's character ceiling.
    #[error("message too long ({len} chars, max {max})")]
    MessageTooLong { len: usize, max: usize },

    /// File I/O or malformed persisted document.
    #[error("storage error at {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Underlying browser driver failure (CDP transport, script evaluation).
    #[error("page driver error: {0}")]
    Driver(String),

    /// Invalid or missing configuration.
    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    pub fn storage(
        path: impl Into<PathBuf>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Error::Storage {
            path: path.into(),
            source: Box::new(source),
        }
    }
}
