//! Reconciliation pass over the pending-message queue.
//!
//! Each pass attempts every queued entry once against current page state.
//! Entries that send are dropped; everything else survives in its original
//! position for a future pass. Individual failures never fail the pass,
//! only storage does. Entries are processed strictly sequentially: they
//! share one page session and one quota store.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use crate::behavior::{self, Pacing};
use crate::error::Result;
use crate::message::{self, MessageConfig};
use crate::page::PageDriver;
use crate::store::DataStore;
use crate::templates::find_template;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Pacing delay bounds between attempts, in milliseconds.
    pub delay_min_ms: u64,
    pub delay_max_ms: u64,
    pub message: MessageConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            delay_min_ms: 800,
            delay_max_ms: 1500,
            message: MessageConfig::default(),
        }
    }
}

/// Attempt every pending entry once and persist the survivors.
pub async fn process_pending(
    page: &dyn PageDriver,
    store: &DataStore,
    pacing: &Pacing,
    cfg: &SchedulerConfig,
) -> Result<()> {
    let templates = store.templates.load()?;
    let entries = store.pending.load()?;
    if entries.is_empty() {
        return Ok(());
    }
    info!(count = entries.len(), "processing pending messages");

    let mut remaining = Vec::with_capacity(entries.len());

    for entry in entries {
        let Some(template) = find_template(&templates, &entry.template_id) else {
            warn!(
                template = %entry.template_id,
                profile = %entry.profile_url,
                "template not found, keeping message queued"
            );
            remaining.push(entry);
            continue;
        };

        match message::send_if_connected(
            page,
            store,
            pacing,
            &entry.profile_url,
            &template.body,
            &entry.vars,
            &cfg.message,
        )
        .await
        {
            Ok(()) => info!(profile = %entry.profile_url, "pending message sent"),
            Err(e) => {
                warn!(profile = %entry.profile_url, error = %e, "pending message not sent");
                remaining.push(entry);
            }
        }

        behavior::sleep_range(
            Duration::from_millis(cfg.delay_min_ms),
            Duration::from_millis(cfg.delay_max_ms),
        )
        .await;
    }

    store.pending.save(&remaining)
}
