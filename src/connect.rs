//! Connection requests against profile pages.
//!
//! A successful connect appends one audit record and enqueues one follow-up
//! message for the scheduler. The quota gate charges up front
//! (`check_and_increment`), so a connect that later fails on a missing
//! button has still consumed one unit for the day.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::behavior::{self, Pacing};
use crate::error::Result;
use crate::page::{find_first, require, PageDriver};
use crate::pending::PendingMessage;
use crate::records::SentRequest;
use crate::store::DataStore;

pub const CONNECT_ACTION: &str = "connect";
pub const CONNECT_BUTTON: &str = "#connect-btn";
pub const NAME_DISPLAY: &str = "#name";

/// Template enqueued for every new connection.
pub const DEFAULT_TEMPLATE_ID: &str = "welcome_1";

/// Candidate selectors for the personalized-note input, tried in order.
pub const NOTE_INPUT_SELECTORS: &[&str] = &[
    "#note-input",
    "textarea[placeholder*='note']",
    "textarea[placeholder*='message']",
    ".connect-note-input",
    "#custom-message",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectConfig {
    pub daily_limit: u32,
    /// Optional note typed into the connect dialog when an input exists.
    pub personal_note: Option<String>,
    pub note_char_limit: usize,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            daily_limit: 5,
            personal_note: None,
            note_char_limit: 300,
        }
    }
}

/// Truncate a note to `limit` characters, marking the cut with an ellipsis.
fn truncate_note(note: &str, limit: usize) -> String {
    if note.chars().count() <= limit {
        return note.to_string();
    }
    let kept: String = note.chars().take(limit.saturating_sub(3)).collect();
    format!("{}...", kept)
}

/// Navigate to a profile and send a connect request.
///
/// Sequence: quota gate, navigate, locate the connect control, optional
/// personalized note, click, record, enqueue follow-up. Note-input absence
/// is non-fatal; a missing connect control is.
pub async fn send_connect_request(
    page: &dyn PageDriver,
    store: &DataStore,
    pacing: &Pacing,
    profile_url: &str,
    cfg: &ConnectConfig,
) -> Result<()> {
    store.quotas.check_and_increment(CONNECT_ACTION, cfg.daily_limit)?;

    page.navigate(profile_url).await?;
    page.wait_load().await?;

    debug!(profile = profile_url, "reading profile details");
    pacing.reading_pause().await;
    behavior::random_scroll(page).await;
    pacing.reading_pause().await;

    let connect_btn = require(page, CONNECT_BUTTON).await?;
    pacing.thinking_pause().await;

    if let Some(note) = &cfg.personal_note {
        let note = truncate_note(note, cfg.note_char_limit);
        match find_first(page, NOTE_INPUT_SELECTORS).await? {
            Some(input) => {
                debug!(chars = note.chars().count(), "adding personalized note");
                if let Err(e) = behavior::human_type(page, pacing, input, &note).await {
                    warn!(profile = profile_url, error = %e, "could not type note");
                }
                pacing.settle().await;
            }
            None => debug!("note input not found, sending without note"),
        }
    }

    page.click(connect_btn).await?;
    pacing.settle().await;

    info!(profile = profile_url, "connect request sent");
    pacing.reading_pause().await;

    if let Err(e) = store.sent_requests.append(&SentRequest {
        profile_url: profile_url.to_string(),
        timestamp: Utc::now(),
    }) {
        warn!(error = %e, "could not record sent request");
    }

    // Enqueue the follow-up with a best-effort first name for the template.
    let first_name = match page.find(NAME_DISPLAY).await? {
        Some(el) => page
            .read_text(el)
            .await
            .unwrap_or_default()
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_string(),
        None => String::new(),
    };

    let entry = PendingMessage {
        profile_url: profile_url.to_string(),
        template_id: DEFAULT_TEMPLATE_ID.to_string(),
        vars: BTreeMap::from([("first_name".to_string(), first_name)]),
        enqueued_at: Utc::now(),
    };
    if let Err(e) = store.pending.push(entry) {
        warn!(error = %e, "could not enqueue follow-up message");
    }

    Ok(())
}
