//! Templated messages against profile pages.
//!
//! Two entry points share one send core: `send_if_connected` requires the
//! profile's connection status to read accepted/connected first, while
//! `send_unconditional` is for fresh outreach in the same page session.
//!
//! Quota discipline: check before the send, increment strictly after it
//! succeeded. A failed send costs nothing.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::behavior::{self, Pacing};
use crate::error::{Error, Result};
use crate::page::{require, PageDriver};
use crate::records::SentMessage;
use crate::store::DataStore;
use crate::templates;

pub const MESSAGE_ACTION: &str = "message";
pub const CONNECT_STATUS: &str = "#connect-status";
pub const MESSAGE_BOX: &str = "#message-box";
pub const SEND_BUTTON: &str = "#send-btn";

/// Ceiling on the rendered message body.
pub const MESSAGE_CHAR_LIMIT: usize = 500;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageConfig {
    pub daily_limit: u32,
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self { daily_limit: 5 }
    }
}

/// Send only when the connection has been accepted.
///
/// Reads the status display; unless it contains "accepted" or "connected"
/// (case-insensitive), fails with [`Error::NotConnectedYet`] without
/// touching quota.
pub async fn send_if_connected(
    page: &dyn PageDriver,
    store: &DataStore,
    pacing: &Pacing,
    profile_url: &str,
    template_body: &str,
    vars: &BTreeMap<String, String>,
    cfg: &MessageConfig,
) -> Result<()> {
    page.navigate(profile_url).await?;
    page.wait_load().await?;

    debug!(profile = profile_url, "reading profile for messaging");
    pacing.reading_pause().await;
    behavior::random_scroll(page).await;
    pacing.reading_pause().await;

    let status_el = require(page, CONNECT_STATUS).await?;
    let status = page.read_text(status_el).await?.to_lowercase();
    if !status.contains("accepted") && !status.contains("connected") {
        return Err(Error::NotConnectedYet);
    }

    send_core(page, store, pacing, profile_url, template_body, vars, cfg).await
}

/// Send without checking connection status.
pub async fn send_unconditional(
    page: &dyn PageDriver,
    store: &DataStore,
    pacing: &Pacing,
    profile_url: &str,
    template_body: &str,
    vars: &BTreeMap<String, String>,
    cfg: &MessageConfig,
) -> Result<()> {
    page.navigate(profile_url).await?;
    page.wait_load().await?;

    debug!(profile = profile_url, "preparing page for messaging");
    pacing.reading_pause().await;

    send_core(page, store, pacing, profile_url, template_body, vars, cfg).await
}

async fn send_core(
    page: &dyn PageDriver,
    store: &DataStore,
    pacing: &Pacing,
    profile_url: &str,
    template_body: &str,
    vars: &BTreeMap<String, String>,
    cfg: &MessageConfig,
) -> Result<()> {
    // Check only; the increment waits for a confirmed send.
    store.quotas.check(MESSAGE_ACTION, cfg.daily_limit)?;

    let body = templates::render(template_body, vars)?;
    let len = body.chars().count();
    if len > MESSAGE_CHAR_LIMIT {
        return Err(Error::MessageTooLong {
            len,
            max: MESSAGE_CHAR_LIMIT,
        });
    }

    let message_box = require(page, MESSAGE_BOX).await?;
    debug!(chars = len, "typing message");
    behavior::human_type(page, pacing, message_box, &body).await?;
    pacing.reading_pause().await;

    let send_btn = require(page, SEND_BUTTON).await?;
    page.click(send_btn).await?;

    if let Err(e) = store.quotas.increment(MESSAGE_ACTION) {
        warn!(error = %e, "quota increment failed after send");
    }

    info!(profile = profile_url, "message sent");
    pacing.reading_pause().await;

    if let Err(e) = store.sent_messages.append(&SentMessage {
        profile_url: profile_url.to_string(),
        message: body,
        timestamp: Utc::now(),
    }) {
        warn!(error = %e, "could not record sent message");
    }

    Ok(())
}
