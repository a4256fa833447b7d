//! Profile search and result pagination on the mock search page.
//!
//! Collects profile cards per page, deduplicated case-insensitively by
//! name. Page numbers are parsed leniently from the pagination display:
//! anything non-numeric defaults to 1 rather than failing the search.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::behavior::{self, Pacing};
use crate::error::{Error, Result};
use crate::page::{require, PageDriver};

/// Selectors and location for the search page. Kept as configuration data
/// so a differently-built fixture only needs a config change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub page_url: String,
    pub search_input: String,
    pub search_button: String,
    pub profile_card: String,
    pub profile_link: String,
    pub profile_title: String,
    pub no_results: String,
    pub next_button: String,
    pub prev_button: String,
    pub current_page: String,
    pub total_pages: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            page_url: "file:///mock-site/search.html".to_string(),
            search_input: "#search-input".to_string(),
            search_button: "#search-btn".to_string(),
            profile_card: ".profile-card".to_string(),
            profile_link: "a".to_string(),
            profile_title: ".profile-title".to_string(),
            no_results: ".no-results".to_string(),
            next_button: "#next-btn".to_string(),
            prev_button: "#prev-btn".to_string(),
            current_page: "#current-page".to_string(),
            total_pages: "#total-pages".to_string(),
        }
    }
}

/// A profile found in search results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileResult {
    pub name: String,
    pub title: String,
    pub url: String,
}

/// One page of search results.
#[derive(Debug, Clone)]
pub struct SearchResults {
    pub profiles: Vec<ProfileResult>,
    pub current_page: u32,
    pub total_pages: u32,
}

/// Run a search and collect the first page of results.
pub async fn search_first_page(
    page: &dyn PageDriver,
    pacing: &Pacing,
    query: &str,
    cfg: &SearchConfig,
) -> Result<SearchResults> {
    info!(query, "starting search");
    page.navigate(&cfg.page_url).await?;
    page.wait_load().await?;

    pacing.reading_pause().await;
    behavior::random_scroll(page).await;
    pacing.reading_pause().await;

    let input = require(page, &cfg.search_input).await?;
    behavior::human_type(page, pacing, input, query).await?;
    pacing.thinking_pause().await;

    let button = require(page, &cfg.search_button).await?;
    page.click(button).await?;

    debug!("search submitted, waiting for results to render");
    wait_for_results(page, cfg).await?;
    pacing.reading_pause().await;

    let profiles = dedupe_profiles(collect_profiles(page, cfg).await?);
    let total_pages = read_page_number(page, &cfg.total_pages).await;
    info!(found = profiles.len(), total_pages, "search results collected");

    Ok(SearchResults {
        profiles,
        current_page: 1,
        total_pages,
    })
}

/// Advance to the next page of results.
pub async fn next_page(
    page: &dyn PageDriver,
    pacing: &Pacing,
    cfg: &SearchConfig,
) -> Result<SearchResults> {
    turn_page(page, pacing, cfg, &cfg.next_button, "already on last page").await
}

/// Go back to the previous page of results.
pub async fn prev_page(
    page: &dyn PageDriver,
    pacing: &Pacing,
    cfg: &SearchConfig,
) -> Result<SearchResults> {
    turn_page(page, pacing, cfg, &cfg.prev_button, "already on first page").await
}

async fn turn_page(
    page: &dyn PageDriver,
    pacing: &Pacing,
    cfg: &SearchConfig,
    button_selector: &str,
    edge_message: &str,
) -> Result<SearchResults> {
    pacing.thinking_pause().await;

    let button = require(page, button_selector).await?;
    if page.read_attribute(button, "disabled").await?.is_some() {
        return Err(Error::Navigation(edge_message.to_string()));
    }
    page.click(button).await?;

    pacing.reading_pause().await;
    behavior::random_scroll(page).await;
    pacing.reading_pause().await;

    let profiles = dedupe_profiles(collect_profiles(page, cfg).await?);
    let current_page = read_page_number(page, &cfg.current_page).await;
    let total_pages = read_page_number(page, &cfg.total_pages).await;
    info!(page = current_page, found = profiles.len(), "result page loaded");

    Ok(SearchResults {
        profiles,
        current_page,
        total_pages,
    })
}

/// Bounded poll for client-side rendering of result cards.
async fn wait_for_results(page: &dyn PageDriver, cfg: &SearchConfig) -> Result<()> {
    for _ in 0..10 {
        if !page.find_all(&cfg.profile_card).await?.is_empty() {
            return Ok(());
        }
        if page.find(&cfg.no_results).await?.is_some() {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(150)).await;
    }
    Ok(())
}

async fn collect_profiles(
    page: &dyn PageDriver,
    cfg: &SearchConfig,
) -> Result<Vec<ProfileResult>> {
    let cards = page.find_all(&cfg.profile_card).await?;
    let mut profiles = Vec::with_capacity(cards.len());

    for card in cards {
        let Some(link) = page.find_in(card, &cfg.profile_link).await? else {
            continue;
        };
        let name = match page.read_text(link).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                warn!(error = %e, "could not read profile name");
                continue;
            }
        };
        if name.is_empty() {
            continue;
        }

        let title = match page.find_in(card, &cfg.profile_title).await? {
            Some(el) => page.read_text(el).await.unwrap_or_default().trim().to_string(),
            None => String::new(),
        };
        let url = page.read_attribute(link, "href").await?.unwrap_or_default();

        profiles.push(ProfileResult { name, title, url });
    }

    Ok(profiles)
}

/// Parse a displayed page number; non-numeric or missing text means page 1.
async fn read_page_number(page: &dyn PageDriver, selector: &str) -> u32 {
    let Ok(Some(el)) = page.find(selector).await else {
        return 1;
    };
    let Ok(text) = page.read_text(el).await else {
        return 1;
    };
    match text.trim().parse::<u32>() {
        Ok(n) if n >= 1 => n,
        _ => 1,
    }
}

fn dedupe_profiles(profiles: Vec<ProfileResult>) -> Vec<ProfileResult> {
    let mut seen = HashSet::new();
    profiles
        .into_iter()
        .filter(|p| seen.insert(p.name.to_lowercase()))
        .collect()
}
