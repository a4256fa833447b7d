//! Login flow, security-checkpoint detection, and cookie persistence.
//!
//! The caller navigates to the login page first. Login types credentials,
//! submits, then polls (bounded) for either a success status message or a
//! redirect away from the login page. On the mock site security checkpoints
//! are only warned about, never fatal.

use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::behavior::{self, Pacing};
use crate::error::{Error, Result};
use crate::page::{find_first, require, PageDriver};

pub const EMAIL_INPUT: &str = "#email";
pub const PASSWORD_INPUT: &str = "#password";
pub const LOGIN_BUTTON: &str = "#login-btn";
pub const STATUS_DISPLAY: &str = "#status";

/// Candidate selectors for a 2FA challenge, tried in order.
pub const TWO_FACTOR_SELECTORS: &[&str] =
    &["#two-factor-input", "#verification-code", ".two-factor"];

/// Candidate selectors for a CAPTCHA widget, tried in order.
pub const CAPTCHA_SELECTORS: &[&str] = &[
    "#captcha",
    ".g-recaptcha",
    ".captcha-container",
    "[data-callback]",
];

/// Phrases in page text that indicate a security challenge.
const CHALLENGE_PHRASES: &[&str] = &[
    "verify your identity",
    "security challenge",
    "verify it's you",
];

const LOGIN_POLL_ATTEMPTS: u32 = 40;
const LOGIN_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Log in with the given credentials and wait for the site to accept them.
pub async fn login(
    page: &dyn PageDriver,
    pacing: &Pacing,
    email: &str,
    password: &str,
) -> Result<()> {
    if email.is_empty() || password.is_empty() {
        return Err(Error::Config(
            "email and password must be provided".to_string(),
        ));
    }

    debug!("entering credentials");
    let email_el = require(page, EMAIL_INPUT).await?;
    behavior::human_type(page, pacing, email_el, email).await?;
    behavior::sleep_range(Duration::from_millis(150), Duration::from_millis(350)).await;

    let password_el = require(page, PASSWORD_INPUT).await?;
    behavior::human_type(page, pacing, password_el, password).await?;

    debug!("submitting login form");
    let button = require(page, LOGIN_BUTTON).await?;
    page.click(button).await?;

    for _ in 0..LOGIN_POLL_ATTEMPTS {
        if let Some(reason) = detect_security_checkpoints(page).await? {
            warn!(%reason, "security checkpoint detected, continuing on mock site");
        }

        if let Some(status_el) = page.find(STATUS_DISPLAY).await? {
            let status = page.read_text(status_el).await?.to_lowercase();
            if status.contains("success") {
                info!("login successful");
                pacing.settle().await;
                return Ok(());
            }
        }

        let href = current_href(page).await;
        if !href.is_empty() && !href.contains("login") {
            info!(url = %href, "redirect detected, login complete");
            return Ok(());
        }

        tokio::time::sleep(LOGIN_POLL_INTERVAL).await;
    }

    // Final check before giving up.
    let href = current_href(page).await;
    if !href.is_empty() && !href.contains("login") {
        return Ok(());
    }
    Err(Error::Timeout("login response".to_string()))
}

async fn current_href(page: &dyn PageDriver) -> String {
    page.evaluate("location.href")
        .await
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

/// Look for 2FA, CAPTCHA, or challenge text. Returns the reason if found.
pub async fn detect_security_checkpoints(page: &dyn PageDriver) -> Result<Option<String>> {
    if find_first(page, TWO_FACTOR_SELECTORS).await?.is_some() {
        return Ok(Some("2FA challenge present".to_string()));
    }
    if find_first(page, CAPTCHA_SELECTORS).await?.is_some() {
        return Ok(Some("CAPTCHA present".to_string()));
    }

    let body = page
        .evaluate("document.body.innerText")
        .await
        .ok()
        .and_then(|v| v.as_str().map(|s| s.to_lowercase()))
        .unwrap_or_default();
    for phrase in CHALLENGE_PHRASES {
        if body.contains(phrase) {
            return Ok(Some(format!("challenge text: {}", phrase)));
        }
    }
    Ok(None)
}

/// Persist `document.cookie` to a local file.
pub async fn save_cookies(page: &dyn PageDriver, path: &Path) -> Result<()> {
    let cookies = page
        .evaluate("document.cookie")
        .await?
        .as_str()
        .unwrap_or_default()
        .to_string();
    std::fs::write(path, &cookies).map_err(|e| Error::storage(path, e))?;
    debug!(path = %path.display(), "saved session cookies");
    Ok(())
}

/// Restore cookie entries from a file onto the current page.
///
/// Domains are not validated; navigate to the right origin first.
pub async fn load_cookies(page: &dyn PageDriver, path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::storage(path, e))?;
    let content = content.trim();
    if content.is_empty() {
        return Ok(());
    }
    for part in content.split("; ") {
        let script = format!("document.cookie = \"{}; path=/\";", part);
        if let Err(e) = page.evaluate(&script).await {
            warn!(error = %e, "could not restore cookie entry");
        }
    }
    debug!(path = %path.display(), "restored session cookies");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::fake::FakePage;
    use serde_json::json;
    use tempfile::TempDir;

    const LOGIN_URL: &str = "mock://site/login.html";
    const SEARCH_URL: &str = "mock://site/search.html";

    fn login_page() -> (FakePage, usize) {
        let page = FakePage::new();
        page.node(LOGIN_URL, EMAIL_INPUT, "");
        page.node(LOGIN_URL, PASSWORD_INPUT, "");
        let button = page.node(LOGIN_URL, LOGIN_BUTTON, "Log in");
        (page, button)
    }

    #[tokio::test]
    async fn test_login_succeeds_on_redirect() {
        let (page, button) = login_page();
        page.navigate_on_click(LOGIN_URL, button, SEARCH_URL);
        page.navigate(LOGIN_URL).await.unwrap();

        login(&page, &Pacing::none(), "a@example.com", "hunter2")
            .await
            .unwrap();

        let typed = page.typed();
        assert_eq!(typed.len(), 2);
        assert_eq!(typed[0].2, "a@example.com");
        assert_eq!(typed[1].2, "hunter2");
    }

    #[tokio::test]
    async fn test_login_succeeds_on_status_text() {
        let (page, _) = login_page();
        page.node(LOGIN_URL, STATUS_DISPLAY, "Login successful");
        page.navigate(LOGIN_URL).await.unwrap();

        login(&page, &Pacing::none(), "a@example.com", "hunter2")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_login_rejects_empty_credentials() {
        let (page, _) = login_page();
        page.navigate(LOGIN_URL).await.unwrap();
        let err = login(&page, &Pacing::none(), "", "pw").await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_checkpoint_detection_by_selector() {
        let page = FakePage::new();
        page.node("mock://p", "#captcha", "");
        page.navigate("mock://p").await.unwrap();

        let reason = detect_security_checkpoints(&page).await.unwrap();
        assert_eq!(reason.as_deref(), Some("CAPTCHA present"));
    }

    #[tokio::test]
    async fn test_checkpoint_detection_by_body_text() {
        let page = FakePage::new();
        page.add_doc("mock://p");
        page.stub_eval(
            "document.body.innerText",
            json!("Please verify your identity to continue"),
        );
        page.navigate("mock://p").await.unwrap();

        let reason = detect_security_checkpoints(&page).await.unwrap();
        assert!(reason.unwrap().contains("verify your identity"));
    }

    #[tokio::test]
    async fn test_cookie_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.cookie");

        let page = FakePage::new();
        page.add_doc("mock://p");
        page.navigate("mock://p").await.unwrap();
        page.set_cookies("session=abc123; theme=dark");

        save_cookies(&page, &path).await.unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "session=abc123; theme=dark"
        );

        let fresh = FakePage::new();
        fresh.add_doc("mock://p");
        fresh.navigate("mock://p").await.unwrap();
        load_cookies(&fresh, &path).await.unwrap();
        assert_eq!(fresh.cookies(), "session=abc123; theme=dark");
    }
}
