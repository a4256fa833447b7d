//! End-to-end pipeline over the fake page driver: search feeds connects,
//! connects enqueue follow-ups, the scheduler drains the queue against
//! current page state.

use std::fs;

use reachbot::behavior::Pacing;
use reachbot::connect::{self, ConnectConfig};
use reachbot::message::{CONNECT_STATUS, MESSAGE_BOX, SEND_BUTTON};
use reachbot::page::fake::FakePage;
use reachbot::scheduler::{self, SchedulerConfig};
use reachbot::search::{self, SearchConfig};
use reachbot::store::DataStore;
use tempfile::TempDir;

const SEARCH_URL: &str = "mock://site/search.html";

fn no_delay_scheduler() -> SchedulerConfig {
    SchedulerConfig {
        delay_min_ms: 0,
        delay_max_ms: 0,
        ..SchedulerConfig::default()
    }
}

fn search_cfg() -> SearchConfig {
    SearchConfig {
        page_url: SEARCH_URL.to_string(),
        ..SearchConfig::default()
    }
}

/// Build the search page plus one profile page per candidate.
fn build_site(page: &FakePage, profiles: &[(&str, &str, &str)]) {
    page.node(SEARCH_URL, "#search-input", "");
    page.node(SEARCH_URL, "#search-btn", "Search");
    page.node(SEARCH_URL, "#total-pages", "1");

    for (name, title, url) in profiles {
        let card = page.node(SEARCH_URL, ".profile-card", "");
        let link = page.child(SEARCH_URL, card, "a", name);
        page.attr(SEARCH_URL, link, "href", url);
        page.child(SEARCH_URL, card, ".profile-title", title);

        page.node(url, "#name", name);
        page.node(url, "#connect-btn", "Connect");
        page.node(url, CONNECT_STATUS, "Pending");
        page.node(url, MESSAGE_BOX, "");
        page.node(url, SEND_BUTTON, "Send");
    }
}

fn set_status(page: &FakePage, url: &str, status: &str) {
    // The status display is the third node added to each profile page.
    page.set_text(url, 2, status);
}

fn write_templates(store: &DataStore) {
    fs::write(
        store.templates.path(),
        r#"[{"id": "welcome_1", "name": "Welcome", "body": "Hi {{first_name}}, thanks for connecting!", "daily_limit": 5}]"#,
    )
    .unwrap();
}

#[tokio::test]
async fn search_connect_then_reconcile() {
    let dir = TempDir::new().unwrap();
    let store = DataStore::open(dir.path()).unwrap();
    write_templates(&store);

    let page = FakePage::new();
    build_site(
        &page,
        &[
            ("Ada Lovelace", "Engineer", "mock://site/profile1.html"),
            ("Grace Hopper", "Admiral", "mock://site/profile2.html"),
        ],
    );
    let pacing = Pacing::none();

    // Search produces both candidates.
    let results = search::search_first_page(&page, &pacing, "engineer", &search_cfg())
        .await
        .unwrap();
    assert_eq!(results.profiles.len(), 2);

    // Connect to every candidate; each enqueues one follow-up.
    for profile in &results.profiles {
        connect::send_connect_request(&page, &store, &pacing, &profile.url, &ConnectConfig::default())
            .await
            .unwrap();
    }
    assert_eq!(store.sent_requests.read_all().unwrap().len(), 2);
    let pending = store.pending.load().unwrap();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].vars["first_name"], "Ada");

    // First pass: nobody has accepted yet, everything stays queued.
    scheduler::process_pending(&page, &store, &pacing, &no_delay_scheduler())
        .await
        .unwrap();
    assert_eq!(store.pending.load().unwrap().len(), 2);
    assert!(store.sent_messages.read_all().unwrap().is_empty());

    // Ada accepts; the next pass sends her follow-up and keeps Grace queued.
    set_status(&page, "mock://site/profile1.html", "Request Accepted");
    scheduler::process_pending(&page, &store, &pacing, &no_delay_scheduler())
        .await
        .unwrap();

    let remaining = store.pending.load().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].profile_url, "mock://site/profile2.html");

    let sent = store.sent_messages.read_all().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].profile_url, "mock://site/profile1.html");
    assert_eq!(sent[0].message, "Hi Ada, thanks for connecting!");

    // Quota reflects one connect per candidate and one sent message.
    let quotas = store.quotas.snapshot().unwrap();
    assert_eq!(quotas["connect"].count, 2);
    assert_eq!(quotas["message"].count, 1);
}

#[tokio::test]
async fn reconciliation_preserves_order_of_survivors() {
    let dir = TempDir::new().unwrap();
    let store = DataStore::open(dir.path()).unwrap();
    write_templates(&store);

    let page = FakePage::new();
    build_site(
        &page,
        &[
            ("One", "t", "mock://site/p1.html"),
            ("Two", "t", "mock://site/p2.html"),
            ("Three", "t", "mock://site/p3.html"),
        ],
    );
    for url in ["mock://site/p1.html", "mock://site/p2.html", "mock://site/p3.html"] {
        set_status(&page, url, "Connected");
    }

    let pacing = Pacing::none();
    for url in ["mock://site/p1.html", "mock://site/p2.html", "mock://site/p3.html"] {
        connect::send_connect_request(&page, &store, &pacing, url, &ConnectConfig::default())
            .await
            .unwrap();
    }

    // Break entry 2 by pointing it at a template that does not exist.
    let mut pending = store.pending.load().unwrap();
    pending[1].template_id = "missing_template".to_string();
    store.pending.save(&pending).unwrap();

    scheduler::process_pending(&page, &store, &pacing, &no_delay_scheduler())
        .await
        .unwrap();

    let remaining = store.pending.load().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].profile_url, "mock://site/p2.html");
    assert_eq!(store.sent_messages.read_all().unwrap().len(), 2);
}

#[tokio::test]
async fn daily_connect_limit_bounds_a_run() {
    let dir = TempDir::new().unwrap();
    let store = DataStore::open(dir.path()).unwrap();

    let page = FakePage::new();
    build_site(
        &page,
        &[
            ("One", "t", "mock://site/p1.html"),
            ("Two", "t", "mock://site/p2.html"),
            ("Three", "t", "mock://site/p3.html"),
        ],
    );

    let pacing = Pacing::none();
    let cfg = ConnectConfig {
        daily_limit: 2,
        ..ConnectConfig::default()
    };

    let mut sent = 0;
    let mut skipped = 0;
    for url in ["mock://site/p1.html", "mock://site/p2.html", "mock://site/p3.html"] {
        match connect::send_connect_request(&page, &store, &pacing, url, &cfg).await {
            Ok(()) => sent += 1,
            Err(reachbot::Error::LimitExceeded { .. }) => skipped += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(sent, 2);
    assert_eq!(skipped, 1);
    assert_eq!(store.sent_requests.read_all().unwrap().len(), 2);
    assert_eq!(store.pending.load().unwrap().len(), 2);
}
