use anyhow::Result;
use clap::Parser;

use reachbot::args::{Cli, Command};
use reachbot::config::Config;
use reachbot::logging;

fn main() -> Result<()> {
    logging::init_from_env();
    let cli = Cli::parse();

    let mut config = Config::load(cli.common.config.clone())?;
    if let Some(data_dir) = &cli.common.data_dir {
        config.data_dir = data_dir.clone();
    }
    if let Some(site_url) = &cli.common.site_url {
        config.site_url = site_url.clone();
    }
    if cli.common.headed {
        config.headless = false;
    }

    match &cli.command {
        Command::Quota => show_quota(&config),
        command => drive(&config, command),
    }
}

fn show_quota(config: &Config) -> Result<()> {
    let store = reachbot::DataStore::open(&config.data_dir)?;
    let snapshot = store.quotas.snapshot()?;
    if snapshot.is_empty() {
        println!("no quota usage recorded");
        return Ok(());
    }
    for (action, quota) in snapshot {
        println!("{}: {} on {}", action, quota.count, quota.date);
    }
    Ok(())
}

#[cfg(not(feature = "browser"))]
fn drive(_config: &Config, _command: &Command) -> Result<()> {
    anyhow::bail!(
        "this command drives a browser and requires the 'browser' feature.\n\
         Build with: cargo build --features browser"
    )
}

#[cfg(feature = "browser")]
fn drive(config: &Config, command: &Command) -> Result<()> {
    tokio::runtime::Runtime::new()?.block_on(browser::dispatch(config, command))
}

#[cfg(feature = "browser")]
mod browser {
    use super::*;
    use anyhow::Context;
    use std::time::Duration;
    use tracing::{info, warn};

    use reachbot::args::parse_vars;
    use reachbot::behavior::Pacing;
    use reachbot::page::cdp::{BrowserOptions, CdpDriver};
    use reachbot::page::PageDriver;
    use reachbot::templates::find_template;
    use reachbot::{auth, connect, message, post, scheduler, search, DataStore};

    pub async fn dispatch(config: &Config, command: &Command) -> Result<()> {
        let store = DataStore::open(&config.data_dir)?;
        let pacing = Pacing::human();

        let driver = CdpDriver::launch(&BrowserOptions {
            headless: config.headless,
            nav_timeout: Duration::from_secs(config.nav_timeout_secs),
        })
        .await
        .context("could not launch browser")?;
        let page = driver.page();

        let outcome = match command {
            Command::Run {
                query,
                email,
                password,
            } => run_flow(page, &store, &pacing, config, query, email, password).await,
            Command::Login { email, password } => {
                login_flow(page, &store, &pacing, config, email, password).await
            }
            Command::Search { query } => search_flow(page, &pacing, config, query)
                .await
                .map(|results| print_results(&results)),
            Command::Connect { profile_url, note } => {
                let mut cfg = config.connect.clone();
                if note.is_some() {
                    cfg.personal_note = note.clone();
                }
                let url = config.absolute_url(profile_url);
                connect::send_connect_request(page, &store, &pacing, &url, &cfg)
                    .await
                    .map_err(Into::into)
            }
            Command::Message {
                profile_url,
                template,
                vars,
            } => message_flow(page, &store, &pacing, config, profile_url, template, vars).await,
            Command::Pending => {
                scheduler::process_pending(page, &store, &pacing, &config.scheduler)
                    .await
                    .map_err(Into::into)
            }
            Command::Posts { url } => posts_flow(page, &pacing, config, url.as_deref()).await,
            Command::Quota => unreachable!("handled without a browser"),
        };

        driver.close().await;
        outcome
    }

    async fn login_flow(
        page: &dyn PageDriver,
        store: &DataStore,
        pacing: &Pacing,
        config: &Config,
        email: &str,
        password: &str,
    ) -> Result<()> {
        let login_url = config.absolute_url("login.html");
        page.navigate(&login_url)
            .await
            .context("could not open login page")?;
        page.wait_load().await?;

        // Best-effort session restore before logging in fresh.
        let cookie_path = store.cookie_path();
        if cookie_path.exists() {
            if let Err(e) = auth::load_cookies(page, &cookie_path).await {
                warn!(error = %e, "could not restore session cookies");
            }
        }

        auth::login(page, pacing, email, password).await?;
        if let Err(e) = auth::save_cookies(page, &cookie_path).await {
            warn!(error = %e, "could not save session cookies");
        }
        Ok(())
    }

    async fn search_flow(
        page: &dyn PageDriver,
        pacing: &Pacing,
        config: &Config,
        query: &str,
    ) -> Result<search::SearchResults> {
        let mut cfg = config.search.clone();
        cfg.page_url = config.absolute_url("search.html");
        Ok(search::search_first_page(page, pacing, query, &cfg).await?)
    }

    async fn message_flow(
        page: &dyn PageDriver,
        store: &DataStore,
        pacing: &Pacing,
        config: &Config,
        profile_url: &str,
        template_id: &str,
        vars: &[String],
    ) -> Result<()> {
        let templates = store.templates.load()?;
        let template = find_template(&templates, template_id)
            .with_context(|| format!("template not found: {}", template_id))?;
        let url = config.absolute_url(profile_url);
        message::send_if_connected(
            page,
            store,
            pacing,
            &url,
            &template.body,
            &parse_vars(vars),
            &config.message,
        )
        .await
        .map_err(Into::into)
    }

    async fn posts_flow(
        page: &dyn PageDriver,
        pacing: &Pacing,
        config: &Config,
        url: Option<&str>,
    ) -> Result<()> {
        let feed_url = url
            .map(str::to_string)
            .unwrap_or_else(|| config.absolute_url("feed.html"));
        page.navigate(&feed_url).await?;
        page.wait_load().await?;
        post::interact_with_posts(page, pacing, config.max_posts)
            .await
            .map_err(Into::into)
    }

    fn print_results(results: &search::SearchResults) {
        println!(
            "page {} of {}: {} profiles",
            results.current_page,
            results.total_pages,
            results.profiles.len()
        );
        for (i, profile) in results.profiles.iter().enumerate() {
            println!("  {}. {} - {} ({})", i + 1, profile.name, profile.title, profile.url);
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_flow(
        page: &dyn PageDriver,
        store: &DataStore,
        pacing: &Pacing,
        config: &Config,
        query: &str,
        email: &str,
        password: &str,
    ) -> Result<()> {
        login_flow(page, store, pacing, config, email, password).await?;

        let results = search_flow(page, pacing, config, query).await?;
        print_results(&results);

        // Connect to every candidate, respecting the daily limit. Failures
        // are logged and the run moves on to the next profile.
        for profile in &results.profiles {
            if profile.url.is_empty() {
                warn!(name = %profile.name, "profile has no URL, skipping connect");
                continue;
            }
            let url = config.absolute_url(&profile.url);
            match connect::send_connect_request(page, store, pacing, &url, &config.connect).await {
                Ok(()) => info!(name = %profile.name, "connect sent"),
                Err(e) => warn!(name = %profile.name, error = %e, "connect skipped"),
            }
        }

        // Fresh outreach with the first available template, bounded per run.
        let templates = store.templates.load()?;
        if let Some(template) = templates.first() {
            let mut sent = 0usize;
            for profile in &results.profiles {
                if sent >= config.outreach_per_run {
                    break;
                }
                if profile.url.is_empty() {
                    continue;
                }
                let url = config.absolute_url(&profile.url);
                let first_name = profile
                    .name
                    .split_whitespace()
                    .next()
                    .unwrap_or_default()
                    .to_string();
                let vars = [
                    ("first_name".to_string(), first_name),
                    ("company".to_string(), String::new()),
                ]
                .into_iter()
                .collect();
                match message::send_if_connected(
                    page,
                    store,
                    pacing,
                    &url,
                    &template.body,
                    &vars,
                    &config.message,
                )
                .await
                {
                    Ok(()) => {
                        sent += 1;
                        info!(name = %profile.name, "message sent");
                    }
                    Err(e) => warn!(name = %profile.name, error = %e, "message skipped"),
                }
            }
        } else {
            warn!("no templates available, skipping fresh outreach");
        }

        // Reconcile previously queued follow-ups.
        if let Err(e) = scheduler::process_pending(page, store, pacing, &config.scheduler).await {
            warn!(error = %e, "scheduler pass failed");
        }

        // Walk one page forward to show pagination still works.
        if results.total_pages > 1 {
            let mut cfg = config.search.clone();
            cfg.page_url = config.absolute_url("search.html");
            match search::next_page(page, pacing, &cfg).await {
                Ok(next) => print_results(&next),
                Err(e) => warn!(error = %e, "could not navigate to next page"),
            }
        }

        info!("automation run complete");
        Ok(())
    }
}
