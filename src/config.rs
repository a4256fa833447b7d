//! Configuration loading and saving.
//!
//! TOML file with serde defaults, so a partial config works. Default
//! location is `~/.reachbot/config.toml`; state lives under
//! `~/.reachbot/data` unless overridden.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::connect::ConnectConfig;
use crate::message::MessageConfig;
use crate::scheduler::SchedulerConfig;
use crate::search::SearchConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the mock site, used to absolutize relative profile links.
    pub site_url: String,
    /// Directory holding quotas, queues, logs, and the session cookie.
    pub data_dir: PathBuf,
    /// Run the browser without a visible window.
    pub headless: bool,
    /// Navigation wait ceiling in seconds.
    pub nav_timeout_secs: u64,
    /// Messages sent as fresh outreach per run (separate from the scheduler).
    pub outreach_per_run: usize,
    /// Feed posts to interact with per `posts` run.
    pub max_posts: usize,
    pub connect: ConnectConfig,
    pub message: MessageConfig,
    pub scheduler: SchedulerConfig,
    pub search: SearchConfig,
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            site_url: "file:///mock-site/".to_string(),
            data_dir: home.join(".reachbot").join("data"),
            headless: true,
            nav_timeout_secs: 10,
            outreach_per_run: 3,
            max_posts: 3,
            connect: ConnectConfig::default(),
            message: MessageConfig::default(),
            scheduler: SchedulerConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

impl Config {
    fn default_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".reachbot").join("config.toml")
    }

    /// Load configuration, falling back to defaults when the file is absent.
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = path.unwrap_or_else(Self::default_path);
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save configuration, creating parent directories.
    pub fn save(&self, path: Option<PathBuf>) -> Result<()> {
        let config_path = path.unwrap_or_else(Self::default_path);
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    /// Resolve a possibly-relative profile href against the site base URL.
    pub fn absolute_url(&self, href: &str) -> String {
        if href.starts_with("http") || href.starts_with("file://") || href.starts_with("mock://") {
            return href.to_string();
        }
        match url::Url::parse(&self.site_url).and_then(|base| base.join(href)) {
            Ok(joined) => joined.to_string(),
            Err(_) => format!("{}{}", self.site_url, href),
        }
    }
}
