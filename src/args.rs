//! Command-line interface definitions.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

// Global flags shared across every subcommand.
#[derive(Debug, Clone, Args)]
pub struct CommonArgs {
    /// Path to a config.toml file
    #[arg(
        short = 'c',
        long,
        value_name = "PATH",
        env = "REACHBOT_CONFIG",
        global = true
    )]
    pub config: Option<PathBuf>,

    /// Data directory (default: ~/.reachbot/data)
    #[arg(long, value_name = "DIR", env = "REACHBOT_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Base URL of the mock site
    #[arg(long, value_name = "URL", env = "REACHBOT_SITE_URL", global = true)]
    pub site_url: Option<String>,

    /// Show the browser window instead of running headless
    #[arg(long, global = true)]
    pub headed: bool,
}

#[derive(Debug, Parser)]
#[command(
    name = "reachbot",
    about = "Rate-limited outreach automation against a mock professional-network site",
    version
)]
pub struct Cli {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Full flow: login, search, connect, outreach, reconcile pending
    Run {
        /// Search query for profile candidates
        #[arg(long, env = "SEARCH_QUERY", default_value = "")]
        query: String,

        /// Login email
        #[arg(long, env = "MOCK_EMAIL")]
        email: String,

        /// Login password
        #[arg(long, env = "MOCK_PASSWORD")]
        password: String,
    },

    /// Log in and persist the session cookie
    Login {
        #[arg(long, env = "MOCK_EMAIL")]
        email: String,

        #[arg(long, env = "MOCK_PASSWORD")]
        password: String,
    },

    /// Search profiles and print the first page of results
    Search {
        #[arg(default_value = "")]
        query: String,
    },

    /// Send a connect request to one profile
    Connect {
        profile_url: String,

        /// Personalized note to attach when the dialog supports one
        #[arg(long)]
        note: Option<String>,
    },

    /// Send a templated message to one profile if the connection is accepted
    Message {
        profile_url: String,

        /// Template id from the templates store
        #[arg(long, default_value = "welcome_1")]
        template: String,

        /// Template variables as KEY=VALUE, repeatable
        #[arg(long = "var", value_name = "KEY=VALUE")]
        vars: Vec<String>,
    },

    /// Run one reconciliation pass over the pending-message queue
    Pending,

    /// Like and comment on feed posts
    Posts {
        /// Feed page URL (defaults to the site's feed.html)
        #[arg(long)]
        url: Option<String>,
    },

    /// Show today's quota usage
    Quota,
}

/// Parse repeated `KEY=VALUE` arguments into a variable map.
pub fn parse_vars(pairs: &[String]) -> std::collections::BTreeMap<String, String> {
    pairs
        .iter()
        .filter_map(|pair| {
            pair.split_once('=')
                .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        })
        .collect()
}
