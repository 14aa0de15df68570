//! CLI commands for frontpush.

pub mod changes;
pub mod preview;
pub mod send;

use std::path::PathBuf;

use clap::builder::FalseyValueParser;
use clap::{ArgAction, Args, Parser, Subcommand};

use crate::config::{Config, Credentials, RevisionRange, SiteUrl};
use crate::error::Error;

/// frontpush - push notifications for changed content files
#[derive(Parser, Debug)]
#[command(name = "frontpush")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub args: RunArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Send notifications for files changed between two commits (default)
    Send,

    /// List changed content files without sending anything
    Changes,

    /// Show what files would send, without git or network access
    Preview {
        /// Content files, relative to the repository root
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

/// Settings shared by every command. Each one can come from the
/// environment, which is how CI passes them.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Repository working tree
    #[arg(long, global = true, env = "FRONTPUSH_REPO", default_value = ".")]
    pub repo: PathBuf,

    /// TOML file with delivery and target settings
    #[arg(long, global = true, env = "FRONTPUSH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Public site URL that relative links are resolved against
    #[arg(long, global = true, env = "SITE_URL")]
    pub site_url: Option<String>,

    /// Webpushr API key
    #[arg(long, global = true, env = "WEBPUSHR_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Webpushr auth token
    #[arg(long, global = true, env = "WEBPUSHR_AUTH", hide_env_values = true)]
    pub auth_token: Option<String>,

    /// Previous commit (empty or all zeros when there is none)
    #[arg(long, global = true, env = "BEFORE_COMMIT")]
    pub before: Option<String>,

    /// Commit to inspect
    #[arg(long, global = true, env = "AFTER_COMMIT")]
    pub after: Option<String>,

    /// Fallback for --after
    #[arg(long, global = true, env = "GITHUB_SHA", hide = true)]
    pub github_sha: Option<String>,

    /// Log requests instead of sending them
    #[arg(
        long,
        global = true,
        env = "DRY_RUN",
        action = ArgAction::SetTrue,
        value_parser = FalseyValueParser::new()
    )]
    pub dry_run: bool,
}

impl RunArgs {
    pub fn load_config(&self) -> Result<Config, Error> {
        Config::load(self.config.as_deref())
    }

    pub fn site(&self) -> Result<SiteUrl, Error> {
        SiteUrl::parse(self.site_url.as_deref().unwrap_or_default())
    }

    pub fn credentials(&self) -> Result<Credentials, Error> {
        Credentials::new(self.api_key.as_deref(), self.auth_token.as_deref())
    }

    pub fn revisions(&self) -> Result<RevisionRange, Error> {
        RevisionRange::new(
            self.before.as_deref(),
            self.after.as_deref(),
            self.github_sha.as_deref(),
        )
    }
}
