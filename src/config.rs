//! Configuration for frontpush.
//!
//! Two layers: an optional TOML file with delivery tuning and URL
//! conventions, and the per-run values (credentials, site, revisions)
//! that arrive through the command line or the CI environment.

use std::path::Path;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::content::Category;
use crate::error::Error;

/// File-based configuration. Every field has a default, so an absent
/// file and an empty file behave the same.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Title used when a file has no `title` field.
    #[serde(default = "default_title")]
    pub default_title: String,

    #[serde(default)]
    pub delivery: DeliveryConfig,

    #[serde(default)]
    pub targets: TargetsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_title: default_title(),
            delivery: DeliveryConfig::default(),
            targets: TargetsConfig::default(),
        }
    }
}

/// Webpushr endpoint and retry tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Base URL the `/notification/send/*` paths are appended to.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Attempts per call, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry; doubles on each further retry.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Pause between successive per-subscriber sends.
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            pacing_ms: default_pacing_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl DeliveryConfig {
    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// URL templates per content category. `{slug}` is replaced with the
/// slugified identifier of the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetsConfig {
    #[serde(default = "default_notification_target")]
    pub notification: String,

    #[serde(default = "default_news_target")]
    pub news: String,

    #[serde(default = "default_places_target")]
    pub places: String,
}

impl Default for TargetsConfig {
    fn default() -> Self {
        Self {
            notification: default_notification_target(),
            news: default_news_target(),
            places: default_places_target(),
        }
    }
}

impl TargetsConfig {
    /// Template for a category. Uncategorized files link to the site root.
    pub fn template_for(&self, category: Category) -> &str {
        match category {
            Category::Notification => &self.notification,
            Category::News => &self.news,
            Category::Places => &self.places,
            Category::Other => "/",
        }
    }
}

fn default_title() -> String {
    "New update".to_string()
}

fn default_api_base() -> String {
    "https://api.webpushr.com/v1".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    1000
}

fn default_pacing_ms() -> u64 {
    500
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_notification_target() -> String {
    "/".to_string()
}

fn default_news_target() -> String {
    "/news/#news-{slug}/".to_string()
}

fn default_places_target() -> String {
    "/places/#/places/{slug}".to_string()
}

impl Config {
    /// Load config from a TOML file, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), Error> {
        if self.delivery.max_attempts == 0 {
            return Err(Error::invalid(
                "delivery.max_attempts",
                "must be at least 1",
            ));
        }
        if !has_http_scheme(&self.delivery.api_base) {
            return Err(Error::invalid(
                "delivery.api_base",
                format!("'{}' is not an http(s) URL", self.delivery.api_base),
            ));
        }
        Ok(())
    }
}

/// Absolute site base URL, stored without a trailing slash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteUrl(String);

impl SiteUrl {
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let trimmed = raw.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(Error::MissingSetting {
                name: "site URL",
                env: "SITE_URL",
                flag: "site-url",
            });
        }
        if !has_http_scheme(trimmed) {
            return Err(Error::invalid(
                "site URL",
                format!("'{}' must start with http:// or https://", trimmed),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SiteUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Webpushr API credentials.
#[derive(Debug)]
pub struct Credentials {
    pub api_key: SecretString,
    pub auth_token: SecretString,
}

impl Credentials {
    pub fn new(api_key: Option<&str>, auth_token: Option<&str>) -> Result<Self, Error> {
        let api_key = required(api_key, "API key", "WEBPUSHR_KEY", "api-key")?;
        let auth_token = required(auth_token, "auth token", "WEBPUSHR_AUTH", "auth-token")?;
        Ok(Self {
            api_key: SecretString::from(api_key),
            auth_token: SecretString::from(auth_token),
        })
    }
}

/// Commit range to inspect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionRange {
    /// `None` when there is no prior state (first push, new branch).
    pub before: Option<String>,
    pub after: String,
}

impl RevisionRange {
    /// Build a range from the raw values. `after` falls back to the CI
    /// commit sha; a blank or all-zero `before` means "no prior state".
    pub fn new(
        before: Option<&str>,
        after: Option<&str>,
        ci_sha: Option<&str>,
    ) -> Result<Self, Error> {
        let after = non_blank(after)
            .or_else(|| non_blank(ci_sha))
            .ok_or(Error::MissingSetting {
                name: "after revision",
                env: "AFTER_COMMIT or GITHUB_SHA",
                flag: "after",
            })?;
        let before = non_blank(before).filter(|b| !is_null_revision(b));
        Ok(Self {
            before: before.map(str::to_string),
            after: after.to_string(),
        })
    }
}

/// `0000000...` is what CI reports when a ref had no previous commit.
pub fn is_null_revision(rev: &str) -> bool {
    !rev.is_empty() && rev.chars().all(|c| c == '0')
}

fn required(
    value: Option<&str>,
    name: &'static str,
    env: &'static str,
    flag: &'static str,
) -> Result<String, Error> {
    non_blank(value)
        .map(str::to_string)
        .ok_or(Error::MissingSetting { name, env, flag })
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn has_http_scheme(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
