//! Runtime configuration: optional YAML settings plus environment credentials.
//!
//! Non-secret knobs (API base URL, page size, SMTP endpoint, digest wording)
//! live in [`Settings`], which defaults sensibly and can be overridden from a
//! YAML file. Secrets and identities come from the environment and are
//! validated up front by [`StageConfig::resolve`], so a missing variable
//! fails the run before any network activity.
//!
//! # Environment Variables
//!
//! | Variable | Used by | Notes |
//! |----------|---------|-------|
//! | `GITHUB_TOKEN` / `PAT_TOKEN` | fetch | Bearer token, first non-empty wins |
//! | `GITHUB_REPOSITORY` | fetch | `owner/name` of the crawling repository |
//! | `SENDER_EMAIL` | digest | SMTP login and `From` address |
//! | `SENDER_PASSWORD` | digest | SMTP credential |
//! | `RECIPIENT_EMAIL` | digest | Single `To` address |

use crate::cli::Mode;
use crate::models::GroupBy;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Largest page size the listing endpoint accepts.
pub const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),
    #[error("missing bearer token: set GITHUB_TOKEN or PAT_TOKEN")]
    MissingToken,
    #[error("repository must look like owner/name, got {0:?}")]
    InvalidRepository(String),
    #[error("per_page must be between 1 and 100, got {0}")]
    InvalidPageSize(u32),
    #[error("failed to read settings file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse settings file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

/// Non-secret settings, loadable from a YAML file.
///
/// Every field has a default, so an empty file (or no file at all) is valid.
///
/// # Example
///
/// ```yaml
/// api_base_url: https://api.github.com
/// per_page: 50
/// group_by: keyword
/// subject: "🌾 Agro Digest"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Root of the artifact REST API.
    pub api_base_url: String,
    /// Repository holding the artifacts, used when `GITHUB_REPOSITORY` is unset.
    pub repository: Option<String>,
    /// Listing page size, 1..=100.
    pub per_page: u32,
    /// Default grouping when `--group-by` is not given.
    pub group_by: GroupBy,
    /// Mail submission host (implicit TLS).
    pub smtp_host: String,
    pub smtp_port: u16,
    /// Subject prefix; the local date is appended.
    pub subject: String,
    /// Heading at the top of the digest.
    pub title: String,
    /// Human description of the covered period, shown under the title.
    pub period_description: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.github.com".to_string(),
            repository: None,
            per_page: MAX_PER_PAGE,
            group_by: GroupBy::Source,
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 465,
            subject: "🌾 Agro Digest".to_string(),
            title: "🌾 Resumen Agro Consolidado 🌾".to_string(),
            period_description: "el último período".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from `path`, or return defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            debug!("No settings file given; using defaults");
            return Ok(Self::default());
        };

        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_yaml(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        settings.validate()?;
        info!(path = %path.display(), "Loaded settings file");
        Ok(settings)
    }

    fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        // An empty document deserializes to unit, not to an empty mapping.
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.per_page == 0 || self.per_page > MAX_PER_PAGE {
            return Err(ConfigError::InvalidPageSize(self.per_page));
        }
        Ok(())
    }
}

/// Identity and credential for the artifact listing API.
#[derive(Clone)]
pub struct ApiCredentials {
    /// `owner/name`
    pub repository: String,
    pub token: String,
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("repository", &self.repository)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl ApiCredentials {
    /// Resolve the token through `lookup`.
    ///
    /// `repository` is the CLI/env value (`--repository` / `GITHUB_REPOSITORY`);
    /// when absent the settings file's `repository` is used.
    pub fn from_lookup<F>(
        repository: Option<String>,
        settings: &Settings,
        lookup: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = ["GITHUB_TOKEN", "PAT_TOKEN"]
            .into_iter()
            .find_map(|key| non_empty(lookup(key)))
            .ok_or(ConfigError::MissingToken)?;

        let repository = non_empty(repository)
            .or_else(|| non_empty(settings.repository.clone()))
            .ok_or(ConfigError::Missing("GITHUB_REPOSITORY"))?;

        let valid = matches!(
            repository.split_once('/'),
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/')
        );
        if !valid {
            return Err(ConfigError::InvalidRepository(repository));
        }

        Ok(Self { repository, token })
    }
}

/// Sender and recipient for the digest email.
#[derive(Clone)]
pub struct MailConfig {
    pub sender: String,
    pub password: String,
    pub recipient: String,
}

impl std::fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailConfig")
            .field("sender", &self.sender)
            .field("password", &"<redacted>")
            .field("recipient", &self.recipient)
            .finish()
    }
}

impl MailConfig {
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &'static str| non_empty(lookup(key)).ok_or(ConfigError::Missing(key));

        Ok(Self {
            sender: require("SENDER_EMAIL")?,
            password: require("SENDER_PASSWORD")?,
            recipient: require("RECIPIENT_EMAIL")?,
        })
    }
}

/// Everything the selected pipeline stages need from the environment.
#[derive(Debug, Clone)]
pub struct StageConfig {
    /// Present when the mode fetches artifacts.
    pub credentials: Option<ApiCredentials>,
    /// Present when the mode sends the digest (not on a dry run).
    pub mail: Option<MailConfig>,
}

impl StageConfig {
    pub fn from_env(
        mode: Mode,
        dry_run: bool,
        repository: Option<String>,
        settings: &Settings,
    ) -> Result<Self, ConfigError> {
        Self::resolve(mode, dry_run, repository, settings, |key| std::env::var(key).ok())
    }

    /// Check every variable `mode` will need, fetch credentials first.
    pub fn resolve<F>(
        mode: Mode,
        dry_run: bool,
        repository: Option<String>,
        settings: &Settings,
        lookup: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let credentials = if mode.fetches() {
            Some(ApiCredentials::from_lookup(repository, settings, &lookup)?)
        } else {
            None
        };
        let mail = if mode.digests() && !dry_run {
            Some(MailConfig::from_lookup(&lookup)?)
        } else {
            None
        };

        debug!(
            fetch = credentials.is_some(),
            send = mail.is_some(),
            "Validated stage configuration"
        );
        Ok(Self { credentials, mail })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
