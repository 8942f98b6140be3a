//! Application configuration.
//!
//! Layered, later sources win:
//! 1. built-in defaults
//! 2. `~/.config/notion-gcal/config.toml` (or `--config`)
//! 3. `NOTION_GCAL__<SECTION>__<KEY>` environment variables
//! 4. the short variable names from `.env` deployments
//!    (`NOTION_TOKEN`, `NOTION_DATABASE_ID`, `NOTION_WEBHOOK_SECRET`, ...)
//!
//! The resulting `AppConfig` is passed explicitly to every component.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::content::{DEFAULT_MAX_CHARS, DEFAULT_MAX_DEPTH};
use crate::error::{SyncError, SyncResult};
use crate::normalize::DEFAULT_TITLE_PREFIX;
use crate::safety::DEFAULT_SAFETY_THRESHOLD;

const APP_DIR: &str = "notion-gcal";

/// Environment variables that map straight onto config keys.
const LEGACY_ENV: &[(&str, &str)] = &[
    ("NOTION_TOKEN", "notion.token"),
    ("NOTION_DATABASE_ID", "notion.database_id"),
    ("NOTION_TIMEOUT_MS", "notion.timeout_ms"),
    ("NOTION_WEBHOOK_SECRET", "webhook.secret"),
    ("WEBHOOK_PATH", "webhook.path"),
    ("WEBHOOK_PORT", "webhook.port"),
];

fn app_dir(base: Option<PathBuf>) -> PathBuf {
    base.unwrap_or_else(|| PathBuf::from(".")).join(APP_DIR)
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub notion: NotionConfig,
    pub google: GoogleConfig,
    pub sync: SyncConfig,
    pub webhook: WebhookConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotionConfig {
    pub token: String,
    pub database_id: String,
    /// Property holding the page title
    pub title_property: String,
    /// Date property that schedules the page
    pub date_property: String,
    pub timeout_ms: u64,
}

impl Default for NotionConfig {
    fn default() -> Self {
        NotionConfig {
            token: String::new(),
            database_id: String::new(),
            title_property: "Name".to_string(),
            date_property: "Do Date".to_string(),
            timeout_ms: 20_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
    pub calendar_id: String,
    pub client_id: String,
    pub client_secret: String,
    /// OAuth tokens, written by whatever performed the initial login
    pub session_file: PathBuf,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        GoogleConfig {
            calendar_id: "primary".to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            session_file: app_dir(dirs::config_dir()).join("session.toml"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub state_file: PathBuf,
    pub title_prefix: String,
    pub default_duration_minutes: i64,
    pub description_limit: usize,
    pub max_depth: usize,
    pub safety_threshold: usize,
    /// Look up every mapped target event to repair drift and re-create
    /// events deleted by hand. Costs one API call per mapped event.
    pub verify_target: bool,
    /// Limit for a single calendar or source call
    pub request_timeout_secs: u64,
    /// Limit for fetching the whole collection, page bodies included
    pub fetch_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            state_file: app_dir(dirs::data_dir()).join("synced_events.json"),
            title_prefix: DEFAULT_TITLE_PREFIX.to_string(),
            default_duration_minutes: 60,
            description_limit: DEFAULT_MAX_CHARS,
            max_depth: DEFAULT_MAX_DEPTH,
            safety_threshold: DEFAULT_SAFETY_THRESHOLD,
            verify_target: false,
            request_timeout_secs: 30,
            fetch_timeout_secs: 600,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    pub host: String,
    pub port: u16,
    pub path: String,
    pub secret: Option<String>,
    /// Also trigger a pass on this interval while serving
    pub poll_interval_secs: Option<u64>,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        WebhookConfig {
            host: "0.0.0.0".to_string(),
            port: 8000,
            path: "/notion/webhook".to_string(),
            secret: None,
            poll_interval_secs: None,
        }
    }
}

impl WebhookConfig {
    /// The configured path with a leading `/`.
    pub fn route_path(&self) -> String {
        if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        }
    }
}

impl AppConfig {
    pub fn default_path() -> SyncResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| SyncError::Config("Could not determine config directory".into()))?;

        Ok(app_dir(Some(config_dir)).join("config.toml"))
    }

    /// Load from `path` (or the default location) plus the environment.
    pub fn load(path: Option<&Path>) -> SyncResult<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };

        let mut builder = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix("NOTION_GCAL")
                    .separator("__")
                    .try_parsing(true),
            );

        for (var, key) in LEGACY_ENV {
            builder = builder
                .set_override_option(*key, std::env::var(var).ok())
                .map_err(|e| SyncError::Config(e.to_string()))?;
        }

        let mut config: AppConfig = builder
            .build()
            .map_err(|e| SyncError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| SyncError::Config(e.to_string()))?;

        config.expand_paths();
        Ok(config)
    }

    fn expand_paths(&mut self) {
        let expand = |p: &Path| PathBuf::from(shellexpand::tilde(&p.to_string_lossy()).into_owned());
        self.sync.state_file = expand(&self.sync.state_file);
        self.google.session_file = expand(&self.google.session_file);
    }

    /// Fail early on settings no run can do without.
    pub fn validate(&self) -> SyncResult<()> {
        if self.notion.token.trim().is_empty() || self.notion.database_id.trim().is_empty() {
            return Err(SyncError::Config(
                "Set NOTION_TOKEN and NOTION_DATABASE_ID (or notion.token and notion.database_id)"
                    .into(),
            ));
        }

        if self.sync.request_timeout_secs == 0 || self.sync.fetch_timeout_secs == 0 {
            return Err(SyncError::Config(
                "sync.request_timeout_secs and sync.fetch_timeout_secs must be greater than zero"
                    .into(),
            ));
        }

        Ok(())
    }

    /// Lock file guarding the state file.
    pub fn lock_file(&self) -> PathBuf {
        self.sync.state_file.with_extension("lock")
    }
}
