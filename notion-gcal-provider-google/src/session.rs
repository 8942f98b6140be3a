//! Keeps a valid Google access token around for the calendar client.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use google_calendar::{AccessToken, Client};
use notion_gcal_core::config::GoogleConfig;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Refresh this long before Google would reject the token.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug)]
pub struct Session {
    path: PathBuf,
    data: SessionData,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SessionData {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl From<&AccessToken> for SessionData {
    fn from(tokens: &AccessToken) -> Self {
        SessionData {
            access_token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token.clone(),
            expires_at: Utc::now() + Duration::seconds(tokens.expires_in),
        }
    }
}

impl Session {
    pub fn new(path: impl Into<PathBuf>, data: SessionData) -> Self {
        Session {
            path: path.into(),
            data,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!(
                "Google OAuth session not found at {}. Create it with an access_token, \
                 refresh_token and expires_at from your OAuth login.",
                path.display()
            );
        }

        let contents = std::fs::read_to_string(path).with_context(|| {
            format!("Failed to read Google OAuth session from {}", path.display())
        })?;

        let data: SessionData = toml::from_str(&contents).with_context(|| {
            format!("Failed to parse Google OAuth session from {}", path.display())
        })?;

        Ok(Session::new(path, data))
    }

    pub fn save(&self) -> Result<()> {
        let contents = toml::to_string_pretty(&self.data).context("Failed to serialize session")?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        std::fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write session to {}", self.path.display()))?;

        // Owner-only, the file holds OAuth tokens
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("Failed to set permissions on {}", self.path.display()))?;
        }

        Ok(())
    }

    pub fn data(&self) -> &SessionData {
        &self.data
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() + Duration::seconds(EXPIRY_MARGIN_SECS) >= self.data.expires_at
    }

    pub fn client(&self, config: &GoogleConfig) -> Client {
        Client::new(
            config.client_id.clone(),
            config.client_secret.clone(),
            String::new(),
            self.data.access_token.clone(),
            self.data.refresh_token.clone(),
        )
    }

    /// Refresh the access token if it is about to expire.
    pub async fn ensure_valid(&mut self, config: &GoogleConfig) -> Result<()> {
        if self.is_expired() {
            self.refresh(config).await?;
        }
        Ok(())
    }

    async fn refresh(&mut self, config: &GoogleConfig) -> Result<()> {
        let mut tokens = self
            .client(config)
            .refresh_access_token()
            .await
            .context("Failed to refresh Google access token")?;

        // Google usually keeps the old refresh token
        if tokens.refresh_token.is_empty() {
            tokens.refresh_token = self.data.refresh_token.clone();
        }

        self.data = (&tokens).into();
        self.save()?;
        info!(expires_at = %self.data.expires_at, "Refreshed Google session");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn data(expires_in_secs: i64) -> SessionData {
        SessionData {
            access_token: "ya29.access".to_string(),
            refresh_token: "1//refresh".to_string(),
            expires_at: Utc::now() + Duration::seconds(expires_in_secs),
        }
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("session.toml");

        let session = Session::new(&path, data(3600));
        session.save().unwrap();

        let loaded = Session::load(&path).unwrap();
        assert_eq!(loaded.data(), session.data());
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_session_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.toml");
        Session::new(&path, data(3600)).save().unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_missing_session_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = Session::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_expiry_includes_margin() {
        assert!(!Session::new("s.toml", data(3600)).is_expired());
        assert!(Session::new("s.toml", data(30)).is_expired());
        assert!(Session::new("s.toml", data(-10)).is_expired());
    }
}
