use std::sync::Arc;

use anyhow::{Context, Result};
use notion_gcal_core::config::AppConfig;
use notion_gcal_core::{Engine, EngineSettings};
use notion_gcal_provider_google::GoogleCalendar;
use notion_gcal_provider_notion::NotionSource;
use tracing::debug;

/// Wire the configured Notion database and Google calendar into an engine.
pub async fn build_engine(config: &AppConfig) -> Result<Engine> {
    let source = NotionSource::new(&config.notion, config.sync.max_depth)?;

    let target = GoogleCalendar::connect(&config.google)
        .await
        .context("Failed to connect to Google Calendar")?;
    debug!(calendar_id = target.calendar_id(), "Connected to Google Calendar");

    Ok(Engine::new(
        EngineSettings::from_config(config),
        Arc::new(source),
        Arc::new(target),
    ))
}
