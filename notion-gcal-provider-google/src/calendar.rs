use async_trait::async_trait;
use google_calendar::Client;
use google_calendar::types::{OrderBy, SendUpdates};
use notion_gcal_core::config::GoogleConfig;
use notion_gcal_core::remote::TargetCalendar;
use notion_gcal_core::{FailureKind, NormalizedEvent, RemoteError, TargetEvent};
use tokio::sync::Mutex;
use tracing::debug;

use crate::convert::{from_google_event, managed_filter, to_google_event};
use crate::error::classify;
use crate::session::Session;

/// One Google calendar, written through the session's OAuth tokens.
pub struct GoogleCalendar {
    calendar_id: String,
    config: GoogleConfig,
    session: Mutex<Session>,
}

impl GoogleCalendar {
    /// Load the session file and refresh it if it has expired.
    pub async fn connect(config: &GoogleConfig) -> anyhow::Result<Self> {
        let mut session = Session::load(&config.session_file)?;
        session.ensure_valid(config).await?;

        Ok(GoogleCalendar {
            calendar_id: config.calendar_id.clone(),
            config: config.clone(),
            session: Mutex::new(session),
        })
    }

    pub fn calendar_id(&self) -> &str {
        &self.calendar_id
    }

    /// A client with a token that is good for the next call. Long running
    /// servers outlive the hour an access token lasts.
    async fn client(&self) -> Result<Client, RemoteError> {
        let mut session = self.session.lock().await;
        if let Err(e) = session.ensure_valid(&self.config).await {
            let error = classify(&format!("{e:#}"));
            return Err(match error.kind {
                FailureKind::Transient | FailureKind::Timeout => error,
                _ => RemoteError::auth(error.message),
            });
        }
        Ok(session.client(&self.config))
    }
}

#[async_trait]
impl TargetCalendar for GoogleCalendar {
    async fn create_event(&self, event: &NormalizedEvent) -> Result<String, RemoteError> {
        let body = to_google_event(event)?;
        let client = self.client().await?;

        let response = client
            .events()
            .insert(
                &self.calendar_id,
                0,
                0,
                false,
                SendUpdates::None,
                false,
                &body,
            )
            .await
            .map_err(|e| classify(&e.to_string()))?;

        let id = response.body.id;
        if id.is_empty() {
            return Err(RemoteError::permanent(format!(
                "Google returned no id for {}",
                event.title
            )));
        }
        Ok(id)
    }

    async fn update_event(
        &self,
        target_id: &str,
        event: &NormalizedEvent,
    ) -> Result<(), RemoteError> {
        let body = to_google_event(event)?;
        let client = self.client().await?;

        client
            .events()
            .update(
                &self.calendar_id,
                target_id,
                0,
                0,
                false,
                SendUpdates::None,
                false,
                &body,
            )
            .await
            .map_err(|e| classify(&e.to_string()))?;

        Ok(())
    }

    async fn delete_event(&self, target_id: &str) -> Result<(), RemoteError> {
        let client = self.client().await?;

        let result = client
            .events()
            .delete(&self.calendar_id, target_id, false, SendUpdates::None)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                let error = classify(&e.to_string());
                if error.kind == FailureKind::NotFound {
                    debug!(target_id, "Event already gone");
                    Ok(())
                } else {
                    Err(error)
                }
            }
        }
    }

    async fn get_event(&self, target_id: &str) -> Result<Option<TargetEvent>, RemoteError> {
        let client = self.client().await?;

        match client
            .events()
            .get(&self.calendar_id, target_id, 0, "")
            .await
        {
            Ok(response) => from_google_event(response.body),
            Err(e) => {
                let error = classify(&e.to_string());
                if error.kind == FailureKind::NotFound {
                    Ok(None)
                } else {
                    Err(error)
                }
            }
        }
    }

    async fn list_managed_events(&self) -> Result<Vec<String>, RemoteError> {
        let client = self.client().await?;

        let response = client
            .events()
            .list_all(
                &self.calendar_id,
                "",                 // i_cal_uid
                0,                  // max_attendees
                OrderBy::default(), // order_by
                &[managed_filter()],
                "",    // q
                &[],   // shared_extended_property
                false, // show_deleted
                false, // show_hidden_invitations
                false, // single_events
                "",    // time_max
                "",    // time_min
                "",    // time_zone
                "",    // updated_min
            )
            .await
            .map_err(|e| classify(&e.to_string()))?;

        let ids: Vec<String> = response
            .body
            .into_iter()
            .filter(|event| event.status != "cancelled" && !event.id.is_empty())
            .map(|event| event.id)
            .collect();

        debug!(count = ids.len(), "Listed managed events");
        Ok(ids)
    }
}
