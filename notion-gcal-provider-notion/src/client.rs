//! Thin authenticated wrapper over the Notion REST API.

use std::time::Duration;

use anyhow::Context;
use notion_gcal_core::{FailureKind, RemoteError};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

pub const NOTION_API: &str = "https://api.notion.com/v1";
pub const NOTION_VERSION: &str = "2022-06-28";

pub struct NotionClient {
    http: Client,
    base_url: String,
    token: String,
}

impl NotionClient {
    pub fn new(token: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build Notion HTTP client")?;

        Ok(NotionClient {
            http,
            base_url: NOTION_API.to_string(),
            token: token.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, RemoteError> {
        let url = format!("{}/{}", self.base_url, path);
        self.send(self.http.get(url).query(query)).await
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, RemoteError> {
        let url = format!("{}/{}", self.base_url, path);
        self.send(self.http.post(url).json(body)).await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, RemoteError> {
        let response = request
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            debug!(%status, body = %text, "Notion request failed");
            return Err(RemoteError::new(
                status_kind(status),
                format!("Notion API error (HTTP {status}): {text}"),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| RemoteError::permanent(format!("Unexpected Notion response: {e}")))
    }
}

pub fn status_kind(status: StatusCode) -> FailureKind {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FailureKind::Auth,
        StatusCode::NOT_FOUND => FailureKind::NotFound,
        StatusCode::TOO_MANY_REQUESTS | StatusCode::CONFLICT => FailureKind::Transient,
        s if s.is_server_error() => FailureKind::Transient,
        _ => FailureKind::Permanent,
    }
}

fn transport_error(e: reqwest::Error) -> RemoteError {
    if e.is_timeout() {
        RemoteError::new(FailureKind::Timeout, format!("Notion request timed out: {e}"))
    } else {
        RemoteError::transient(format!("Notion request failed: {e}"))
    }
}
