//! A Notion database as the sync source.

mod client;
mod wire;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use notion_gcal_core::config::NotionConfig;
use notion_gcal_core::remote::SourceCollection;
use notion_gcal_core::{ContentBlock, RemoteError, SourceRecord};
use serde_json::json;
use tracing::{debug, info, warn};

pub use client::{NOTION_API, NOTION_VERSION, NotionClient, status_kind};
pub use wire::parse_schedule;
use wire::{Block, Database, ListPage, Page};

const BLOCK_PAGE_SIZE: &str = "50";

type BlockFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<ContentBlock>, RemoteError>> + Send + 'a>>;

pub struct NotionSource {
    client: NotionClient,
    title_property: String,
    date_property: String,
    max_depth: usize,
}

impl NotionSource {
    /// `max_depth` bounds how far nested blocks are fetched.
    pub fn new(config: &NotionConfig, max_depth: usize) -> anyhow::Result<Self> {
        let client = NotionClient::new(&config.token, Duration::from_millis(config.timeout_ms))?;

        Ok(NotionSource {
            client,
            title_property: config.title_property.clone(),
            date_property: config.date_property.clone(),
            max_depth,
        })
    }

    pub fn with_client(mut self, client: NotionClient) -> Self {
        self.client = client;
        self
    }

    async fn query(
        &self,
        collection_id: &str,
        body: serde_json::Value,
    ) -> Result<ListPage<Page>, RemoteError> {
        self.client
            .post(&format!("databases/{collection_id}/query"), &body)
            .await
    }

    async fn pages(&self, collection_id: &str) -> Result<Vec<Page>, RemoteError> {
        let mut pages = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut body = json!({
                "filter": {"property": self.date_property, "date": {"is_not_empty": true}},
            });
            if let Some(cursor) = &cursor {
                body["start_cursor"] = json!(cursor);
            }

            let batch = self.query(collection_id, body).await?;
            pages.extend(batch.results);

            match batch.next_cursor {
                Some(next) if batch.has_more => cursor = Some(next),
                _ => break,
            }
        }

        Ok(pages)
    }

    /// Blocks under `block_id`, recursing into children until `max_depth`.
    fn blocks<'a>(&'a self, block_id: &'a str, depth: usize) -> BlockFuture<'a> {
        Box::pin(async move {
            let mut blocks = Vec::new();
            let mut cursor: Option<String> = None;

            loop {
                let mut query = vec![("page_size", BLOCK_PAGE_SIZE.to_string())];
                if let Some(cursor) = &cursor {
                    query.push(("start_cursor", cursor.clone()));
                }

                let batch: ListPage<Block> = self
                    .client
                    .get(&format!("blocks/{block_id}/children"), &query)
                    .await?;

                for block in batch.results {
                    let mut content = ContentBlock::new(block.block_kind(), block.text());
                    if block.has_children && depth + 1 < self.max_depth {
                        content.children = self.blocks(&block.id, depth + 1).await?;
                    }
                    blocks.push(content);
                }

                match batch.next_cursor {
                    Some(next) if batch.has_more => cursor = Some(next),
                    _ => break,
                }
            }

            Ok(blocks)
        })
    }

    /// Page body, or `None` if it cannot be fetched. Only bad credentials
    /// fail the whole fetch.
    async fn content(&self, page_id: &str) -> Result<Option<Vec<ContentBlock>>, RemoteError> {
        match self.blocks(page_id, 0).await {
            Ok(blocks) => Ok(Some(blocks)),
            Err(e) if e.is_auth() => Err(e),
            Err(e) => {
                warn!(page_id, error = %e, "Failed to fetch page content");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl SourceCollection for NotionSource {
    /// The newer of the database's own edit time and its most recently
    /// edited page. Page edits do not bump the database timestamp.
    async fn last_modified(&self, collection_id: &str) -> Result<DateTime<Utc>, RemoteError> {
        let database: Database = self
            .client
            .get(&format!("databases/{collection_id}"), &[])
            .await?;

        let newest = self
            .query(
                collection_id,
                json!({
                    "sorts": [{"timestamp": "last_edited_time", "direction": "descending"}],
                    "page_size": 1,
                }),
            )
            .await?;

        let page_edited = newest.results.first().map(|p| p.last_edited_time);
        Ok(page_edited.map_or(database.last_edited_time, |p| p.max(database.last_edited_time)))
    }

    async fn list_records(&self, collection_id: &str) -> Result<Vec<SourceRecord>, RemoteError> {
        let pages = self.pages(collection_id).await?;
        debug!(count = pages.len(), "Fetched Notion pages");

        let mut records = Vec::with_capacity(pages.len());
        for page in pages.into_iter().filter(Page::is_live) {
            let Some(schedule) = page.schedule(&self.date_property) else {
                debug!(page_id = %page.id, "Page has no date, skipping");
                continue;
            };

            let content = self.content(&page.id).await?;
            records.push(SourceRecord {
                title: page.title(&self.title_property),
                schedule,
                content_complete: content.is_some(),
                content: content.unwrap_or_default(),
                last_edited: page.last_edited_time,
                id: page.id,
            });
        }

        info!(count = records.len(), "Found events in Notion");
        Ok(records)
    }
}
