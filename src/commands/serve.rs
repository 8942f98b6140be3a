use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use notion_gcal_core::config::AppConfig;
use notion_gcal_core::trigger::SyncWorker;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::providers::build_engine;
use crate::webhook::{self, WebhookState};

/// Listen for notifications until Ctrl-C, syncing on each one.
pub async fn run(config: &AppConfig) -> Result<ExitCode> {
    let engine = Arc::new(build_engine(config).await?);
    let (trigger, worker) = SyncWorker::spawn(engine);

    // Catch up on anything missed while the listener was down
    trigger.tick();

    let ticker = config.webhook.poll_interval_secs.filter(|s| *s > 0).map(|secs| {
        let trigger = trigger.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(secs));
            interval.tick().await;
            loop {
                interval.tick().await;
                trigger.tick();
            }
        })
    });

    if config.webhook.secret.is_none() {
        warn!("No webhook secret configured; every notification will be rejected");
    }

    let path = config.webhook.route_path();
    let state = WebhookState::new(trigger, config.webhook.secret.clone());
    let app = webhook::router(&path, state).layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.webhook.host, config.webhook.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Listening for Notion webhooks on http://{addr}{path}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(ticker) = ticker {
        ticker.abort();
    }
    // The router held the last trigger handles; the worker finishes its pass
    worker.await.context("Sync worker panicked")?;

    Ok(ExitCode::SUCCESS)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
