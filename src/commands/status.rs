use std::process::ExitCode;

use anyhow::Result;
use notion_gcal_core::config::AppConfig;
use owo_colors::OwoColorize;

use crate::providers::build_engine;
use crate::render::Render;

pub async fn run(config: &AppConfig) -> Result<ExitCode> {
    let engine = build_engine(config).await?;
    let store = engine.load_store();

    println!("📅 {}", config.notion.database_id);
    println!("   {} {}", "State file:".dimmed(), store.path().display());
    println!("   {} {}", "Synced events:".dimmed(), store.len());

    let watermark = store
        .watermark()
        .map(|w| w.to_string())
        .unwrap_or_else(|| "never".to_string());
    println!("   {} {}", "Last complete sync:".dimmed(), watermark);

    if store.is_degraded() {
        println!(
            "   {}",
            "State file is unreadable; the next sync starts from an empty mapping.".red()
        );
    }

    println!();
    match engine.preview(&store).await {
        Ok(plan) => println!("{}", plan.render()),
        Err(e) => println!("   {}", e.to_string().red()),
    }

    Ok(ExitCode::SUCCESS)
}
