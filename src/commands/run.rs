use std::process::ExitCode;

use anyhow::Result;
use notion_gcal_core::RunOptions;
use notion_gcal_core::config::AppConfig;

use crate::providers::build_engine;
use crate::render::Render;

/// Exit status reserved for a refused mass deletion.
pub const SAFETY_ABORT_EXIT: u8 = 2;

pub async fn run(config: &AppConfig, force: bool, dry_run: bool) -> Result<ExitCode> {
    let engine = build_engine(config).await?;

    let outcome = engine
        .run(RunOptions {
            force,
            dry_run,
            ..RunOptions::default()
        })
        .await?;

    println!("{}", outcome.render());

    if outcome.is_safety_abort() {
        Ok(ExitCode::from(SAFETY_ABORT_EXIT))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
