use std::process::ExitCode;

use anyhow::Result;
use notion_gcal_core::RunOutcome;
use notion_gcal_core::config::AppConfig;
use owo_colors::OwoColorize;

use crate::providers::build_engine;
use crate::render::Render;

/// Delete every synced event from the calendar and forget the mapping.
pub async fn run(config: &AppConfig, yes: bool) -> Result<ExitCode> {
    let engine = build_engine(config).await?;
    let store = engine.load_store();

    if !yes {
        println!(
            "This deletes {} mapped {} and every other event tagged as synced from calendar '{}', \
             then removes {}.",
            store.len(),
            if store.len() == 1 { "event" } else { "events" },
            config.google.calendar_id,
            store.path().display()
        );
        println!("{}", "Re-run with --yes to continue.".yellow());
        return Ok(ExitCode::FAILURE);
    }

    let outcome = engine.reset().await?;
    println!("{}", outcome.render());

    if reset_finished(&outcome) {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// Failed deletes keep the mapping file, so the reset is not done.
fn reset_finished(outcome: &RunOutcome) -> bool {
    matches!(outcome, RunOutcome::Completed { summary } if summary.is_clean())
}

#[cfg(test)]
mod tests {
    use super::*;
    use notion_gcal_core::sync::ActionKind;
    use notion_gcal_core::{RemoteError, SyncAction, SyncSummary};

    #[test]
    fn test_reset_with_failed_deletes_is_not_finished() {
        let mut summary = SyncSummary::default();
        summary.record_success(ActionKind::Delete);
        assert!(reset_finished(&RunOutcome::Completed {
            summary: summary.clone()
        }));

        let action = SyncAction::Delete {
            source_id: "page-1".to_string(),
            target_id: "g-1".to_string(),
        };
        summary.record_failure(&action, &RemoteError::transient("503 backend error"));
        assert!(!reset_finished(&RunOutcome::Completed { summary }));
        assert!(!reset_finished(&RunOutcome::Busy));
    }
}
