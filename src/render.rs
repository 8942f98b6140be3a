//! Colored terminal rendering for sync plans and outcomes.

use notion_gcal_core::sync::{ActionKind, RunOutcome, SyncAction, SyncPlan, SyncSummary};
use owo_colors::OwoColorize;

pub trait Render {
    fn render(&self) -> String;
}

impl Render for ActionKind {
    fn render(&self) -> String {
        let symbol = self.symbol();
        match self {
            ActionKind::Create => symbol.green().to_string(),
            ActionKind::Update => symbol.yellow().to_string(),
            ActionKind::Delete => symbol.red().to_string(),
        }
    }
}

fn colorize(kind: ActionKind, text: &str) -> String {
    match kind {
        ActionKind::Create => text.green().to_string(),
        ActionKind::Update => text.yellow().to_string(),
        ActionKind::Delete => text.red().to_string(),
    }
}

impl Render for SyncAction {
    fn render(&self) -> String {
        let kind = self.kind();
        let label = colorize(kind, self.label());

        match self.event() {
            Some(event) => format!("{} {} {}", kind.render(), label, event.start.to_string().dimmed()),
            None => format!("{} {}", kind.render(), label),
        }
    }
}

/// Above this many actions, show counts instead.
const COMPACT_THRESHOLD: usize = 10;

fn pluralize(count: usize) -> &'static str {
    if count == 1 { "event" } else { "events" }
}

impl Render for SyncPlan {
    fn render(&self) -> String {
        if self.is_empty() {
            return "   No changes".dimmed().to_string();
        }

        if self.len() <= COMPACT_THRESHOLD {
            return self
                .actions
                .iter()
                .map(|action| format!("   {}", action.render()))
                .collect::<Vec<_>>()
                .join("\n");
        }

        let (creates, updates, deletes) = self.counts();
        let mut lines = Vec::new();
        for (kind, count, word) in [
            (ActionKind::Create, creates, "new"),
            (ActionKind::Update, updates, "changed"),
            (ActionKind::Delete, deletes, "deleted"),
        ] {
            if count > 0 {
                let label = format!("({count} {word} {})", pluralize(count));
                lines.push(format!("   {} {}", kind.render(), colorize(kind, &label)));
            }
        }
        lines.join("\n")
    }
}

impl Render for SyncSummary {
    fn render(&self) -> String {
        let mut line = format!(
            "{} created, {} updated, {} deleted",
            self.created.green(),
            self.updated.yellow(),
            self.deleted.red()
        );

        if self.failed == 0 {
            return line;
        }

        line.push_str(&format!(", {} failed", self.failed.red().bold()));
        let mut lines = vec![line];
        for failure in &self.failures {
            lines.push(format!(
                "   {} {} {}",
                failure.action.render(),
                failure.label,
                format!("[{}] {}", failure.kind, failure.message).dimmed()
            ));
        }
        lines.join("\n")
    }
}

impl Render for RunOutcome {
    fn render(&self) -> String {
        match self {
            RunOutcome::Skipped { last_modified, .. } => format!(
                "{} {}",
                "No changes since last sync.".dimmed(),
                format!("(last edit {last_modified})").dimmed()
            ),
            RunOutcome::Busy => "Another sync is already running, nothing done."
                .yellow()
                .to_string(),
            RunOutcome::SafetyAbort {
                source_records,
                mapped,
                threshold,
            } => format!(
                "{}\n   Notion returned {source_records} events but {mapped} are synced \
                 (threshold {threshold}). Re-run with --force if the database really is empty.",
                "Refusing to delete every synced event.".red().bold()
            ),
            RunOutcome::DryRun { plan } => {
                format!("{}\n{}", "Dry run, nothing applied:".dimmed(), plan.render())
            }
            RunOutcome::Completed { summary } => summary.render(),
        }
    }
}
