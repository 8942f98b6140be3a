//! The reconciliation pass.
//!
//! One `run` is: gate -> fetch -> normalize -> plan -> safety guard ->
//! apply, persisting the mapping after every successful action so an
//! interrupted pass only loses the action in flight.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::content::FlattenOptions;
use crate::error::{FailureKind, RemoteError, SyncError, SyncResult};
use crate::event::NormalizedEvent;
use crate::gate::{ChangeGate, GateDecision};
use crate::lock::RunLock;
use crate::mapping::{MappingEntry, MappingStore};
use crate::normalize::{NormalizeOptions, Normalizer};
use crate::remote::{SourceCollection, TargetCalendar, with_timeout};
use crate::safety::{SafetyGuard, SafetyVerdict};
use crate::sync::{ActionKind, RunOutcome, SyncAction, SyncPlan, SyncSummary, TargetSnapshot};

/// Everything the engine needs from the configuration.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub collection_id: String,
    pub state_file: PathBuf,
    pub lock_file: PathBuf,
    pub safety_threshold: usize,
    pub request_timeout: Duration,
    pub fetch_timeout: Duration,
    pub verify_target: bool,
    pub normalize: NormalizeOptions,
}

impl EngineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        EngineSettings {
            collection_id: config.notion.database_id.clone(),
            state_file: config.sync.state_file.clone(),
            lock_file: config.lock_file(),
            safety_threshold: config.sync.safety_threshold,
            request_timeout: Duration::from_secs(config.sync.request_timeout_secs),
            fetch_timeout: Duration::from_secs(config.sync.fetch_timeout_secs),
            verify_target: config.sync.verify_target,
            normalize: NormalizeOptions {
                title_prefix: config.sync.title_prefix.clone(),
                default_duration: chrono::Duration::minutes(config.sync.default_duration_minutes),
                flatten: FlattenOptions {
                    max_depth: config.sync.max_depth,
                    max_chars: config.sync.description_limit,
                },
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Bypass the change gate and the safety guard
    pub force: bool,
    /// Compute and report the plan without applying it
    pub dry_run: bool,
    /// Bypass only the change gate
    pub ignore_gate: bool,
}

/// Normalized events, plus the records whose page body could not be read.
struct Fetched {
    events: Vec<NormalizedEvent>,
    incomplete: HashSet<String>,
}

pub struct Engine {
    settings: EngineSettings,
    source: Arc<dyn SourceCollection>,
    target: Arc<dyn TargetCalendar>,
    normalizer: Normalizer,
    gate: ChangeGate,
    guard: SafetyGuard,
}

impl Engine {
    pub fn new(
        settings: EngineSettings,
        source: Arc<dyn SourceCollection>,
        target: Arc<dyn TargetCalendar>,
    ) -> Self {
        Engine {
            normalizer: Normalizer::new(settings.normalize.clone()),
            gate: ChangeGate,
            guard: SafetyGuard::new(settings.safety_threshold),
            settings,
            source,
            target,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn load_store(&self) -> MappingStore {
        MappingStore::load(&self.settings.state_file)
    }

    /// One full pass against the mapping file, holding the run lock.
    pub async fn run(&self, options: RunOptions) -> SyncResult<RunOutcome> {
        let Some(_lock) = RunLock::try_acquire(&self.settings.lock_file)? else {
            warn!("Another sync is in progress, dropping this run");
            return Ok(RunOutcome::Busy);
        };

        let mut store = self.load_store();
        self.run_with_store(&mut store, options).await
    }

    /// A pass against an already loaded store. Callers own the locking.
    pub async fn run_with_store(
        &self,
        store: &mut MappingStore,
        options: RunOptions,
    ) -> SyncResult<RunOutcome> {
        let started_at = Utc::now();
        let last_modified = self.last_modified().await?;

        let bypass_gate = options.force || options.ignore_gate;
        if self.gate.check(last_modified, store.watermark(), bypass_gate) == GateDecision::Skip {
            info!(%last_modified, "No changes since last sync, skipping");
            return Ok(RunOutcome::Skipped {
                last_modified,
                watermark: store.watermark(),
            });
        }

        if store.is_degraded() {
            warn!("Mapping store could not be read; events already in the calendar may be created again");
        }

        let Fetched { events, incomplete } = self.fetch().await?;

        if let SafetyVerdict::Abort {
            source_records,
            mapped,
        } = self.guard.check(events.len(), store.len(), options.force)
        {
            warn!(
                source_records,
                mapped,
                threshold = self.guard.threshold(),
                "Source returned no records while many events are mapped; refusing to delete them. \
                 Re-run with --force if this is intentional"
            );
            return Ok(RunOutcome::SafetyAbort {
                source_records,
                mapped,
                threshold: self.guard.threshold(),
            });
        }

        let snapshot = self.snapshot(store, &events).await?;
        let plan = SyncPlan::compute(&events, store, &snapshot);

        let (creates, updates, deletes) = plan.counts();
        info!(creates, updates, deletes, "Computed sync plan");

        if options.dry_run {
            return Ok(RunOutcome::DryRun { plan });
        }

        let summary = self.apply(&plan, store, &incomplete).await?;

        if summary.is_clean() {
            store.set_watermark(self.gate.watermark_after(last_modified, started_at));
            store.save()?;
        } else {
            warn!(
                failed = summary.failed,
                "Some actions failed, keeping the previous watermark so the next run retries"
            );
        }

        info!(
            created = summary.created,
            updated = summary.updated,
            deleted = summary.deleted,
            failed = summary.failed,
            "Sync complete"
        );

        Ok(RunOutcome::Completed { summary })
    }

    /// The plan a forced pass would apply right now, without applying it.
    pub async fn preview(&self, store: &MappingStore) -> SyncResult<SyncPlan> {
        let Fetched { events, .. } = self.fetch().await?;
        let snapshot = self.snapshot(store, &events).await?;
        Ok(SyncPlan::compute(&events, store, &snapshot))
    }

    /// Delete every mapped target event and every event the target marks
    /// as ours, then the mapping file itself.
    ///
    /// Tagged events are found even when the mapping is lost or corrupt.
    /// Entries whose delete fails stay in the store so a second reset can
    /// pick them up.
    pub async fn reset(&self) -> SyncResult<RunOutcome> {
        let Some(_lock) = RunLock::try_acquire(&self.settings.lock_file)? else {
            warn!("Another sync is in progress, not resetting");
            return Ok(RunOutcome::Busy);
        };

        let mut store = self.load_store();
        let mut summary = SyncSummary::default();

        let mut actions: Vec<SyncAction> = store
            .entries()
            .map(|(source_id, entry)| SyncAction::Delete {
                source_id: source_id.clone(),
                target_id: entry.target_id.clone(),
            })
            .collect();
        let mut known: HashSet<String> = store
            .entries()
            .map(|(_, entry)| entry.target_id.clone())
            .collect();

        match with_timeout(self.settings.fetch_timeout, self.target.list_managed_events()).await {
            Ok(managed) => {
                for target_id in managed {
                    if known.insert(target_id.clone()) {
                        // Unmapped, so there is no source id to forget
                        actions.push(SyncAction::Delete {
                            source_id: String::new(),
                            target_id,
                        });
                    }
                }
            }
            Err(e) if e.is_auth() => return Err(SyncError::TargetAuth(e)),
            Err(e) => {
                warn!(error = %e, "Could not list tagged events, deleting mapped events only");
                summary.record_error(ActionKind::Delete, "", "tagged events", &e);
            }
        }

        info!(count = actions.len(), "Deleting every synced event");
        summary.merge(self.apply(&SyncPlan { actions }, &mut store, &HashSet::new()).await?);

        if summary.is_clean() {
            store.delete_file()?;
            info!(path = %store.path().display(), "Removed mapping file");
        }

        Ok(RunOutcome::Completed { summary })
    }

    async fn last_modified(&self) -> SyncResult<DateTime<Utc>> {
        with_timeout(
            self.settings.request_timeout,
            self.source.last_modified(&self.settings.collection_id),
        )
        .await
        .map_err(SyncError::Source)
    }

    async fn fetch(&self) -> SyncResult<Fetched> {
        let records = with_timeout(
            self.settings.fetch_timeout,
            self.source.list_records(&self.settings.collection_id),
        )
        .await
        .map_err(SyncError::Source)?;

        info!(count = records.len(), "Fetched source records");

        let mut seen = HashSet::new();
        let records: Vec<_> = records
            .iter()
            .filter(|record| {
                let first = seen.insert(record.id.clone());
                if !first {
                    warn!(source_id = %record.id, "Duplicate source record, ignoring");
                }
                first
            })
            .collect();

        let incomplete = records
            .iter()
            .filter(|record| !record.content_complete)
            .map(|record| record.id.clone())
            .collect();

        Ok(Fetched {
            events: records
                .iter()
                .map(|record| self.normalizer.normalize(record))
                .collect(),
            incomplete,
        })
    }

    /// Look up mapped target events when verification is on.
    async fn snapshot(
        &self,
        store: &MappingStore,
        events: &[NormalizedEvent],
    ) -> SyncResult<TargetSnapshot> {
        let mut snapshot = TargetSnapshot::default();
        if !self.settings.verify_target {
            return Ok(snapshot);
        }

        for event in events {
            let Some(target_id) = store.target_id(&event.source_id) else {
                continue;
            };

            match self.call(self.target.get_event(target_id)).await {
                Ok(found) => snapshot.record(target_id, found),
                Err(e) if e.is_auth() => return Err(SyncError::TargetAuth(e)),
                // Unknown state: fall back to the stored fingerprint.
                Err(e) => warn!(target_id, error = %e, "Could not verify target event"),
            }
        }

        Ok(snapshot)
    }

    /// Apply `plan` in order. Updates for records in `incomplete` are
    /// tallied as failed instead of overwriting the event with an empty body.
    async fn apply(
        &self,
        plan: &SyncPlan,
        store: &mut MappingStore,
        incomplete: &HashSet<String>,
    ) -> SyncResult<SyncSummary> {
        let mut summary = SyncSummary::default();

        for action in &plan.actions {
            if action.kind() == ActionKind::Update && incomplete.contains(action.source_id()) {
                let error = RemoteError::transient("page content could not be fetched");
                warn!(action = %action, "Page content unavailable, leaving the event as it is");
                summary.record_failure(action, &error);
                continue;
            }

            match self.apply_action(action, store).await {
                Ok(()) => {
                    summary.record_success(action.kind());
                    store.save()?;
                }
                Err(e) if e.is_auth() => {
                    warn!(action = %action, error = %e, "Target rejected credentials, stopping");
                    return Err(SyncError::TargetAuth(e));
                }
                Err(e) => {
                    warn!(action = %action, error = %e, "Action failed");
                    summary.record_failure(action, &e);
                }
            }
        }

        Ok(summary)
    }

    async fn apply_action(
        &self,
        action: &SyncAction,
        store: &mut MappingStore,
    ) -> Result<(), RemoteError> {
        match action {
            SyncAction::Create { event, replaces } => {
                if let Some(old) = replaces {
                    info!(target_id = %old, "Mapped event is gone from the calendar, re-creating");
                }
                self.create(event, store).await
            }
            SyncAction::Update { target_id, event } => {
                match self.call(self.target.update_event(target_id, event)).await {
                    Ok(()) => {
                        store.put(&event.source_id, MappingEntry::new(target_id, event.fingerprint()));
                        info!("Updated: {}", event.title);
                        Ok(())
                    }
                    Err(e) if e.kind == FailureKind::NotFound => {
                        info!(target_id = %target_id, "Event to update is gone, re-creating");
                        self.create(event, store).await
                    }
                    Err(e) => Err(e),
                }
            }
            SyncAction::Delete {
                source_id,
                target_id,
            } => {
                self.call(self.target.delete_event(target_id)).await?;
                store.remove(source_id);
                info!("Deleted event: {target_id}");
                Ok(())
            }
        }
    }

    async fn create(
        &self,
        event: &NormalizedEvent,
        store: &mut MappingStore,
    ) -> Result<(), RemoteError> {
        let target_id = self.call(self.target.create_event(event)).await?;
        debug!(source_id = %event.source_id, %target_id, "Mapped new event");
        store.put(&event.source_id, MappingEntry::new(target_id, event.fingerprint()));
        info!("Created: {}", event.title);
        Ok(())
    }

    async fn call<T>(
        &self,
        call: impl std::future::Future<Output = Result<T, RemoteError>>,
    ) -> Result<T, RemoteError> {
        with_timeout(self.settings.request_timeout, call).await
    }
}
