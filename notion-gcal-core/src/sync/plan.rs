//! Diffing normalized events against the mapping store.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::event::{NormalizedEvent, TargetEvent};
use crate::mapping::MappingStore;
use crate::sync::{ActionKind, SyncAction};

/// What is known about mapped target events.
///
/// Ids that were never looked up are unknown; the plan then trusts the
/// stored fingerprint alone.
#[derive(Debug, Clone, Default)]
pub struct TargetSnapshot {
    events: HashMap<String, Option<TargetEvent>>,
}

enum TargetState<'a> {
    Unknown,
    Missing,
    Present(&'a TargetEvent),
}

impl TargetSnapshot {
    /// Record the lookup result for `target_id` (`None` when it is gone).
    pub fn record(&mut self, target_id: impl Into<String>, event: Option<TargetEvent>) {
        self.events.insert(target_id.into(), event);
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn state(&self, target_id: &str) -> TargetState<'_> {
        match self.events.get(target_id) {
            None => TargetState::Unknown,
            Some(None) => TargetState::Missing,
            Some(Some(event)) => TargetState::Present(event),
        }
    }
}

/// Ordered list of actions: creates, then updates, then deletes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncPlan {
    pub actions: Vec<SyncAction>,
}

impl SyncPlan {
    pub fn compute(
        events: &[NormalizedEvent],
        mapping: &MappingStore,
        snapshot: &TargetSnapshot,
    ) -> Self {
        let mut creates = Vec::new();
        let mut updates = Vec::new();
        let mut deletes = Vec::new();

        for event in events {
            let Some(entry) = mapping.get(&event.source_id) else {
                creates.push(SyncAction::Create {
                    event: event.clone(),
                    replaces: None,
                });
                continue;
            };

            let target_id = entry.target_id.clone();

            match snapshot.state(&entry.target_id) {
                TargetState::Missing => creates.push(SyncAction::Create {
                    event: event.clone(),
                    replaces: Some(target_id),
                }),
                TargetState::Present(target) if !target.matches(event) => {
                    updates.push(SyncAction::Update {
                        target_id,
                        event: event.clone(),
                    })
                }
                _ if entry.event_hash != event.fingerprint() => updates.push(SyncAction::Update {
                    target_id,
                    event: event.clone(),
                }),
                _ => {}
            }
        }

        let current: HashSet<&str> = events.iter().map(|e| e.source_id.as_str()).collect();
        for (source_id, entry) in mapping.entries() {
            if !current.contains(source_id.as_str()) {
                deletes.push(SyncAction::Delete {
                    source_id: source_id.clone(),
                    target_id: entry.target_id.clone(),
                });
            }
        }

        let by_start = |a: &SyncAction, b: &SyncAction| match (a.event(), b.event()) {
            (Some(x), Some(y)) => (x.start.to_utc(), &x.source_id).cmp(&(y.start.to_utc(), &y.source_id)),
            _ => a.source_id().cmp(b.source_id()),
        };
        creates.sort_by(by_start);
        updates.sort_by(by_start);
        deletes.sort_by(|a, b| a.source_id().cmp(b.source_id()));

        let mut actions = creates;
        actions.extend(updates);
        actions.extend(deletes);

        SyncPlan { actions }
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn count(&self, kind: ActionKind) -> usize {
        self.actions.iter().filter(|a| a.kind() == kind).count()
    }

    /// (created, updated, deleted)
    pub fn counts(&self) -> (usize, usize, usize) {
        (
            self.count(ActionKind::Create),
            self.count(ActionKind::Update),
            self.count(ActionKind::Delete),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventTime;
    use crate::mapping::MappingEntry;
    use chrono::NaiveDate;

    fn event(id: &str, day: u32) -> NormalizedEvent {
        NormalizedEvent {
            source_id: id.to_string(),
            title: format!("‣ {id}"),
            start: EventTime::Date(NaiveDate::from_ymd_opt(2024, 6, day).unwrap()),
            end: EventTime::Date(NaiveDate::from_ymd_opt(2024, 6, day + 1).unwrap()),
            description: String::new(),
        }
    }

    fn mapped(entries: &[(&str, &str, String)]) -> MappingStore {
        let mut store = MappingStore::empty("unused.json");
        for (source, target, hash) in entries {
            store.put(*source, MappingEntry::new(*target, hash.clone()));
        }
        store
    }

    #[test]
    fn test_unmapped_events_are_created_in_start_order() {
        let plan = SyncPlan::compute(
            &[event("late", 20), event("early", 2)],
            &MappingStore::empty("unused.json"),
            &TargetSnapshot::default(),
        );

        let ids: Vec<_> = plan.actions.iter().map(|a| a.source_id()).collect();
        assert_eq!(ids, vec!["early", "late"]);
        assert_eq!(plan.counts(), (2, 0, 0));
    }

    #[test]
    fn test_unchanged_mapped_event_needs_nothing() {
        let a = event("a", 1);
        let store = mapped(&[("a", "g-a", a.fingerprint())]);

        let plan = SyncPlan::compute(&[a], &store, &TargetSnapshot::default());

        assert!(plan.is_empty());
    }

    #[test]
    fn test_changed_fingerprint_updates_mapped_target() {
        let store = mapped(&[("a", "g-a", "old-hash".to_string())]);

        let plan = SyncPlan::compute(&[event("a", 1)], &store, &TargetSnapshot::default());

        assert_eq!(plan.counts(), (0, 1, 0));
        assert!(matches!(
            &plan.actions[0],
            SyncAction::Update { target_id, .. } if target_id == "g-a"
        ));
    }

    #[test]
    fn test_creates_and_updates_come_before_deletes() {
        let b = event("b", 2);
        let store = mapped(&[
            ("gone", "g-gone", "h".to_string()),
            ("b", "g-b", "stale".to_string()),
        ]);

        let plan = SyncPlan::compute(&[b, event("new", 3)], &store, &TargetSnapshot::default());

        let kinds: Vec<_> = plan.actions.iter().map(|a| a.kind()).collect();
        assert_eq!(kinds, vec![ActionKind::Create, ActionKind::Update, ActionKind::Delete]);
    }

    #[test]
    fn test_snapshot_missing_target_is_recreated() {
        let a = event("a", 1);
        let store = mapped(&[("a", "g-a", a.fingerprint())]);
        let mut snapshot = TargetSnapshot::default();
        snapshot.record("g-a", None);

        let plan = SyncPlan::compute(&[a], &store, &snapshot);

        assert_eq!(plan.counts(), (1, 0, 0));
        assert!(matches!(
            &plan.actions[0],
            SyncAction::Create { replaces: Some(old), .. } if old == "g-a"
        ));
    }

    #[test]
    fn test_snapshot_drift_forces_update_despite_matching_hash() {
        let a = event("a", 1);
        let store = mapped(&[("a", "g-a", a.fingerprint())]);
        let mut snapshot = TargetSnapshot::default();
        snapshot.record(
            "g-a",
            Some(TargetEvent {
                id: "g-a".to_string(),
                title: "edited by hand".to_string(),
                start: a.start.clone(),
                end: a.end.clone(),
                description: String::new(),
            }),
        );

        let plan = SyncPlan::compute(&[a], &store, &snapshot);

        assert_eq!(plan.counts(), (0, 1, 0));
    }
}
