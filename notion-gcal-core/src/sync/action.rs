use std::fmt;

use serde::{Deserialize, Serialize};

use crate::event::NormalizedEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    Create,
    Update,
    Delete,
}

impl ActionKind {
    pub fn symbol(&self) -> &'static str {
        match self {
            ActionKind::Create => "+",
            ActionKind::Update => "~",
            ActionKind::Delete => "-",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// One change to apply to the target calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SyncAction {
    Create {
        event: NormalizedEvent,
        /// Mapped target event that turned out to be gone
        replaces: Option<String>,
    },
    Update {
        target_id: String,
        event: NormalizedEvent,
    },
    Delete {
        source_id: String,
        target_id: String,
    },
}

impl SyncAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            SyncAction::Create { .. } => ActionKind::Create,
            SyncAction::Update { .. } => ActionKind::Update,
            SyncAction::Delete { .. } => ActionKind::Delete,
        }
    }

    pub fn source_id(&self) -> &str {
        match self {
            SyncAction::Create { event, .. } | SyncAction::Update { event, .. } => &event.source_id,
            SyncAction::Delete { source_id, .. } => source_id,
        }
    }

    pub fn event(&self) -> Option<&NormalizedEvent> {
        match self {
            SyncAction::Create { event, .. } | SyncAction::Update { event, .. } => Some(event),
            SyncAction::Delete { .. } => None,
        }
    }

    /// What to call this action in logs: the title when there is one.
    pub fn label(&self) -> &str {
        match self {
            SyncAction::Create { event, .. } | SyncAction::Update { event, .. } => &event.title,
            SyncAction::Delete { target_id, .. } => target_id,
        }
    }
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.label())
    }
}
