//! Refuses mass deletions that look like an upstream outage.

use tracing::warn;

pub const DEFAULT_SAFETY_THRESHOLD: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyVerdict {
    Proceed,
    Abort { source_records: usize, mapped: usize },
}

#[derive(Debug, Clone, Copy)]
pub struct SafetyGuard {
    threshold: usize,
}

impl Default for SafetyGuard {
    fn default() -> Self {
        SafetyGuard {
            threshold: DEFAULT_SAFETY_THRESHOLD,
        }
    }
}

impl SafetyGuard {
    pub fn new(threshold: usize) -> Self {
        SafetyGuard { threshold }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// An empty source with more than `threshold` mapped events is treated
    /// as a failed fetch, not as the user deleting everything.
    pub fn check(&self, source_records: usize, mapped: usize, force: bool) -> SafetyVerdict {
        if source_records > 0 || mapped <= self.threshold {
            return SafetyVerdict::Proceed;
        }

        if force {
            warn!(mapped, "Source is empty, deleting every mapped event (forced)");
            return SafetyVerdict::Proceed;
        }

        SafetyVerdict::Abort {
            source_records,
            mapped,
        }
    }
}
