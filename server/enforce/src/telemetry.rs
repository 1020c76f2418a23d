use metrics::counter;

use crate::model::{DispatchOutcome, Mutation};

/// Why an event produced no requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    Unresolvable,
    PermissionDenied,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Unresolvable => "unresolvable",
            SkipReason::PermissionDenied => "permission_denied",
        }
    }
}

#[derive(Clone, Debug)]
pub struct EnforceMetrics {
    ns: String,
}

impl EnforceMetrics {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self { ns: namespace.into() }
    }

    pub fn events(&self, n: u64) {
        counter!(format!("{}_enforce_events_total", self.ns)).increment(n);
    }

    pub fn skipped(&self, reason: SkipReason) {
        counter!(format!("{}_enforce_skipped_total", self.ns), "reason" => reason.as_str()).increment(1);
    }

    pub fn dispatched(&self, mutation: Mutation) {
        counter!(format!("{}_enforce_dispatched_total", self.ns), "mutation" => mutation.as_str()).increment(1);
    }

    pub fn outcome(&self, outcome: &DispatchOutcome) {
        counter!(format!("{}_enforce_outcome_total", self.ns), "outcome" => outcome.as_str()).increment(1);
    }
}

impl Default for EnforceMetrics {
    fn default() -> Self {
        Self::new("vp")
    }
}
