//! First-fatal-error slot
//!
//! Workers report fatal failures here; the first report wins and every later
//! one is counted and dropped. A run therefore surfaces one root cause.

use crate::job::JobError;
use crate::worker::WorkerId;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

/// A fatal failure together with where it happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerFailure {
    pub worker: WorkerId,
    pub job_id: u64,
    pub error: JobError,
}

/// Write-once-wins holder for the first fatal failure of a run
#[derive(Debug, Default)]
pub struct FailureSlot {
    first: OnceLock<WorkerFailure>,
    reports: AtomicUsize,
}

impl FailureSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure; returns true if this one was kept
    pub fn report(&self, failure: WorkerFailure) -> bool {
        self.reports.fetch_add(1, Ordering::SeqCst);
        self.first.set(failure).is_ok()
    }

    pub fn is_set(&self) -> bool {
        self.first.get().is_some()
    }

    pub fn first(&self) -> Option<&WorkerFailure> {
        self.first.get()
    }

    /// Reports that lost the race
    pub fn discarded(&self) -> usize {
        self.reports.load(Ordering::SeqCst).saturating_sub(1)
    }
}
