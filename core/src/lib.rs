//! Bleeding Core
//!
//! The attack orchestrator shared by every flood mode: an immutable target
//! descriptor, the job abstraction with its transient/fatal error taxonomy,
//! the retrying worker loop and the supervising worker pool.

pub mod job;
pub mod logger;
pub mod pool;
pub mod shutdown;
pub mod slot;
pub mod target;
pub mod worker;

pub use job::{AttemptContext, AttemptReport, Job, JobError};
pub use logger::{Logger, SharedBuffer};
pub use pool::{PoolConfig, PoolError, PoolReport, StopReason, WorkerPool, MAX_WORKERS};
pub use slot::{FailureSlot, WorkerFailure};
pub use target::{Protocol, Target, TargetError, MAX_PAYLOAD_SIZE};
pub use worker::{WorkerExit, WorkerId, WorkerSummary};

/// Timing parameters for the orchestrator
pub mod timing {
    /// How often the supervisor re-checks its stop conditions
    pub const POLL_INTERVAL_MS: u64 = 1000;

    /// Pause between two attempts of the same worker
    pub const COOLDOWN_MS: u64 = 1000;

    /// Upper bound for a single connect+send attempt
    pub const ATTEMPT_TIMEOUT_MS: u64 = 10_000;

    /// Time workers get to wind down before they are aborted
    pub const TEARDOWN_GRACE_MS: u64 = 3000;
}
