//! Worker loop: retry the job forever until stopped or fatally failed

use crate::job::{AttemptContext, Job, JobError};
use crate::logger::Logger;
use crate::shutdown::Shutdown;
use crate::slot::{FailureSlot, WorkerFailure};
use crate::target::Target;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::debug;

/// Identity of a worker inside its pool, used only for labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(usize);

impl WorkerId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Worker-{:02}", self.0)
    }
}

/// How a worker ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// Observed the shutdown signal while still looping
    Stopped,
    /// Hit a fatal job error and reported it
    Fatal,
    /// Missed the teardown grace period and was aborted
    Aborted,
    /// The job panicked
    Panicked,
}

/// Final per-worker numbers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSummary {
    pub id: WorkerId,
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub bytes_sent: u64,
    pub exit: WorkerExit,
}

/// Counters updated by the worker and read by the supervisor
#[derive(Debug, Default)]
pub(crate) struct WorkerStats {
    attempts: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    bytes_sent: AtomicU64,
}

impl WorkerStats {
    fn begin_attempt(&self) {
        self.attempts.fetch_add(1, Ordering::SeqCst);
    }

    fn record_success(&self, bytes: usize) {
        self.successes.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// True once the first attempt has begun
    pub(crate) fn has_started(&self) -> bool {
        self.attempts.load(Ordering::SeqCst) > 0
    }

    pub(crate) fn summary(&self, id: WorkerId, exit: WorkerExit) -> WorkerSummary {
        WorkerSummary {
            id,
            attempts: self.attempts.load(Ordering::SeqCst),
            successes: self.successes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            exit,
        }
    }
}

/// Loop timing
#[derive(Debug, Clone, Copy)]
pub(crate) struct WorkerSettings {
    pub cooldown: Duration,
    pub attempt_timeout: Duration,
}

/// State shared by all workers of one run
pub(crate) struct Shared {
    pub job: Arc<dyn Job>,
    pub target: Arc<Target>,
    pub failures: Arc<FailureSlot>,
    pub logger: Logger,
    pub settings: WorkerSettings,
}

pub(crate) struct Worker {
    id: WorkerId,
    shared: Arc<Shared>,
    stats: Arc<WorkerStats>,
    shutdown: Shutdown,
}

impl Worker {
    pub(crate) fn new(
        id: WorkerId,
        shared: Arc<Shared>,
        stats: Arc<WorkerStats>,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            id,
            shared,
            stats,
            shutdown,
        }
    }

    pub(crate) async fn run(mut self) -> WorkerExit {
        let mut job_id: u64 = 0;

        loop {
            if self.shutdown.is_triggered() {
                return WorkerExit::Stopped;
            }

            self.stats.begin_attempt();
            let logger = &self.shared.logger;
            let target = &self.shared.target;
            let ctx = AttemptContext::new(self.id, job_id, logger);
            let attempt_timeout = self.shared.settings.attempt_timeout;

            let outcome = tokio::select! {
                biased;
                _ = self.shutdown.triggered() => return WorkerExit::Stopped,
                result = timeout(attempt_timeout, self.shared.job.attempt(target, &ctx)) => {
                    result.unwrap_or_else(|_| {
                        Err(JobError::transient(format!(
                            "attempt timed out after {}s",
                            attempt_timeout.as_secs_f32()
                        )))
                    })
                }
            };

            match outcome {
                Ok(report) => {
                    self.stats.record_success(report.bytes_sent);
                    ctx.info(format!(
                        "Delivered {} to {}",
                        logger.good(format!("{} bytes", report.bytes_sent)),
                        logger.good(target.address())
                    ));
                }
                Err(err) if err.is_fatal() => {
                    self.stats.record_failure();
                    ctx.err(logger.bad(format!(
                        "Fatal error against {}: {}",
                        target.address(),
                        err
                    )));
                    let kept = self.shared.failures.report(WorkerFailure {
                        worker: self.id,
                        job_id,
                        error: err,
                    });
                    debug!(worker = %self.id, job_id, kept, "worker stopped on fatal error");
                    return WorkerExit::Fatal;
                }
                Err(err) => {
                    self.stats.record_failure();
                    ctx.err(logger.bad(format!(
                        "Failed to reach {}: {}",
                        target.address(),
                        err
                    )));
                }
            }

            job_id += 1;

            tokio::select! {
                biased;
                _ = self.shutdown.triggered() => return WorkerExit::Stopped,
                _ = sleep(self.shared.settings.cooldown) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::AttemptReport;
    use crate::shutdown;
    use crate::target::Protocol;
    use async_trait::async_trait;

    struct Always(Result<AttemptReport, JobError>);

    #[async_trait]
    impl Job for Always {
        fn name(&self) -> &'static str {
            "always"
        }

        async fn attempt(
            &self,
            _target: &Target,
            _ctx: &AttemptContext<'_>,
        ) -> Result<AttemptReport, JobError> {
            self.0.clone()
        }
    }

    struct Hang;

    #[async_trait]
    impl Job for Hang {
        fn name(&self) -> &'static str {
            "hang"
        }

        async fn attempt(
            &self,
            _target: &Target,
            _ctx: &AttemptContext<'_>,
        ) -> Result<AttemptReport, JobError> {
            std::future::pending().await
        }
    }

    fn shared(job: impl Job) -> (Arc<Shared>, crate::logger::SharedBuffer) {
        let (logger, buffer) = Logger::buffered(true);
        let shared = Shared {
            job: Arc::new(job),
            target: Arc::new(
                Target::new("00:11:22:33:44:55", 1, Protocol::Stream, 8).unwrap(),
            ),
            failures: Arc::new(FailureSlot::new()),
            logger,
            settings: WorkerSettings {
                cooldown: Duration::from_secs(1),
                attempt_timeout: Duration::from_secs(10),
            },
        };
        (Arc::new(shared), buffer)
    }

    #[test]
    fn test_worker_id_display() {
        assert_eq!(WorkerId::new(0).to_string(), "Worker-00");
        assert_eq!(WorkerId::new(7).to_string(), "Worker-07");
        assert_eq!(WorkerId::new(123).to_string(), "Worker-123");
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_retry_until_stopped() {
        let (shared, buffer) = shared(Always(Err(JobError::transient("refused"))));
        let stats = Arc::new(WorkerStats::default());
        let (trigger, signal) = shutdown::channel();
        let worker = Worker::new(WorkerId::new(0), shared.clone(), stats.clone(), signal);
        let handle = tokio::spawn(worker.run());

        sleep(Duration::from_millis(4500)).await;
        trigger.trigger();

        assert_eq!(handle.await.unwrap(), WorkerExit::Stopped);
        let summary = stats.summary(WorkerId::new(0), WorkerExit::Stopped);
        assert_eq!(summary.attempts, 5);
        assert_eq!(summary.failures, 5);
        assert!(!shared.failures.is_set());
        assert!(buffer.contents().contains("[Worker-00 | Job-4]"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_error_ends_worker() {
        let (shared, buffer) = shared(Always(Err(JobError::fatal("no adapter"))));
        let stats = Arc::new(WorkerStats::default());
        let (_trigger, signal) = shutdown::channel();
        let worker = Worker::new(WorkerId::new(2), shared.clone(), stats.clone(), signal);

        assert_eq!(worker.run().await, WorkerExit::Fatal);
        assert_eq!(stats.summary(WorkerId::new(2), WorkerExit::Fatal).attempts, 1);

        let failure = shared.failures.first().unwrap();
        assert_eq!(failure.worker, WorkerId::new(2));
        assert_eq!(failure.error, JobError::fatal("no adapter"));
        assert!(buffer.contents().contains("Fatal error against 00:11:22:33:44:55: no adapter"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_counts_bytes() {
        let (shared, _buffer) = shared(Always(Ok(AttemptReport::sent(8))));
        let stats = Arc::new(WorkerStats::default());
        let (trigger, signal) = shutdown::channel();
        let handle = tokio::spawn(Worker::new(WorkerId::new(1), shared, stats.clone(), signal).run());

        sleep(Duration::from_millis(2500)).await;
        trigger.trigger();
        handle.await.unwrap();

        let summary = stats.summary(WorkerId::new(1), WorkerExit::Stopped);
        assert_eq!(summary.successes, 3);
        assert_eq!(summary.bytes_sent, 24);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_attempt_times_out_as_transient() {
        let (shared, buffer) = shared(Hang);
        let stats = Arc::new(WorkerStats::default());
        let (trigger, signal) = shutdown::channel();
        let handle = tokio::spawn(Worker::new(WorkerId::new(0), shared, stats.clone(), signal).run());

        sleep(Duration::from_millis(10_500)).await;
        assert!(buffer.contents().contains("attempt timed out after 10s"));
        assert!(stats.has_started());

        trigger.trigger();
        assert_eq!(handle.await.unwrap(), WorkerExit::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_interrupts_attempt() {
        let (shared, _buffer) = shared(Hang);
        let stats = Arc::new(WorkerStats::default());
        let (trigger, signal) = shutdown::channel();
        let handle = tokio::spawn(Worker::new(WorkerId::new(0), shared, stats, signal).run());

        sleep(Duration::from_millis(100)).await;
        trigger.trigger();

        let exit = tokio::time::timeout(Duration::from_millis(10), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(exit, WorkerExit::Stopped);
    }
}
