//! Worker pool orchestrator
//!
//! Spawns a fixed number of workers against one target and supervises them
//! as a group. The supervisor wakes every poll interval and stops the run on,
//! in priority order:
//! - cancellation (the caller's future completed),
//! - the optional deadline,
//! - the first fatal error reported by any worker, or a worker that died
//!   without reporting one (a panicking job).
//!
//! Teardown signals every worker, waits up to a shared grace deadline and
//! aborts whatever is still running.

use crate::job::{Job, JobError};
use crate::logger::Logger;
use crate::shutdown::{self, ShutdownTrigger};
use crate::slot::{FailureSlot, WorkerFailure};
use crate::target::Target;
use crate::timing;
use crate::worker::{Shared, Worker, WorkerExit, WorkerId, WorkerSettings, WorkerStats, WorkerSummary};
use std::fmt;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

/// Upper bound on workers per pool
pub const MAX_WORKERS: usize = 1024;

/// Errors raised before any worker is spawned
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("Worker pool needs at least one worker")]
    NoWorkers,

    #[error("Too many workers: {requested} (max: {limit})")]
    TooManyWorkers { requested: usize, limit: usize },
}

/// Number of workers used when none is requested: one per virtual core
pub fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Configuration for a pool run
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of concurrent workers
    pub threads: usize,
    /// Overall attack duration; `None` runs until cancelled or failed
    pub timeout: Option<Duration>,
    /// Supervisor wake-up interval
    pub poll_interval: Duration,
    /// Pause between two attempts of one worker
    pub cooldown: Duration,
    /// Bound on a single attempt, unrelated to `timeout`
    pub attempt_timeout: Duration,
    /// Time workers get to stop before being aborted
    pub teardown_grace: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            timeout: None,
            poll_interval: Duration::from_millis(timing::POLL_INTERVAL_MS),
            cooldown: Duration::from_millis(timing::COOLDOWN_MS),
            attempt_timeout: Duration::from_millis(timing::ATTEMPT_TIMEOUT_MS),
            teardown_grace: Duration::from_millis(timing::TEARDOWN_GRACE_MS),
        }
    }
}

impl PoolConfig {
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Set the overall duration; a zero duration means no deadline
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout.filter(|t| !t.is_zero());
        self
    }

    /// Convert a duration given in seconds; zero or negative means no deadline
    pub fn timeout_from_secs(secs: Option<i64>) -> Option<Duration> {
        secs.filter(|s| *s > 0)
            .map(|s| Duration::from_secs(s as u64))
    }
}

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    TimedOut,
    Cancelled,
    Failed,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::TimedOut => write!(f, "timeout reached"),
            StopReason::Cancelled => write!(f, "cancelled"),
            StopReason::Failed => write!(f, "fatal error"),
        }
    }
}

/// Result of a pool run
#[derive(Debug, Clone)]
pub struct PoolReport {
    pub reason: StopReason,
    /// The first fatal failure; later ones are only counted
    pub failure: Option<WorkerFailure>,
    pub discarded_failures: usize,
    pub elapsed: Duration,
    pub workers: Vec<WorkerSummary>,
    /// The deadline the run was configured with
    pub deadline: Option<Duration>,
}

impl PoolReport {
    /// Timeout and cancellation are normal endings. A fatal stop is only
    /// abnormal when the run was meant to last forever.
    pub fn is_success(&self) -> bool {
        match self.reason {
            StopReason::TimedOut | StopReason::Cancelled => true,
            StopReason::Failed => self.deadline.is_some(),
        }
    }

    pub fn total_attempts(&self) -> u64 {
        self.workers.iter().map(|w| w.attempts).sum()
    }

    pub fn total_bytes_sent(&self) -> u64 {
        self.workers.iter().map(|w| w.bytes_sent).sum()
    }
}

struct WorkerHandle {
    id: WorkerId,
    stats: Arc<WorkerStats>,
    handle: JoinHandle<WorkerExit>,
}

/// Supervises a fixed set of workers running one job against one target
#[derive(Debug)]
pub struct WorkerPool {
    config: PoolConfig,
    logger: Logger,
}

impl WorkerPool {
    pub fn new(config: PoolConfig, logger: Logger) -> Result<Self, PoolError> {
        if config.threads == 0 {
            return Err(PoolError::NoWorkers);
        }
        if config.threads > MAX_WORKERS {
            return Err(PoolError::TooManyWorkers {
                requested: config.threads,
                limit: MAX_WORKERS,
            });
        }
        Ok(Self { config, logger })
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Run `job` against `target` until a stop condition fires
    ///
    /// `cancel` completing is treated as a user interrupt.
    pub async fn run<J, F>(&self, job: J, target: Target, cancel: F) -> PoolReport
    where
        J: Job,
        F: Future<Output = ()>,
    {
        let logger = &self.logger;
        let start = Instant::now();

        logger.info("");
        logger.info(format!(
            "Starting thread pool with {} workers running {}...",
            logger.accent(self.config.threads),
            logger.accent(job.name())
        ));
        if let Some(limit) = self.config.timeout {
            logger.info(format!(
                "Attack will run for {} seconds...",
                logger.accent(limit.as_secs_f32())
            ));
        }

        let failures = Arc::new(FailureSlot::new());
        let shared = Arc::new(Shared {
            job: Arc::new(job),
            target: Arc::new(target),
            failures: failures.clone(),
            logger: logger.clone(),
            settings: WorkerSettings {
                cooldown: self.config.cooldown,
                attempt_timeout: self.config.attempt_timeout,
            },
        });

        let (trigger, signal) = shutdown::channel();
        let workers: Vec<WorkerHandle> = (0..self.config.threads)
            .map(|index| {
                let id = WorkerId::new(index);
                let stats = Arc::new(WorkerStats::default());
                let worker = Worker::new(id, shared.clone(), stats.clone(), signal.clone());
                WorkerHandle {
                    id,
                    stats,
                    handle: tokio::spawn(worker.run()),
                }
            })
            .collect();
        debug!(workers = workers.len(), "worker pool started");

        let reason = self.supervise(&workers, &failures, start, cancel).await;
        match reason {
            StopReason::TimedOut => logger.info(logger.good(format!(
                "Timeout reached ({}s). Stopping attack...",
                start.elapsed().as_secs()
            ))),
            StopReason::Cancelled => logger.info(logger.notice("Interrupted by user...")),
            StopReason::Failed => {}
        }

        let summaries = self.teardown(trigger, workers).await;

        let failure = failures.first().cloned();
        if let Some(ref failure) = failure {
            logger.err(format!(
                "Thread pool throws an exception: {} {}",
                logger.bad(&failure.error),
                logger.dim(format!("({} | Job-{})", failure.worker, failure.job_id))
            ));
        }
        if failures.discarded() > 0 {
            debug!(discarded = failures.discarded(), "later fatal errors dropped");
        }

        PoolReport {
            reason,
            failure,
            discarded_failures: failures.discarded(),
            elapsed: start.elapsed(),
            workers: summaries,
            deadline: self.config.timeout,
        }
    }

    async fn supervise<F>(
        &self,
        workers: &[WorkerHandle],
        failures: &FailureSlot,
        start: Instant,
        cancel: F,
    ) -> StopReason
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(cancel);
        let mut ticker = interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = &mut cancel => return StopReason::Cancelled,
                _ = ticker.tick() => {
                    // Every worker gets its first attempt before the run may end
                    if !workers.iter().all(|w| w.stats.has_started()) {
                        continue;
                    }
                    if let Some(limit) = self.config.timeout {
                        if start.elapsed() >= limit {
                            return StopReason::TimedOut;
                        }
                    }
                    if failures.is_set() {
                        return StopReason::Failed;
                    }
                    // A worker only ends on its own after reporting; anything else panicked
                    if let Some(dead) = workers.iter().find(|w| w.handle.is_finished()) {
                        warn!(worker = %dead.id, "worker exited without reporting a fatal error");
                        failures.report(WorkerFailure {
                            worker: dead.id,
                            job_id: dead.stats.attempts().saturating_sub(1),
                            error: JobError::fatal(format!("{} panicked", dead.id)),
                        });
                        return StopReason::Failed;
                    }
                }
            }
        }
    }

    async fn teardown(&self, trigger: ShutdownTrigger, workers: Vec<WorkerHandle>) -> Vec<WorkerSummary> {
        self.logger.info("Stopping threads...");
        trigger.trigger();

        let grace = self.config.teardown_grace;
        let deadline = Instant::now() + grace;
        let mut summaries = Vec::with_capacity(workers.len());

        for WorkerHandle { id, stats, mut handle } in workers {
            let exit = match timeout_at(deadline, &mut handle).await {
                Ok(Ok(exit)) => exit,
                Ok(Err(err)) if err.is_panic() => {
                    warn!(worker = %id, "worker panicked: {}", err);
                    WorkerExit::Panicked
                }
                Ok(Err(_)) => WorkerExit::Aborted,
                Err(_) => {
                    // Stuck in a blocking call; it is dropped at its next yield
                    handle.abort();
                    self.logger.warn(format!(
                        "{} did not stop within {}s, aborting",
                        id,
                        grace.as_secs_f32()
                    ));
                    WorkerExit::Aborted
                }
            };
            debug!(worker = %id, ?exit, "worker joined");
            summaries.push(stats.summary(id, exit));
        }

        summaries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{AttemptContext, AttemptReport};
    use crate::target::Protocol;
    use async_trait::async_trait;
    use regex::Regex;
    use std::future::{pending, ready};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Succeed;

    #[async_trait]
    impl Job for Succeed {
        fn name(&self) -> &'static str {
            "succeed"
        }

        async fn attempt(
            &self,
            target: &Target,
            _ctx: &AttemptContext<'_>,
        ) -> Result<AttemptReport, JobError> {
            Ok(AttemptReport::sent(target.payload_size()))
        }
    }

    struct Refused;

    #[async_trait]
    impl Job for Refused {
        fn name(&self) -> &'static str {
            "refused"
        }

        async fn attempt(
            &self,
            _target: &Target,
            _ctx: &AttemptContext<'_>,
        ) -> Result<AttemptReport, JobError> {
            Err(JobError::transient("connection refused"))
        }
    }

    struct Broken;

    #[async_trait]
    impl Job for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn attempt(
            &self,
            _target: &Target,
            ctx: &AttemptContext<'_>,
        ) -> Result<AttemptReport, JobError> {
            Err(JobError::fatal(format!("socket refused for {}", ctx.worker())))
        }
    }

    /// Fails fatally on the n-th call across all workers
    struct FatalOnCall {
        n: usize,
        calls: AtomicUsize,
    }

    impl FatalOnCall {
        fn new(n: usize) -> Self {
            Self {
                n,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Job for FatalOnCall {
        fn name(&self) -> &'static str {
            "fatal-on-call"
        }

        async fn attempt(
            &self,
            _target: &Target,
            _ctx: &AttemptContext<'_>,
        ) -> Result<AttemptReport, JobError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call == self.n {
                Err(JobError::fatal("resource exhausted"))
            } else {
                Ok(AttemptReport::sent(1))
            }
        }
    }

    /// Fails fatally on each worker's third attempt
    struct FatalOnThirdJob;

    #[async_trait]
    impl Job for FatalOnThirdJob {
        fn name(&self) -> &'static str {
            "fatal-on-third-job"
        }

        async fn attempt(
            &self,
            _target: &Target,
            ctx: &AttemptContext<'_>,
        ) -> Result<AttemptReport, JobError> {
            if ctx.job_id() == 2 {
                Err(JobError::fatal("resource exhausted"))
            } else {
                Ok(AttemptReport::sent(1))
            }
        }
    }

    /// Panics on worker 0, succeeds everywhere else
    struct PanicOnFirstWorker;

    #[async_trait]
    impl Job for PanicOnFirstWorker {
        fn name(&self) -> &'static str {
            "panic-on-first-worker"
        }

        async fn attempt(
            &self,
            _target: &Target,
            ctx: &AttemptContext<'_>,
        ) -> Result<AttemptReport, JobError> {
            if ctx.worker().index() == 0 {
                panic!("job blew up");
            }
            Ok(AttemptReport::sent(1))
        }
    }

    struct Chatty;

    #[async_trait]
    impl Job for Chatty {
        fn name(&self) -> &'static str {
            "chatty"
        }

        async fn attempt(
            &self,
            _target: &Target,
            ctx: &AttemptContext<'_>,
        ) -> Result<AttemptReport, JobError> {
            ctx.info(format!("payload {} end", "x".repeat(256)));
            tokio::task::yield_now().await;
            ctx.info(format!("payload {} end", "x".repeat(256)));
            Ok(AttemptReport::default())
        }
    }

    /// Blocks its runtime thread, ignoring the shutdown signal
    struct Blocking;

    #[async_trait]
    impl Job for Blocking {
        fn name(&self) -> &'static str {
            "blocking"
        }

        async fn attempt(
            &self,
            _target: &Target,
            _ctx: &AttemptContext<'_>,
        ) -> Result<AttemptReport, JobError> {
            std::thread::sleep(Duration::from_millis(400));
            tokio::task::yield_now().await;
            Ok(AttemptReport::default())
        }
    }

    fn target() -> Target {
        Target::new("00:11:22:33:44:55", 0x1001, Protocol::ConnectionOriented, 16).unwrap()
    }

    fn config(threads: usize, timeout_secs: Option<u64>) -> PoolConfig {
        PoolConfig::default()
            .with_threads(threads)
            .with_timeout(timeout_secs.map(Duration::from_secs))
    }

    fn count_lines(lines: &[String], needle: &str) -> usize {
        lines.iter().filter(|l| l.contains(needle)).count()
    }

    #[test]
    fn test_rejects_invalid_thread_counts() {
        let (logger, _) = Logger::buffered(true);
        assert_eq!(
            WorkerPool::new(config(0, None), logger.clone()).unwrap_err(),
            PoolError::NoWorkers
        );
        assert_eq!(
            WorkerPool::new(config(MAX_WORKERS + 1, None), logger.clone()).unwrap_err(),
            PoolError::TooManyWorkers {
                requested: MAX_WORKERS + 1,
                limit: MAX_WORKERS
            }
        );
        assert!(WorkerPool::new(config(MAX_WORKERS, None), logger).is_ok());
    }

    #[test]
    fn test_timeout_normalization() {
        assert_eq!(PoolConfig::default().with_timeout(Some(Duration::ZERO)).timeout, None);
        assert_eq!(PoolConfig::timeout_from_secs(Some(0)), None);
        assert_eq!(PoolConfig::timeout_from_secs(Some(-5)), None);
        assert_eq!(PoolConfig::timeout_from_secs(None), None);
        assert_eq!(
            PoolConfig::timeout_from_secs(Some(60)),
            Some(Duration::from_secs(60))
        );
    }

    #[test]
    fn test_default_config() {
        let config = PoolConfig::default();
        assert!(config.threads >= 1);
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.cooldown, Duration::from_secs(1));
        assert_eq!(config.attempt_timeout, Duration::from_secs(10));
        assert!(config.timeout.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn scenario_a_successful_workers_run_until_deadline() {
        let (logger, buffer) = Logger::buffered(true);
        let pool = WorkerPool::new(config(3, Some(3)), logger).unwrap();

        let report = pool.run(Succeed, target(), pending()).await;

        assert_eq!(report.reason, StopReason::TimedOut);
        assert!(report.is_success());
        assert!(report.elapsed >= Duration::from_secs(3));
        assert!(report.elapsed <= Duration::from_secs(4));
        assert!(report.failure.is_none());

        let ids: Vec<usize> = report.workers.iter().map(|w| w.id.index()).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        for worker in &report.workers {
            assert!(worker.successes >= 2, "{:?}", worker);
            assert_eq!(worker.bytes_sent, worker.successes * 16);
            assert_eq!(worker.exit, WorkerExit::Stopped);
        }
        assert!(buffer.contents().contains("Timeout reached (3s)"));
    }

    #[tokio::test(start_paused = true)]
    async fn scenario_b_transient_failures_never_stop_workers() {
        let (logger, _buffer) = Logger::buffered(true);
        let pool = WorkerPool::new(config(2, Some(2)), logger).unwrap();

        let report = pool.run(Refused, target(), pending()).await;

        assert_eq!(report.reason, StopReason::TimedOut);
        assert!(report.is_success());
        assert!(report.failure.is_none());
        assert!(report.elapsed <= Duration::from_secs(3));
        for worker in &report.workers {
            // Still looping when the pool tore it down
            assert_eq!(worker.exit, WorkerExit::Stopped);
            assert!(worker.attempts >= 2);
            assert_eq!(worker.successes, 0);
            assert_eq!(worker.failures, worker.attempts);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn scenario_c_fatal_error_without_timeout_fails() {
        let (logger, buffer) = Logger::buffered(true);
        let pool = WorkerPool::new(config(4, None), logger).unwrap();

        let report = pool.run(FatalOnCall::new(3), target(), pending()).await;

        assert_eq!(report.reason, StopReason::Failed);
        assert!(!report.is_success());
        assert!(report.elapsed <= Duration::from_secs(2));

        let failure = report.failure.as_ref().unwrap();
        assert_eq!(failure.error, JobError::fatal("resource exhausted"));
        assert_eq!(report.discarded_failures, 0);

        let fatal_workers: Vec<_> = report
            .workers
            .iter()
            .filter(|w| w.exit == WorkerExit::Fatal)
            .collect();
        assert_eq!(fatal_workers.len(), 1);
        assert_eq!(fatal_workers[0].id, failure.worker);

        let lines = buffer.lines();
        assert_eq!(count_lines(&lines, "Thread pool throws an exception"), 1);
        assert_eq!(count_lines(&lines, "Fatal error against"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn scenario_c_per_worker_third_call_surfaces_one_error() {
        let (logger, buffer) = Logger::buffered(true);
        let pool = WorkerPool::new(config(4, None), logger).unwrap();

        let report = pool.run(FatalOnThirdJob, target(), pending()).await;

        assert_eq!(report.reason, StopReason::Failed);
        assert!(!report.is_success());
        assert!(report.elapsed <= Duration::from_secs(3));

        let failure = report.failure.as_ref().unwrap();
        assert_eq!(failure.job_id, 2);
        assert_eq!(failure.error, JobError::fatal("resource exhausted"));

        let fatal_workers = report
            .workers
            .iter()
            .filter(|w| w.exit == WorkerExit::Fatal)
            .count();
        assert!(fatal_workers >= 1);
        assert_eq!(report.discarded_failures, fatal_workers - 1);
        assert_eq!(
            count_lines(&buffer.lines(), "Thread pool throws an exception"),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_worker_stops_the_run() {
        let (logger, buffer) = Logger::buffered(true);
        let pool = WorkerPool::new(config(2, None), logger).unwrap();

        let cancel = tokio::time::sleep(Duration::from_secs(30));
        let report = pool.run(PanicOnFirstWorker, target(), cancel).await;

        assert_eq!(report.reason, StopReason::Failed);
        assert!(!report.is_success());
        assert!(report.elapsed <= pool.config().poll_interval + Duration::from_millis(10));

        let failure = report.failure.as_ref().unwrap();
        assert_eq!(failure.worker, WorkerId::new(0));
        assert!(failure.error.is_fatal());
        assert_eq!(failure.error.message(), "Worker-00 panicked");

        assert_eq!(report.workers[0].exit, WorkerExit::Panicked);
        assert_eq!(report.workers[1].exit, WorkerExit::Stopped);
        assert_eq!(
            count_lines(&buffer.lines(), "Thread pool throws an exception: Worker-00 panicked"),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_worker_attempts_before_stop() {
        let (logger, _buffer) = Logger::buffered(true);
        let pool = WorkerPool::new(config(6, None), logger).unwrap();

        let report = pool.run(FatalOnCall::new(1), target(), pending()).await;

        assert_eq!(report.workers.len(), 6);
        for worker in &report.workers {
            assert!(worker.attempts >= 1, "{:?}", worker);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_short_circuit_within_one_poll() {
        let (logger, _buffer) = Logger::buffered(true);
        let pool = WorkerPool::new(config(3, None), logger).unwrap();

        let report = pool.run(Broken, target(), pending()).await;

        assert_eq!(report.reason, StopReason::Failed);
        assert!(!report.is_success());
        assert!(report.elapsed <= pool.config().poll_interval + Duration::from_millis(10));
        assert!(report.workers.iter().all(|w| w.exit == WorkerExit::Fatal));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_fatal_errors_surface_exactly_one() {
        let (logger, buffer) = Logger::buffered(true);
        let pool = WorkerPool::new(config(8, None), logger).unwrap();

        let report = pool.run(Broken, target(), pending()).await;

        assert!(report.failure.is_some());
        assert_eq!(report.discarded_failures, 7);
        assert_eq!(count_lines(&buffer.lines(), "Thread pool throws an exception"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_error_with_deadline_is_not_a_failure_exit() {
        let (logger, _buffer) = Logger::buffered(true);
        let pool = WorkerPool::new(config(1, Some(60)), logger).unwrap();

        let report = pool.run(Broken, target(), pending()).await;

        assert_eq!(report.reason, StopReason::Failed);
        assert!(report.failure.is_some());
        assert!(report.is_success());
        assert!(report.elapsed < Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_without_timeout_succeeds() {
        let (logger, buffer) = Logger::buffered(true);
        let pool = WorkerPool::new(config(2, None), logger).unwrap();

        let cancel = tokio::time::sleep(Duration::from_millis(2500));
        let report = pool.run(Succeed, target(), cancel).await;

        assert_eq!(report.reason, StopReason::Cancelled);
        assert!(report.is_success());
        assert!(report.elapsed >= Duration::from_millis(2500));
        assert!(report.elapsed < Duration::from_secs(3));
        assert!(buffer.contents().contains("Interrupted by user..."));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_takes_priority_over_failures() {
        let (logger, _buffer) = Logger::buffered(true);
        let pool = WorkerPool::new(config(2, None), logger).unwrap();

        let report = pool.run(Broken, target(), ready(())).await;

        assert_eq!(report.reason, StopReason::Cancelled);
        assert!(report.is_success());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_log_lines_stay_whole() {
        let (logger, buffer) = Logger::buffered(true);
        let config = PoolConfig {
            threads: 4,
            timeout: Some(Duration::from_millis(300)),
            poll_interval: Duration::from_millis(20),
            cooldown: Duration::from_millis(1),
            attempt_timeout: Duration::from_secs(1),
            teardown_grace: Duration::from_secs(1),
        };
        let pool = WorkerPool::new(config, logger).unwrap();

        let report = pool.run(Chatty, target(), pending()).await;
        assert_eq!(report.reason, StopReason::TimedOut);

        let record = Regex::new(r"^(INFO|WARN|ERR) .+$").unwrap();
        let payload =
            Regex::new(r"^INFO  \[Worker-0[0-3] \| Job-\d+\]    payload x{256} end$").unwrap();

        let lines = buffer.lines();
        let mut payload_lines = 0;
        for line in &lines {
            assert!(record.is_match(line), "malformed line: {line}");
            if line.contains("payload") {
                assert!(payload.is_match(line), "corrupted line: {line}");
                payload_lines += 1;
            }
        }
        assert!(payload_lines >= 8);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stuck_worker_is_aborted() {
        let (logger, buffer) = Logger::buffered(true);
        let config = PoolConfig {
            threads: 1,
            timeout: Some(Duration::from_millis(50)),
            poll_interval: Duration::from_millis(10),
            cooldown: Duration::from_millis(10),
            attempt_timeout: Duration::from_secs(5),
            teardown_grace: Duration::from_millis(50),
        };
        let pool = WorkerPool::new(config, logger).unwrap();

        let report = pool.run(Blocking, target(), pending()).await;

        assert_eq!(report.reason, StopReason::TimedOut);
        assert_eq!(report.workers[0].exit, WorkerExit::Aborted);
        assert!(report.elapsed < Duration::from_millis(400));
        assert!(buffer.contents().contains("Worker-00 did not stop within"));
    }
}
