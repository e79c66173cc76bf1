//! Job abstraction: one connect+send attempt against the target

use crate::logger::Logger;
use crate::target::Target;
use crate::worker::WorkerId;
use async_trait::async_trait;
use std::fmt;
use std::io;
use thiserror::Error;

/// Failure of a single attempt, classified by whether retrying can help
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    /// Refused, timed out, link lost: the worker retries after its cool-down
    #[error("{0}")]
    Transient(String),

    /// Missing capability, malformed target, permission or resource failure:
    /// the worker stops and reports to the pool
    #[error("{0}")]
    Fatal(String),
}

impl JobError {
    pub fn transient(message: impl fmt::Display) -> Self {
        Self::Transient(message.to_string())
    }

    pub fn fatal(message: impl fmt::Display) -> Self {
        Self::Fatal(message.to_string())
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Transient(message) | Self::Fatal(message) => message,
        }
    }

    /// Classify a socket error
    pub fn from_io(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied
            | io::ErrorKind::Unsupported
            | io::ErrorKind::InvalidInput
            | io::ErrorKind::AddrNotAvailable
            | io::ErrorKind::OutOfMemory => Self::fatal(err),
            _ => Self::transient(err),
        }
    }
}

impl From<io::Error> for JobError {
    fn from(err: io::Error) -> Self {
        Self::from_io(err)
    }
}

/// What a successful attempt achieved
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttemptReport {
    pub bytes_sent: usize,
}

impl AttemptReport {
    pub fn sent(bytes_sent: usize) -> Self {
        Self { bytes_sent }
    }
}

/// Per-attempt context handed to a job
#[derive(Debug, Clone, Copy)]
pub struct AttemptContext<'a> {
    worker: WorkerId,
    job_id: u64,
    logger: &'a Logger,
}

impl<'a> AttemptContext<'a> {
    pub fn new(worker: WorkerId, job_id: u64, logger: &'a Logger) -> Self {
        Self {
            worker,
            job_id,
            logger,
        }
    }

    pub fn worker(&self) -> WorkerId {
        self.worker
    }

    pub fn job_id(&self) -> u64 {
        self.job_id
    }

    pub fn logger(&self) -> &'a Logger {
        self.logger
    }

    /// `[Worker-NN | Job-N]`
    pub fn tag(&self) -> String {
        format!("[{} | Job-{}]", self.worker, self.job_id)
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.logger.info(self.prefixed(message.as_ref()));
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        self.logger.warn(self.prefixed(message.as_ref()));
    }

    pub fn err(&self, message: impl AsRef<str>) {
        self.logger.err(self.prefixed(message.as_ref()));
    }

    fn prefixed(&self, message: &str) -> String {
        format!(" {}    {}", self.logger.dim(self.tag()), message)
    }
}

/// A unit of attack work, run repeatedly by every worker of the pool
#[async_trait]
pub trait Job: Send + Sync + 'static {
    /// Short label used in pool logs
    fn name(&self) -> &'static str;

    /// Connect to the target, send one payload, close
    async fn attempt(
        &self,
        target: &Target,
        ctx: &AttemptContext<'_>,
    ) -> Result<AttemptReport, JobError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_classification() {
        let refused = io::Error::from(io::ErrorKind::ConnectionRefused);
        assert!(!JobError::from_io(refused).is_fatal());

        let timed_out = io::Error::from(io::ErrorKind::TimedOut);
        assert!(!JobError::from_io(timed_out).is_fatal());

        let reset = io::Error::from(io::ErrorKind::ConnectionReset);
        assert!(!JobError::from(reset).is_fatal());

        let denied = io::Error::from(io::ErrorKind::PermissionDenied);
        assert!(JobError::from_io(denied).is_fatal());

        let unsupported = io::Error::from(io::ErrorKind::Unsupported);
        assert!(JobError::from_io(unsupported).is_fatal());
    }

    #[test]
    fn test_context_tag() {
        let (logger, buffer) = Logger::buffered(true);
        let ctx = AttemptContext::new(WorkerId::new(3), 7, &logger);
        assert_eq!(ctx.tag(), "[Worker-03 | Job-7]");

        ctx.info("Connecting");
        assert_eq!(buffer.lines(), vec!["INFO  [Worker-03 | Job-7]    Connecting"]);
    }

    #[test]
    fn test_error_message() {
        let err = JobError::fatal("adapter gone");
        assert_eq!(err.message(), "adapter gone");
        assert_eq!(err.to_string(), "adapter gone");
    }
}
