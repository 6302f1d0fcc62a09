//! Bounded-lifetime child process.

use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// How a child process run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    Success,
    /// Ran but failed, or was killed after the time limit.
    ExitFailure { code: Option<i32>, stderr: String },
    /// The executable does not exist or may not be executed.
    NotFound,
}

/// A child process with fixed arguments, a working directory and a time limit.
///
/// The child is killed if it outlives the limit or if the future is dropped.
#[derive(Debug, Clone)]
pub struct BoundedProcess {
    program: PathBuf,
    args: Vec<OsString>,
    cwd: PathBuf,
    timeout: Duration,
}

impl BoundedProcess {
    pub fn new(program: impl Into<PathBuf>, cwd: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
            timeout,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Spawn, wait, and classify. Spawn errors other than not-found/permission are
    /// returned as `Err`.
    pub async fn run(&self) -> io::Result<ProcessOutcome> {
        let child = match Command::new(&self.program)
            .args(&self.args)
            .current_dir(&self.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied
                ) =>
            {
                tracing::debug!(program = %self.program.display(), error = %e, "Executable not available");
                return Ok(ProcessOutcome::NotFound);
            }
            Err(e) => return Err(e),
        };

        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) if output.status.success() => Ok(ProcessOutcome::Success),
            Ok(Ok(output)) => Ok(ProcessOutcome::ExitFailure {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }),
            Ok(Err(e)) => Err(e),
            Err(_) => {
                // Dropping the wait future drops the child, which kills it.
                tracing::warn!(
                    program = %self.program.display(),
                    timeout_secs = self.timeout.as_secs(),
                    "Process exceeded time limit"
                );
                Ok(ProcessOutcome::ExitFailure {
                    code: None,
                    stderr: format!("timed out after {}s", self.timeout.as_secs()),
                })
            }
        }
    }
}
