//! Child processes owned by builders.
//!
//! # Process Groups
//!
//! On Unix every child is started in its own process group, so teardown can
//! signal the whole tree the program spawned by sending to `-pid`.

use devkit_architect::Logger;
use std::collections::BTreeMap;
use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

/// Time a process gets to exit after SIGTERM before it is killed.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// What to start.
#[derive(Debug, Clone, Default)]
pub struct ProcessSpec<'a> {
    /// Program path or name.
    pub program: &'a str,
    /// Arguments.
    pub args: &'a [String],
    /// Working directory.
    pub cwd: Option<&'a Path>,
    /// Extra environment variables.
    pub env: Option<&'a BTreeMap<String, String>>,
}

/// A running child process with idempotent teardown.
#[derive(Debug)]
pub struct ManagedProcess {
    name: String,
    pid: Option<u32>,
    child: Option<Child>,
}

impl ManagedProcess {
    /// Spawn `spec`. Output lines are forwarded to `logger`: stdout at info,
    /// stderr at warn.
    ///
    /// # Errors
    ///
    /// Returns the spawn error.
    pub fn spawn(spec: &ProcessSpec<'_>, logger: &Logger) -> io::Result<Self> {
        let mut command = Command::new(spec.program);
        command
            .args(spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = spec.cwd {
            command.current_dir(cwd);
        }
        if let Some(env) = spec.env {
            command.envs(env);
        }
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn()?;
        let pid = child.id();
        debug!(program = spec.program, pid, "Spawned process");

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(stdout, logger.clone(), false));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(stderr, logger.clone(), true));
        }

        Ok(Self {
            name: spec.program.to_string(),
            pid,
            child: Some(child),
        })
    }

    /// Program name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// OS process id, while the process has not been reaped.
    #[must_use]
    pub fn id(&self) -> Option<u32> {
        self.child.as_ref().and(self.pid)
    }

    /// Whether the process is still tracked (not yet known to have exited).
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.child.is_some()
    }

    /// Wait for the process to exit on its own.
    ///
    /// # Errors
    ///
    /// Returns the wait error, or `NotFound` once the process was reaped.
    pub async fn wait(&mut self) -> io::Result<ExitStatus> {
        let child = self
            .child
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "process already reaped"))?;
        let status = child.wait().await?;
        self.child = None;
        Ok(status)
    }

    /// Stop the process: SIGTERM to its group, then a kill after `grace`.
    ///
    /// Safe to call any number of times. Each call re-signals a process that
    /// is still running; once the process has been reaped it does nothing.
    pub async fn teardown(&mut self, grace: Duration) {
        let Some(child) = self.child.as_mut() else {
            return;
        };

        if let Ok(Some(status)) = child.try_wait() {
            debug!(process = %self.name, %status, "Process already exited");
            // Descendants left in the group outlive the direct child.
            if let Some(pid) = self.pid {
                signal_group(pid, child, Signal::Term);
            }
            self.child = None;
            return;
        }

        if let Some(pid) = self.pid {
            debug!(process = %self.name, pid, "Sending SIGTERM to process group");
            signal_group(pid, child, Signal::Term);
        }

        match tokio::time::timeout(grace, child.wait()).await {
            Ok(Ok(_)) => {
                self.child = None;
            }
            Ok(Err(err)) => {
                warn!(process = %self.name, error = %err, "Failed to wait for process");
            }
            Err(_) => {
                warn!(process = %self.name, "Force killing process after timeout");
                if let Some(pid) = self.pid {
                    signal_group(pid, child, Signal::Kill);
                }
                if child.kill().await.is_ok() {
                    self.child = None;
                }
            }
        }
    }
}

async fn forward_lines<R>(reader: R, logger: Logger, stderr: bool)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if stderr {
            logger.warn(&line);
        } else {
            logger.info(&line);
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Signal {
    Term,
    Kill,
}

#[cfg(unix)]
fn signal_group(pid: u32, _child: &mut Child, signal: Signal) {
    let Ok(pid) = i32::try_from(pid) else {
        return;
    };
    let signal = match signal {
        Signal::Term => libc::SIGTERM,
        Signal::Kill => libc::SIGKILL,
    };
    // SAFETY: a negative pid addresses the process group created at spawn
    // time. The group may already be gone, in which case kill returns ESRCH.
    #[expect(unsafe_code, reason = "Required for POSIX signal handling")]
    unsafe {
        libc::kill(-pid, signal);
    }
}

#[cfg(not(unix))]
fn signal_group(_pid: u32, child: &mut Child, _signal: Signal) {
    let _ = child.start_kill();
}
