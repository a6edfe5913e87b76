//! Process launching and supervision.
//!
//! Spawns the configured command with its standard streams bound to the
//! established endpoints, waits for it to exit, and propagates its exit
//! code. An optional wall-clock deadline bounds the wait: on expiry the
//! child is sent SIGTERM, given a short grace period, then SIGKILL, and the
//! invocation fails with a timeout error. The deadline arms after endpoint
//! establishment, so it bounds process execution only.
//!
//! Two spawn modes exist and are kept distinct on purpose:
//!
//! - [`SpawnMode::Shell`] hands the whole command string to `/bin/sh -c`,
//!   so shell syntax (pipes, quoting, variables) works.
//! - [`SpawnMode::Direct`] tokenizes the string on whitespace and execs the
//!   argv without a shell. Known limitation: quoted arguments containing
//!   spaces are split; callers who need quoting use `Shell`.

use std::os::unix::process::ExitStatusExt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::constants::TERM_GRACE_PERIOD;
use crate::endpoint::EstablishedIo;
use crate::error::{Error, Result};
use crate::proxy;
use crate::redirect::StdioBindings;
use crate::spec::IoConfig;

// =============================================================================
// SpawnMode
// =============================================================================

/// How the command string becomes a process image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SpawnMode {
    /// Run through `/bin/sh -c`; the string may contain shell syntax.
    Shell { command: String },
    /// Exec a whitespace-tokenized argument vector, no shell involved.
    Direct { argv: Vec<String> },
}

impl SpawnMode {
    /// Shell-interpreted command.
    pub fn shell(command: impl Into<String>) -> Result<Self> {
        let command = command.into();
        if command.trim().is_empty() {
            return Err(Error::EmptyCommand);
        }
        Ok(Self::Shell { command })
    }

    /// Whitespace-tokenized direct exec.
    pub fn direct(command: &str) -> Result<Self> {
        let argv: Vec<String> = command.split_whitespace().map(str::to_string).collect();
        if argv.is_empty() {
            return Err(Error::EmptyCommand);
        }
        Ok(Self::Direct { argv })
    }

    fn command(&self) -> Command {
        match self {
            Self::Shell { command } => {
                let mut cmd = Command::new("/bin/sh");
                cmd.arg("-c").arg(command);
                cmd
            }
            Self::Direct { argv } => {
                let mut cmd = Command::new(&argv[0]);
                cmd.args(&argv[1..]);
                cmd
            }
        }
    }
}

// =============================================================================
// LaunchConfig
// =============================================================================

/// Everything one invocation needs: the command (absent for pure-proxy
/// mode), the endpoint arrangement, and the optional deadline.
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    /// Command to execute; `None` selects pure-proxy mode.
    pub command: Option<SpawnMode>,
    /// Endpoint arrangement.
    pub io: IoConfig,
    /// Wall-clock bound on process execution; `None` disables the guard.
    pub timeout: Option<Duration>,
}

// =============================================================================
// Invocation
// =============================================================================

/// A running child process under supervision.
pub struct Invocation {
    child: Child,
    pid: u32,
    started_at: DateTime<Utc>,
    deadline: Option<DateTime<Utc>>,
    timeout: Option<Duration>,
}

impl Invocation {
    /// Spawns the command with the given stream bindings and arms the
    /// deadline, if any.
    pub fn spawn(
        mode: &SpawnMode,
        bindings: StdioBindings,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut cmd = mode.command();
        bindings.apply(&mut cmd);

        let child = cmd.spawn().map_err(|source| Error::Spawn { source })?;
        let pid = child.id().unwrap_or(0);
        let started_at = Utc::now();
        let deadline = timeout.and_then(|t| {
            chrono::Duration::from_std(t)
                .ok()
                .map(|t| started_at + t)
        });

        info!(pid, started_at = %started_at, deadline = ?deadline, "command spawned");
        Ok(Self {
            child,
            pid,
            started_at,
            deadline,
            timeout,
        })
    }

    /// Process identifier of the child.
    #[must_use]
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// When the child was spawned.
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// When the guard will fire, if armed.
    #[must_use]
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    /// Waits for the child to exit and returns its exit code.
    ///
    /// If the deadline expires first the child is terminated and the wait
    /// fails with a timeout error. A child killed by a signal is an error,
    /// not an exit code.
    pub async fn wait(mut self) -> Result<i32> {
        let status = match self.timeout {
            Some(duration) => match tokio::time::timeout(duration, self.child.wait()).await {
                Ok(status) => status.map_err(|source| Error::Wait { source })?,
                Err(_) => {
                    warn!(pid = self.pid, ?duration, "deadline exceeded, terminating command");
                    self.terminate().await;
                    return Err(Error::Timeout { duration });
                }
            },
            None => self
                .child
                .wait()
                .await
                .map_err(|source| Error::Wait { source })?,
        };

        match status.code() {
            Some(code) => {
                info!(pid = self.pid, code, "command exited");
                Ok(code)
            }
            None => {
                let signal = status.signal().unwrap_or(0);
                Err(Error::Signaled { signal })
            }
        }
    }

    /// SIGTERM, grace period, then SIGKILL; always reaps the child.
    async fn terminate(&mut self) {
        if self.pid != 0 {
            // SAFETY: kill with a PID we spawned and have not yet reaped.
            unsafe {
                libc::kill(self.pid as i32, libc::SIGTERM);
            }
        }
        match tokio::time::timeout(TERM_GRACE_PERIOD, self.child.wait()).await {
            Ok(_) => debug!(pid = self.pid, "command exited on SIGTERM"),
            Err(_) => {
                warn!(pid = self.pid, "command survived grace period, sending SIGKILL");
                let _ = self.child.start_kill();
                let _ = self.child.wait().await;
            }
        }
    }
}

// =============================================================================
// Run
// =============================================================================

/// Runs one invocation to completion.
///
/// Establishes endpoints (input before output; both must succeed before
/// anything is spawned), binds redirections, then either supervises the
/// command or, with no command, drives the pure-proxy loop. Endpoint
/// descriptors are released on every exit path.
pub async fn run(config: LaunchConfig) -> Result<i32> {
    let io = EstablishedIo::establish(&config.io).await?;

    match config.command {
        Some(mode) => {
            let bindings = StdioBindings::bind(io)?;
            let invocation = Invocation::spawn(&mode, bindings, config.timeout)?;
            invocation.wait().await
        }
        None => {
            proxy::run(io).await?;
            Ok(0)
        }
    }
}
