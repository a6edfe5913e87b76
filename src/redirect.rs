//! Redirection binding.
//!
//! Maps established endpoints onto the standard-stream slots of the child
//! process. Binding consumes the endpoints: ownership of each descriptor
//! moves into a [`Stdio`] slot, is handed to the child at spawn, and the
//! launcher's copy is closed once the spawn completes. The launcher's own
//! streams are never touched; slots left unset are inherited.
//!
//! Policy:
//! - input endpoint → stdin; stdout and stderr inherited
//! - output endpoint → stdout; stdin and stderr inherited
//! - both → stdin and stdout from distinct descriptors; stderr inherited
//! - bidirectional → one shared connection duplicated onto stdin, stdout,
//!   and stderr, so diagnostics reach the peer over the same connection

use std::process::Stdio;

use tracing::debug;

use crate::endpoint::{Endpoint, EstablishedIo};
use crate::error::Result;

/// Standard-stream slots prepared for a child process.
///
/// `None` means the slot is inherited from the launcher.
#[derive(Debug, Default)]
pub struct StdioBindings {
    /// Slot for the child's standard input.
    pub stdin: Option<Stdio>,
    /// Slot for the child's standard output.
    pub stdout: Option<Stdio>,
    /// Slot for the child's standard error.
    pub stderr: Option<Stdio>,
}

impl StdioBindings {
    /// All streams inherited (pass-through).
    #[must_use]
    pub fn inherit() -> Self {
        Self::default()
    }

    /// Standard input from an endpoint.
    #[must_use]
    pub fn input(endpoint: Endpoint) -> Self {
        Self {
            stdin: Some(endpoint.into_stdio()),
            ..Self::default()
        }
    }

    /// Standard output to an endpoint.
    #[must_use]
    pub fn output(endpoint: Endpoint) -> Self {
        Self {
            stdout: Some(endpoint.into_stdio()),
            ..Self::default()
        }
    }

    /// Standard input and output from distinct endpoints.
    #[must_use]
    pub fn both(input: Endpoint, output: Endpoint) -> Self {
        Self {
            stdin: Some(input.into_stdio()),
            stdout: Some(output.into_stdio()),
            stderr: None,
        }
    }

    /// All three streams share one connection.
    pub fn bidirectional(endpoint: Endpoint) -> Result<Self> {
        let stdin = endpoint.try_clone_stdio()?;
        let stderr = endpoint.try_clone_stdio()?;
        Ok(Self {
            stdin: Some(stdin),
            stdout: Some(endpoint.into_stdio()),
            stderr: Some(stderr),
        })
    }

    /// Builds bindings from an established arrangement.
    pub fn bind(io: EstablishedIo) -> Result<Self> {
        match io {
            EstablishedIo::Inherit => Ok(Self::inherit()),
            EstablishedIo::Input(endpoint) => Ok(Self::input(endpoint)),
            EstablishedIo::Output(endpoint) => Ok(Self::output(endpoint)),
            EstablishedIo::Both { input, output } => Ok(Self::both(input, output)),
            EstablishedIo::Bidirectional(endpoint) => Self::bidirectional(endpoint),
        }
    }

    /// Applies the bindings to a command before spawn.
    pub fn apply(self, cmd: &mut tokio::process::Command) {
        debug!(
            stdin = self.stdin.is_some(),
            stdout = self.stdout.is_some(),
            stderr = self.stderr.is_some(),
            "applying stream redirections"
        );
        if let Some(stdin) = self.stdin {
            cmd.stdin(stdin);
        }
        if let Some(stdout) = self.stdout {
            cmd.stdout(stdout);
        }
        if let Some(stderr) = self.stderr {
            cmd.stderr(stderr);
        }
    }
}
