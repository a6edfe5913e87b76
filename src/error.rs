//! Error types for the launcher.

use std::time::Duration;

/// Result type alias for launcher operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure category an [`Error`] belongs to.
///
/// Every error is terminal for the invocation; the category tells callers
/// which stage failed without matching on individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed or missing arguments, caught before any resource is touched.
    Config,
    /// Socket, bind, listen, accept, connect, or resolve failure during
    /// endpoint establishment, or a broken proxy stream.
    Resource,
    /// Spawn failure or abnormal child termination.
    Process,
    /// Wall-clock deadline exceeded.
    Timeout,
}

/// Errors that can occur while configuring or running an invocation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Endpoint spec string with an unrecognized prefix tag.
    #[error("unrecognized endpoint spec '{0}'")]
    UnknownEndpointTag(String),

    /// Endpoint spec string that parsed a known tag but carried bad fields.
    #[error("invalid endpoint spec '{spec}': {reason}")]
    InvalidEndpointSpec { spec: String, reason: &'static str },

    /// Command-line flag without its required value.
    #[error("flag {flag} requires a value")]
    MissingValue { flag: &'static str },

    /// Argument that is not a recognized flag.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Empty command string.
    #[error("command cannot be empty")]
    EmptyCommand,

    // =========================================================================
    // Resource Errors
    // =========================================================================
    /// Socket system operation failed during endpoint establishment.
    #[error("{operation} failed: {source}")]
    Socket {
        operation: &'static str,
        source: std::io::Error,
    },

    /// Hostname did not resolve to any address.
    #[error("unknown host: {host}")]
    UnknownHost { host: String },

    /// Byte copy between a standard stream and an endpoint failed.
    #[error("proxy copy failed: {source}")]
    Copy { source: std::io::Error },

    // =========================================================================
    // Process Errors
    // =========================================================================
    /// Child process could not be spawned.
    #[error("failed to spawn command: {source}")]
    Spawn { source: std::io::Error },

    /// Waiting on the child failed.
    #[error("wait for child failed: {source}")]
    Wait { source: std::io::Error },

    /// Child terminated abnormally (by signal, not a normal exit).
    #[error("command terminated by signal {signal}")]
    Signaled { signal: i32 },

    /// Internal error (should not happen).
    #[error("internal error: {0}")]
    Internal(String),

    // =========================================================================
    // Timeout Errors
    // =========================================================================
    /// Wall-clock deadline exceeded; the child has been terminated.
    #[error("timed out after {duration:?}")]
    Timeout { duration: Duration },
}

impl Error {
    /// Returns the failure category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnknownEndpointTag(_)
            | Self::InvalidEndpointSpec { .. }
            | Self::MissingValue { .. }
            | Self::InvalidArgument(_)
            | Self::EmptyCommand => ErrorCategory::Config,
            Self::Socket { .. } | Self::UnknownHost { .. } | Self::Copy { .. } => {
                ErrorCategory::Resource
            }
            Self::Spawn { .. } | Self::Wait { .. } | Self::Signaled { .. } | Self::Internal(_) => {
                ErrorCategory::Process
            }
            Self::Timeout { .. } => ErrorCategory::Timeout,
        }
    }
}
