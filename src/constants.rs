//! Launcher constants.
//!
//! Defines the bounds and timeouts used across endpoint establishment,
//! stream proxying, and child termination. These constants are the single
//! source of truth for every limit enforced by the crate.

use std::time::Duration;

// =============================================================================
// Socket Parameters
// =============================================================================

/// Listen backlog for stream server endpoints.
///
/// **Rationale**: Each invocation serves exactly one connection per
/// endpoint; a backlog of 1 is sufficient and keeps late connectors
/// queued in the kernel rather than refused while the accept is pending.
pub const LISTEN_BACKLOG: u32 = 1;

/// Buffer size for pure-proxy copy loops (8 KiB).
///
/// **Rationale**: Large enough to carry a full datagram or a pipe burst in
/// one read, small enough to keep the launcher's footprint negligible.
pub const PROXY_BUF_SIZE: usize = 8192;

// =============================================================================
// Input Bounds
// =============================================================================

/// Maximum endpoint spec string length in bytes.
///
/// **Security**: Bounds parser input. Hostnames and socket paths fit well
/// within this; anything longer is malformed or hostile.
pub const MAX_ENDPOINT_SPEC_LEN: usize = 512;

/// Maximum command string length in bytes.
///
/// **Security**: Bounds the argument handed to the shell. Matches the
/// common per-argument limit on Linux.
pub const MAX_COMMAND_LEN: usize = 4096;

// =============================================================================
// Timeouts
// =============================================================================

/// Grace period between SIGTERM and SIGKILL when the deadline expires.
///
/// **Rationale**: Gives the child a moment to flush and exit cleanly.
/// Short, because the caller asked for forcible termination.
pub const TERM_GRACE_PERIOD: Duration = Duration::from_secs(2);
