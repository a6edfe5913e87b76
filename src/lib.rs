//! # sockrun
//!
//! **Socket-Wired Process Launcher**
//!
//! Runs a command with its standard streams bound to network or
//! Unix-domain endpoints. An endpoint is either a server (bind and wait
//! for one peer) or a client (resolve and connect), over TCP, UDP, or
//! Unix-domain stream/datagram sockets. With no command, the launcher
//! proxies bytes between its own standard streams and the endpoints.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                           sockrun                              │
//! ├────────────────────────────────────────────────────────────────┤
//! │  config     -e/-i/-o/-b/-t  →  LaunchConfig                    │
//! │     │                                                          │
//! │  spec       tag strings  →  EndpointSpec (pure, no I/O)        │
//! │     │                                                          │
//! │  endpoint   bind/listen/accept | resolve/connect  →  OwnedFd   │
//! │     │                                                          │
//! │  redirect   endpoints  →  child stdin/stdout/stderr slots      │
//! │     │                                                          │
//! │  launch     spawn → deadline-bounded wait → exit code          │
//! │     │                                                          │
//! │  proxy      no command: blocking copy loops, no subprocess     │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Lifecycle
//!
//! ```text
//! parse args → establish input endpoint → establish output endpoint
//!            → bind redirections → spawn → wait (deadline-bounded)
//!            → propagate exit code → descriptors released
//! ```
//!
//! Endpoints are established strictly in input-then-output order, and both
//! must succeed before anything is spawned. Every descriptor is owned by
//! exactly one value at a time and is closed exactly once on every exit
//! path, including errors raised between the two establishment steps.
//!
//! # Example
//!
//! ```rust,ignore
//! use sockrun::{EndpointSpec, IoConfig, LaunchConfig, SpawnMode};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> sockrun::Result<()> {
//!     // Serve one TCP connection on :9000 and feed it to `wc -l`'s stdin.
//!     let config = LaunchConfig {
//!         command: Some(SpawnMode::shell("wc -l")?),
//!         io: IoConfig::Input {
//!             input: EndpointSpec::parse_input("TCPS9000")?,
//!         },
//!         timeout: None,
//!     };
//!     let code = sockrun::run(config).await?;
//!     std::process::exit(code);
//! }
//! ```

pub mod config;
pub mod constants;
pub mod endpoint;
pub mod error;
pub mod launch;
pub mod proxy;
pub mod redirect;
pub mod spec;

// Re-exports
pub use endpoint::{Endpoint, EstablishedIo};
pub use error::{Error, ErrorCategory, Result};
pub use launch::{Invocation, LaunchConfig, SpawnMode, run};
pub use redirect::StdioBindings;
pub use spec::{EndpointAddr, EndpointRole, EndpointSpec, IoConfig, TransportKind};
