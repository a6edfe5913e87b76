//! Endpoint spec parsing.
//!
//! Turns the tagged spec strings accepted on the command line into a
//! validated [`EndpointSpec`]. Parsing is pure construction: no socket is
//! created, no path is touched, and invalid combinations (a path on a TCP
//! spec, a client tag on `-i`) are unrepresentable or rejected here.
//!
//! # Tag Table
//!
//! | Tag     | Role   | Transport       | Payload            |
//! |---------|--------|-----------------|--------------------|
//! | `TCPS`  | server | TCP             | `<port>`           |
//! | `UDPS`  | server | UDP             | `<port>`           |
//! | `UDSSS` | server | Unix stream     | `<path>`           |
//! | `UDSSD` | server | Unix datagram   | `<path>`           |
//! | `TCPC`  | client | TCP             | `<host>,<port>`    |
//! | `UDPC`  | client | UDP             | `<host>,<port>`    |
//! | `UDSCS` | client | Unix stream     | `<path>`           |
//! | `UDSCD` | client | Unix datagram   | `<path>`           |

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::MAX_ENDPOINT_SPEC_LEN;
use crate::error::{Error, Result};

// =============================================================================
// TransportKind
// =============================================================================

/// Transport an endpoint runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// TCP stream socket.
    Tcp,
    /// UDP datagram socket.
    Udp,
    /// Unix-domain stream socket.
    UnixStream,
    /// Unix-domain datagram socket.
    UnixDatagram,
}

impl TransportKind {
    /// Returns true for connection-oriented transports (listen/accept or
    /// handshake-connect required).
    #[must_use]
    pub const fn is_stream(self) -> bool {
        matches!(self, Self::Tcp | Self::UnixStream)
    }

    /// Returns true for transports addressed by host and port rather than
    /// a filesystem path.
    #[must_use]
    pub const fn is_network(self) -> bool {
        matches!(self, Self::Tcp | Self::Udp)
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => write!(f, "tcp"),
            Self::Udp => write!(f, "udp"),
            Self::UnixStream => write!(f, "unix-stream"),
            Self::UnixDatagram => write!(f, "unix-datagram"),
        }
    }
}

// =============================================================================
// EndpointRole
// =============================================================================

/// Which side of the connection an endpoint takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointRole {
    /// Binds a local address and waits for a peer.
    Server,
    /// Resolves and connects to a remote peer.
    Client,
}

impl fmt::Display for EndpointRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Server => write!(f, "server"),
            Self::Client => write!(f, "client"),
        }
    }
}

// =============================================================================
// EndpointAddr
// =============================================================================

/// Address form of an endpoint.
///
/// Servers on network transports carry only a local port; clients carry a
/// remote host and port; Unix-domain endpoints carry a filesystem path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "form", rename_all = "snake_case")]
pub enum EndpointAddr {
    /// Local port to bind (network server).
    Port { port: u16 },
    /// Remote host and port to connect to (network client).
    HostPort { host: String, port: u16 },
    /// Filesystem path (Unix-domain, either role).
    Path { path: PathBuf },
}

impl fmt::Display for EndpointAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Port { port } => write!(f, ":{port}"),
            Self::HostPort { host, port } => write!(f, "{host}:{port}"),
            Self::Path { path } => write!(f, "{}", path.display()),
        }
    }
}

// =============================================================================
// EndpointSpec
// =============================================================================

/// A validated, not-yet-established endpoint description.
///
/// Immutable once parsed. Realized into a live descriptor by
/// [`Endpoint::establish`](crate::endpoint::Endpoint::establish).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointSpec {
    /// Server or client side.
    pub role: EndpointRole,
    /// Transport the endpoint runs over.
    pub kind: TransportKind,
    /// Local or remote address.
    pub addr: EndpointAddr,
}

impl EndpointSpec {
    /// Parses an input (server-role) spec: `TCPS<port>`, `UDPS<port>`,
    /// `UDSSS<path>`, or `UDSSD<path>`.
    pub fn parse_input(spec: &str) -> Result<Self> {
        check_len(spec)?;
        if let Some(rest) = spec.strip_prefix("UDSSS") {
            return Self::unix(EndpointRole::Server, TransportKind::UnixStream, spec, rest);
        }
        if let Some(rest) = spec.strip_prefix("UDSSD") {
            return Self::unix(EndpointRole::Server, TransportKind::UnixDatagram, spec, rest);
        }
        if let Some(rest) = spec.strip_prefix("TCPS") {
            return Self::network_server(TransportKind::Tcp, spec, rest);
        }
        if let Some(rest) = spec.strip_prefix("UDPS") {
            return Self::network_server(TransportKind::Udp, spec, rest);
        }
        Err(Error::UnknownEndpointTag(spec.to_string()))
    }

    /// Parses an output (client-role) spec: `TCPC<host>,<port>`,
    /// `UDPC<host>,<port>`, `UDSCS<path>`, or `UDSCD<path>`.
    pub fn parse_output(spec: &str) -> Result<Self> {
        check_len(spec)?;
        if let Some(rest) = spec.strip_prefix("UDSCS") {
            return Self::unix(EndpointRole::Client, TransportKind::UnixStream, spec, rest);
        }
        if let Some(rest) = spec.strip_prefix("UDSCD") {
            return Self::unix(EndpointRole::Client, TransportKind::UnixDatagram, spec, rest);
        }
        if let Some(rest) = spec.strip_prefix("TCPC") {
            return Self::network_client(TransportKind::Tcp, spec, rest);
        }
        if let Some(rest) = spec.strip_prefix("UDPC") {
            return Self::network_client(TransportKind::Udp, spec, rest);
        }
        Err(Error::UnknownEndpointTag(spec.to_string()))
    }

    /// Parses a bidirectional spec. Only `TCPS<port>` is accepted: a single
    /// accepted connection serves both directions, which needs a
    /// connection-oriented network transport.
    pub fn parse_bidirectional(spec: &str) -> Result<Self> {
        check_len(spec)?;
        match spec.strip_prefix("TCPS") {
            Some(rest) => Self::network_server(TransportKind::Tcp, spec, rest),
            None => Err(Error::InvalidEndpointSpec {
                spec: spec.to_string(),
                reason: "bidirectional mode requires a TCP server spec (TCPS<port>)",
            }),
        }
    }

    fn network_server(kind: TransportKind, spec: &str, rest: &str) -> Result<Self> {
        Ok(Self {
            role: EndpointRole::Server,
            kind,
            addr: EndpointAddr::Port {
                port: parse_port(spec, rest)?,
            },
        })
    }

    fn network_client(kind: TransportKind, spec: &str, rest: &str) -> Result<Self> {
        let (host, port) = rest.split_once(',').ok_or(Error::InvalidEndpointSpec {
            spec: spec.to_string(),
            reason: "expected <host>,<port>",
        })?;
        if host.is_empty() {
            return Err(Error::InvalidEndpointSpec {
                spec: spec.to_string(),
                reason: "host cannot be empty",
            });
        }
        Ok(Self {
            role: EndpointRole::Client,
            kind,
            addr: EndpointAddr::HostPort {
                host: host.to_string(),
                port: parse_port(spec, port)?,
            },
        })
    }

    fn unix(role: EndpointRole, kind: TransportKind, spec: &str, rest: &str) -> Result<Self> {
        if rest.is_empty() {
            return Err(Error::InvalidEndpointSpec {
                spec: spec.to_string(),
                reason: "socket path cannot be empty",
            });
        }
        Ok(Self {
            role,
            kind,
            addr: EndpointAddr::Path {
                path: PathBuf::from(rest),
            },
        })
    }
}

impl fmt::Display for EndpointSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.kind, self.role, self.addr)
    }
}

// =============================================================================
// IoConfig
// =============================================================================

/// Endpoint arrangement for one invocation.
///
/// A closed sum so that bidirectional mode structurally cannot carry two
/// specs: one shared descriptor serves both directions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum IoConfig {
    /// No endpoints; the child (or the pass-through loop) uses the
    /// launcher's own standard streams.
    Inherit,
    /// One server endpoint feeding standard input.
    Input { input: EndpointSpec },
    /// One client endpoint receiving standard output.
    Output { output: EndpointSpec },
    /// Distinct endpoints for each direction.
    Both {
        input: EndpointSpec,
        output: EndpointSpec,
    },
    /// One TCP server connection shared by both directions.
    Bidirectional { endpoint: EndpointSpec },
}

// =============================================================================
// Helpers
// =============================================================================

fn check_len(spec: &str) -> Result<()> {
    if spec.len() > MAX_ENDPOINT_SPEC_LEN {
        let head: String = spec.chars().take(32).collect();
        return Err(Error::InvalidEndpointSpec {
            spec: format!("{head}..."),
            reason: "spec exceeds maximum length",
        });
    }
    Ok(())
}

fn parse_port(spec: &str, s: &str) -> Result<u16> {
    let port: u16 = s.parse().map_err(|_| Error::InvalidEndpointSpec {
        spec: spec.to_string(),
        reason: "port must be a number between 1 and 65535",
    })?;
    if port == 0 {
        return Err(Error::InvalidEndpointSpec {
            spec: spec.to_string(),
            reason: "port 0 is not allowed",
        });
    }
    Ok(port)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input_tcp_server() {
        let spec = EndpointSpec::parse_input("TCPS9000").unwrap();
        assert_eq!(spec.role, EndpointRole::Server);
        assert_eq!(spec.kind, TransportKind::Tcp);
        assert_eq!(spec.addr, EndpointAddr::Port { port: 9000 });
    }

    #[test]
    fn test_parse_input_unix_tags_disambiguate() {
        let stream = EndpointSpec::parse_input("UDSSS/tmp/a.sock").unwrap();
        assert_eq!(stream.kind, TransportKind::UnixStream);
        let dgram = EndpointSpec::parse_input("UDSSD/tmp/a.sock").unwrap();
        assert_eq!(dgram.kind, TransportKind::UnixDatagram);
    }

    #[test]
    fn test_parse_output_client_host_port() {
        let spec = EndpointSpec::parse_output("TCPC127.0.0.1,8080").unwrap();
        assert_eq!(spec.role, EndpointRole::Client);
        assert_eq!(
            spec.addr,
            EndpointAddr::HostPort {
                host: "127.0.0.1".to_string(),
                port: 8080
            }
        );
    }

    #[test]
    fn test_parse_rejects_client_tag_on_input() {
        assert!(EndpointSpec::parse_input("TCPC127.0.0.1,8080").is_err());
    }

    #[test]
    fn test_parse_rejects_missing_comma() {
        let err = EndpointSpec::parse_output("UDPC127.0.0.1").unwrap_err();
        assert_eq!(err.category(), crate::ErrorCategory::Config);
    }

    #[test]
    fn test_parse_rejects_non_numeric_port() {
        assert!(EndpointSpec::parse_input("TCPSabc").is_err());
        assert!(EndpointSpec::parse_input("UDPS90000000").is_err());
        assert!(EndpointSpec::parse_input("UDPS0").is_err());
    }

    #[test]
    fn test_parse_bidirectional_tcp_server_only() {
        assert!(EndpointSpec::parse_bidirectional("TCPS7777").is_ok());
        assert!(EndpointSpec::parse_bidirectional("UDPS7777").is_err());
        assert!(EndpointSpec::parse_bidirectional("UDSSS/tmp/b.sock").is_err());
    }
}
