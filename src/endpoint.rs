//! Endpoint establishment.
//!
//! Realizes an [`EndpointSpec`] into a live [`Endpoint`] owning exactly one
//! descriptor. Server specs bind, listen (for stream transports), and accept
//! a single peer; client specs resolve and connect. For stream servers the
//! descriptor handed back is the accepted connection, never the listening
//! socket: the listener is dropped the moment the peer arrives.
//!
//! Every failure here is fatal to the invocation. The error names the
//! system operation that failed (`socket`, `bind`, `listen`, `accept`,
//! `connect`); there is no retry.
//!
//! The descriptor is converted back to blocking mode before it is stored,
//! because its next owner is either a child process's standard stream slot
//! or a blocking copy loop.

use std::net::SocketAddr;
use std::os::fd::OwnedFd;
use std::path::Path;
use std::process::Stdio;

use tokio::net::{TcpSocket, TcpStream, UdpSocket, UnixDatagram, UnixStream, lookup_host};
use tracing::{debug, info};

use crate::constants::LISTEN_BACKLOG;
use crate::error::{Error, Result};
use crate::spec::{EndpointAddr, EndpointRole, EndpointSpec, IoConfig, TransportKind};

// =============================================================================
// Endpoint
// =============================================================================

/// A fully-established communication descriptor.
///
/// Owns its descriptor uniquely until handed to the redirection binder or a
/// proxy loop; dropping an `Endpoint` on any path, including errors raised
/// before the child is spawned, closes the descriptor exactly once.
#[derive(Debug)]
pub struct Endpoint {
    fd: OwnedFd,
    spec: EndpointSpec,
}

impl Endpoint {
    /// Establishes the endpoint described by `spec`.
    ///
    /// Server stream endpoints block until a peer connects; client
    /// endpoints block until the connect completes. Datagram endpoints
    /// are ready as soon as the socket is bound or aimed at its peer.
    pub async fn establish(spec: &EndpointSpec) -> Result<Self> {
        let fd = match spec.role {
            EndpointRole::Server => establish_server(spec).await?,
            EndpointRole::Client => establish_client(spec).await?,
        };
        info!(endpoint = %spec, "endpoint established");
        Ok(Self {
            fd,
            spec: spec.clone(),
        })
    }

    /// Returns the spec this endpoint was established from.
    #[must_use]
    pub fn spec(&self) -> &EndpointSpec {
        &self.spec
    }

    /// Consumes the endpoint, yielding a standard-stream slot for a child.
    #[must_use]
    pub fn into_stdio(self) -> Stdio {
        Stdio::from(self.fd)
    }

    /// Duplicates the descriptor into an additional standard-stream slot,
    /// leaving the endpoint intact. Used when one connection serves more
    /// than one stream.
    pub fn try_clone_stdio(&self) -> Result<Stdio> {
        let fd = self.fd.try_clone().map_err(|source| Error::Socket {
            operation: "dup",
            source,
        })?;
        Ok(Stdio::from(fd))
    }

    /// Consumes the endpoint, yielding the raw owned descriptor. Used by
    /// the pure-proxy copy loops.
    #[must_use]
    pub fn into_fd(self) -> OwnedFd {
        self.fd
    }

    /// Duplicates the raw descriptor, leaving the endpoint intact.
    pub fn try_clone_fd(&self) -> Result<OwnedFd> {
        self.fd.try_clone().map_err(|source| Error::Socket {
            operation: "dup",
            source,
        })
    }
}

// =============================================================================
// Server Establishment
// =============================================================================

async fn establish_server(spec: &EndpointSpec) -> Result<OwnedFd> {
    match (spec.kind, &spec.addr) {
        (TransportKind::Tcp, EndpointAddr::Port { port }) => tcp_server(*port).await,
        (TransportKind::Udp, EndpointAddr::Port { port }) => udp_server(*port).await,
        (TransportKind::UnixStream, EndpointAddr::Path { path }) => unix_stream_server(path).await,
        (TransportKind::UnixDatagram, EndpointAddr::Path { path }) => unix_datagram_server(path),
        _ => Err(Error::Internal(format!(
            "address form does not match transport: {spec}"
        ))),
    }
}

async fn tcp_server(port: u16) -> Result<OwnedFd> {
    let socket = TcpSocket::new_v4().map_err(sock_err("socket"))?;
    socket.set_reuseaddr(true).map_err(sock_err("setsockopt"))?;
    socket
        .bind(SocketAddr::from(([0, 0, 0, 0], port)))
        .map_err(sock_err("bind"))?;
    let listener = socket.listen(LISTEN_BACKLOG).map_err(sock_err("listen"))?;

    debug!(port, "tcp server endpoint waiting for connection");
    let (stream, peer) = listener.accept().await.map_err(sock_err("accept"))?;
    // One connection per invocation: stop listening as soon as it arrives.
    drop(listener);
    debug!(port, peer = %peer, "tcp server endpoint accepted connection");

    tcp_stream_fd(stream)
}

async fn udp_server(port: u16) -> Result<OwnedFd> {
    let socket = UdpSocket::bind(SocketAddr::from(([0, 0, 0, 0], port)))
        .await
        .map_err(sock_err("bind"))?;
    debug!(port, "udp server endpoint bound");

    let socket = socket.into_std().map_err(sock_err("socket"))?;
    socket.set_nonblocking(false).map_err(sock_err("socket"))?;
    Ok(OwnedFd::from(socket))
}

async fn unix_stream_server(path: &Path) -> Result<OwnedFd> {
    remove_stale_socket(path);
    let listener = tokio::net::UnixListener::bind(path).map_err(sock_err("bind"))?;

    debug!(path = %path.display(), "unix stream server endpoint waiting for connection");
    let (stream, _) = listener.accept().await.map_err(sock_err("accept"))?;
    drop(listener);
    debug!(path = %path.display(), "unix stream server endpoint accepted connection");

    let stream = stream.into_std().map_err(sock_err("accept"))?;
    stream.set_nonblocking(false).map_err(sock_err("accept"))?;
    Ok(OwnedFd::from(stream))
}

fn unix_datagram_server(path: &Path) -> Result<OwnedFd> {
    remove_stale_socket(path);
    let socket = UnixDatagram::bind(path).map_err(sock_err("bind"))?;
    debug!(path = %path.display(), "unix datagram server endpoint bound");

    let socket = socket.into_std().map_err(sock_err("socket"))?;
    socket.set_nonblocking(false).map_err(sock_err("socket"))?;
    Ok(OwnedFd::from(socket))
}

// =============================================================================
// Client Establishment
// =============================================================================

async fn establish_client(spec: &EndpointSpec) -> Result<OwnedFd> {
    match (spec.kind, &spec.addr) {
        (TransportKind::Tcp, EndpointAddr::HostPort { host, port }) => {
            tcp_client(host, *port).await
        }
        (TransportKind::Udp, EndpointAddr::HostPort { host, port }) => {
            udp_client(host, *port).await
        }
        (TransportKind::UnixStream, EndpointAddr::Path { path }) => unix_stream_client(path).await,
        (TransportKind::UnixDatagram, EndpointAddr::Path { path }) => unix_datagram_client(path),
        _ => Err(Error::Internal(format!(
            "address form does not match transport: {spec}"
        ))),
    }
}

/// Resolves a hostname, preferring an IPv4 address when one exists.
async fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    let addrs: Vec<SocketAddr> = lookup_host((host, port))
        .await
        .map_err(|_| Error::UnknownHost {
            host: host.to_string(),
        })?
        .collect();
    addrs
        .iter()
        .copied()
        .find(SocketAddr::is_ipv4)
        .or_else(|| addrs.first().copied())
        .ok_or_else(|| Error::UnknownHost {
            host: host.to_string(),
        })
}

async fn tcp_client(host: &str, port: u16) -> Result<OwnedFd> {
    let addr = resolve(host, port).await?;
    let stream = TcpStream::connect(addr).await.map_err(sock_err("connect"))?;
    debug!(peer = %addr, "tcp client endpoint connected");
    tcp_stream_fd(stream)
}

async fn udp_client(host: &str, port: u16) -> Result<OwnedFd> {
    let addr = resolve(host, port).await?;
    let local: SocketAddr = if addr.is_ipv4() {
        SocketAddr::from(([0, 0, 0, 0], 0))
    } else {
        SocketAddr::from((std::net::Ipv6Addr::UNSPECIFIED, 0))
    };
    let socket = UdpSocket::bind(local).await.map_err(sock_err("socket"))?;
    // Fix the default destination so plain write(2) from the child reaches
    // the configured peer.
    socket.connect(addr).await.map_err(sock_err("connect"))?;
    debug!(peer = %addr, "udp client endpoint aimed");

    let socket = socket.into_std().map_err(sock_err("socket"))?;
    socket.set_nonblocking(false).map_err(sock_err("socket"))?;
    Ok(OwnedFd::from(socket))
}

async fn unix_stream_client(path: &Path) -> Result<OwnedFd> {
    let stream = UnixStream::connect(path)
        .await
        .map_err(sock_err("connect"))?;
    debug!(path = %path.display(), "unix stream client endpoint connected");

    let stream = stream.into_std().map_err(sock_err("connect"))?;
    stream.set_nonblocking(false).map_err(sock_err("connect"))?;
    Ok(OwnedFd::from(stream))
}

fn unix_datagram_client(path: &Path) -> Result<OwnedFd> {
    let socket = UnixDatagram::unbound().map_err(sock_err("socket"))?;
    socket.connect(path).map_err(sock_err("connect"))?;
    debug!(path = %path.display(), "unix datagram client endpoint aimed");

    let socket = socket.into_std().map_err(sock_err("socket"))?;
    socket.set_nonblocking(false).map_err(sock_err("socket"))?;
    Ok(OwnedFd::from(socket))
}

// =============================================================================
// EstablishedIo
// =============================================================================

/// Live endpoints for one invocation, in the same arrangement as the
/// [`IoConfig`] they were established from.
#[derive(Debug)]
pub enum EstablishedIo {
    /// No endpoints configured.
    Inherit,
    /// Server endpoint feeding standard input.
    Input(Endpoint),
    /// Client endpoint receiving standard output.
    Output(Endpoint),
    /// Distinct endpoints per direction.
    Both { input: Endpoint, output: Endpoint },
    /// One shared connection for both directions.
    Bidirectional(Endpoint),
}

impl EstablishedIo {
    /// Establishes every endpoint named by `io`.
    ///
    /// The input endpoint is established first and must succeed before the
    /// output endpoint is attempted; if the output side then fails, the
    /// already-open input descriptor is released before the error returns.
    pub async fn establish(io: &IoConfig) -> Result<Self> {
        match io {
            IoConfig::Inherit => Ok(Self::Inherit),
            IoConfig::Input { input } => Ok(Self::Input(Endpoint::establish(input).await?)),
            IoConfig::Output { output } => Ok(Self::Output(Endpoint::establish(output).await?)),
            IoConfig::Both { input, output } => {
                let input = Endpoint::establish(input).await?;
                let output = Endpoint::establish(output).await?;
                Ok(Self::Both { input, output })
            }
            IoConfig::Bidirectional { endpoint } => {
                Ok(Self::Bidirectional(Endpoint::establish(endpoint).await?))
            }
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn sock_err(operation: &'static str) -> impl FnOnce(std::io::Error) -> Error {
    move |source| Error::Socket { operation, source }
}

fn tcp_stream_fd(stream: TcpStream) -> Result<OwnedFd> {
    let stream = stream.into_std().map_err(sock_err("socket"))?;
    stream.set_nonblocking(false).map_err(sock_err("socket"))?;
    Ok(OwnedFd::from(stream))
}

/// Removes a socket file left behind by a previous run, so a fresh bind
/// does not fail with "address in use". Missing files are fine.
fn remove_stale_socket(path: &Path) {
    if std::fs::remove_file(path).is_ok() {
        debug!(path = %path.display(), "removed stale socket file");
    }
}
