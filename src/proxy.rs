//! Pure-proxy mode.
//!
//! When no command is given the launcher itself moves the bytes: a blocking
//! read/write loop between its own standard streams and whichever endpoint
//! arrangement is configured, ending at end-of-stream. No subprocess is
//! involved and no deadline applies.
//!
//! The loops run on the blocking pool so the runtime thread stays free; the
//! bidirectional arrangement runs one thread per direction over duplicated
//! descriptors and finishes when both directions have drained.

use std::fs::File;
use std::io::{Read, Write};
use std::os::fd::OwnedFd;

use tracing::{debug, info};

use crate::constants::PROXY_BUF_SIZE;
use crate::endpoint::EstablishedIo;
use crate::error::{Error, Result};

/// Runs the configured arrangement to end-of-stream.
pub async fn run(io: EstablishedIo) -> Result<()> {
    match io {
        EstablishedIo::Inherit => {
            info!("pass-through: copying stdin to stdout");
            blocking(move || {
                copy_stream(std::io::stdin().lock(), std::io::stdout().lock())
            })
            .await?;
        }
        EstablishedIo::Input(endpoint) => {
            info!(endpoint = %endpoint.spec(), "proxy: endpoint to stdout");
            let fd = endpoint.into_fd();
            blocking(move || copy_stream(File::from(fd), std::io::stdout().lock())).await?;
        }
        EstablishedIo::Output(endpoint) => {
            info!(endpoint = %endpoint.spec(), "proxy: stdin to endpoint");
            let fd = endpoint.into_fd();
            blocking(move || copy_stream(std::io::stdin().lock(), File::from(fd))).await?;
        }
        EstablishedIo::Both { input, output } => {
            info!(
                input = %input.spec(),
                output = %output.spec(),
                "proxy: relaying input endpoint to output endpoint"
            );
            let input = input.into_fd();
            let output = output.into_fd();
            blocking(move || copy_stream(File::from(input), File::from(output))).await?;
        }
        EstablishedIo::Bidirectional(endpoint) => {
            info!(endpoint = %endpoint.spec(), "proxy: bidirectional");
            let read_half = endpoint.try_clone_fd()?;
            let write_half = endpoint.into_fd();
            blocking(move || copy_bidirectional(read_half, write_half)).await?;
        }
    }
    debug!("proxy finished");
    Ok(())
}

/// Copies until end-of-stream, one bounded read at a time.
///
/// A short read is one whole datagram on datagram sockets, so message
/// boundaries survive the trip through the buffer.
fn copy_stream(mut reader: impl Read, mut writer: impl Write) -> std::io::Result<u64> {
    let mut buf = [0u8; PROXY_BUF_SIZE];
    let mut total = 0u64;
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        writer.write_all(&buf[..n])?;
        total += n as u64;
    }
    writer.flush()?;
    Ok(total)
}

/// Runs endpoint→stdout and stdin→endpoint concurrently until both drain.
fn copy_bidirectional(read_half: OwnedFd, write_half: OwnedFd) -> std::io::Result<u64> {
    std::thread::scope(|scope| {
        let inbound =
            scope.spawn(move || copy_stream(File::from(read_half), std::io::stdout().lock()));
        let outbound = copy_stream(std::io::stdin().lock(), File::from(write_half));
        let inbound = inbound
            .join()
            .unwrap_or_else(|_| Err(std::io::Error::other("inbound copy thread panicked")));
        Ok(inbound? + outbound?)
    })
}

/// Runs a blocking copy on the blocking pool, mapping failures.
async fn blocking<F>(f: F) -> Result<u64>
where
    F: FnOnce() -> std::io::Result<u64> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Internal(format!("proxy task failed: {e}")))?
        .map_err(|source| Error::Copy { source })
}
