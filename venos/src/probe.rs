//! Bounded-retry TCP reachability check.
//!
//! A probe repeatedly attempts a plain TCP connect to the target until one
//! succeeds or the deadline passes. Every attempt uses the same fixed
//! interval both as its connect timeout and as the pause before the next
//! attempt. Refused, reset and timed-out connects are retried; a missing or
//! unknown port and an unresolvable target are configuration errors and
//! fail immediately.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use log::{debug, trace};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::Instant;

use crate::error::{ProbeError, Result};

/// Default pause between attempts.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Well-known service ports understood by [`service_port`].
const SERVICES: &[(&str, u16)] = &[
    ("ssh", 22),
    ("telnet", 23),
    ("http", 80),
    ("https", 443),
    ("netconf", 830),
];

/// Look up the well-known port of a service protocol.
pub fn service_port(protocol: &str) -> Option<u16> {
    let protocol = protocol.to_ascii_lowercase();
    SERVICES
        .iter()
        .find(|(name, _)| *name == protocol)
        .map(|(_, port)| *port)
}

/// Pick the explicit port, or the protocol's well-known port.
pub fn resolve_port(port: Option<u16>, protocol: Option<&str>) -> Result<u16> {
    match (port, protocol) {
        (Some(port), _) => Ok(port),
        (None, Some(protocol)) => service_port(protocol).ok_or_else(|| {
            ProbeError::UnknownService {
                protocol: protocol.to_string(),
            }
            .into()
        }),
        (None, None) => Err(ProbeError::MissingPort.into()),
    }
}

/// Result of a probe run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeOutcome {
    /// Whether any attempt connected.
    pub reached: bool,

    /// Time from the first attempt to the outcome.
    pub elapsed: Duration,

    /// Number of connect attempts made.
    pub attempts: u32,
}

/// Probe `target` until a TCP connect succeeds or `timeout` passes.
///
/// `timeout` of zero performs exactly one attempt. An unreachable target is
/// reported as `reached == false`, not as an error.
pub async fn probe(
    target: &str,
    port: Option<u16>,
    protocol: Option<&str>,
    timeout: Duration,
    interval: Duration,
) -> Result<ProbeOutcome> {
    let port = resolve_port(port, protocol)?;
    let addrs = resolve(target, port).await?;

    debug!(
        "probing {}:{} (timeout {:?}, interval {:?})",
        target, port, timeout, interval
    );

    let start = Instant::now();
    let deadline = start + timeout;
    let mut attempts = 0;

    loop {
        attempts += 1;
        match attempt(&addrs, interval).await {
            Ok(()) => {
                let elapsed = start.elapsed();
                debug!("{}:{} reachable after {:?}", target, port, elapsed);
                return Ok(ProbeOutcome {
                    reached: true,
                    elapsed,
                    attempts,
                });
            }
            Err(e) if is_retryable(&e) => {
                trace!("probe attempt {} to {}:{} failed: {}", attempts, target, port, e);
            }
            Err(source) => {
                return Err(ProbeError::Io {
                    target: target.to_string(),
                    source,
                }
                .into());
            }
        }

        if Instant::now() >= deadline {
            break;
        }
        tokio::time::sleep(interval).await;
        if Instant::now() >= deadline {
            break;
        }
    }

    let elapsed = start.elapsed();
    debug!(
        "{}:{} unreachable after {} attempts ({:?})",
        target, port, attempts, elapsed
    );
    Ok(ProbeOutcome {
        reached: false,
        elapsed,
        attempts,
    })
}

async fn resolve(target: &str, port: u16) -> Result<Vec<SocketAddr>> {
    let resolve_error = |source| ProbeError::Resolve {
        target: target.to_string(),
        source,
    };

    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((target, port))
        .await
        .map_err(resolve_error)?
        .collect();

    if addrs.is_empty() {
        return Err(resolve_error(io::Error::new(
            io::ErrorKind::NotFound,
            "no addresses returned",
        ))
        .into());
    }
    Ok(addrs)
}

async fn attempt(addrs: &[SocketAddr], interval: Duration) -> io::Result<()> {
    let mut stream = tokio::time::timeout(interval, TcpStream::connect(addrs))
        .await
        .map_err(|_| io::Error::from(io::ErrorKind::TimedOut))??;

    if let Err(e) = stream.shutdown().await {
        trace!("shutdown after successful probe failed: {}", e);
    }
    Ok(())
}

/// Errors that say nothing about whether a later attempt could succeed
/// are retried; errors that will repeat on every attempt are not.
fn is_retryable(err: &io::Error) -> bool {
    !matches!(
        err.kind(),
        io::ErrorKind::PermissionDenied | io::ErrorKind::InvalidInput | io::ErrorKind::Unsupported
    )
}
