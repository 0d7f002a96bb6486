//! `std::net` TCP stream and connect helper.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use zodiac_types::backend::NetworkStream;
use zodiac_types::error::{Result, ZodiacError};

/// A blocking TCP connection.
#[derive(Debug)]
pub struct StdNetworkStream {
    stream: TcpStream,
}

impl StdNetworkStream {
    pub fn new(stream: TcpStream) -> Self {
        Self { stream }
    }

    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.stream.peer_addr()
    }
}

impl Read for StdNetworkStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Write for StdNetworkStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

impl NetworkStream for StdNetworkStream {
    fn shutdown_write(&mut self) -> io::Result<()> {
        self.stream.shutdown(Shutdown::Write)
    }

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        self.stream.set_read_timeout(timeout)
    }
}

/// Resolve `host:port` and connect to the first address that accepts.
///
/// `connect_timeout` bounds all attempts together: each address gets
/// whatever is left of it. Addresses are tried in resolver order; with
/// `prefer_ipv6` they are stably re-sorted so IPv6 addresses come first.
pub fn connect(
    host: &str,
    port: u16,
    connect_timeout: Duration,
    prefer_ipv6: bool,
) -> Result<StdNetworkStream> {
    let mut addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|e| ZodiacError::ConnectionFailed(format!("DNS resolution for {host}: {e}")))?
        .collect();
    if addrs.is_empty() {
        return Err(ZodiacError::ConnectionFailed(format!(
            "no addresses for {host}:{port}"
        )));
    }
    if prefer_ipv6 {
        sort_ipv6_first(&mut addrs);
    }

    let deadline = Instant::now() + connect_timeout;
    let mut last_err = None;
    for addr in &addrs {
        let Some(budget) = time_left(deadline) else {
            log::debug!("connect budget for {host}:{port} spent before {addr}");
            break;
        };
        log::debug!("connecting to {addr}");
        match TcpStream::connect_timeout(addr, budget) {
            Ok(stream) => {
                stream.set_write_timeout(Some(connect_timeout))?;
                return Ok(StdNetworkStream::new(stream));
            },
            Err(e) => {
                log::debug!("connect to {addr} failed: {e}");
                last_err = Some(e);
            },
        }
    }

    let reason = last_err.map_or_else(|| "timed out".to_string(), |e| e.to_string());
    Err(ZodiacError::ConnectionFailed(format!(
        "{host}:{port}: {reason}"
    )))
}

/// Time remaining before `deadline`, or `None` once it has passed.
fn time_left(deadline: Instant) -> Option<Duration> {
    let left = deadline.saturating_duration_since(Instant::now());
    (!left.is_zero()).then_some(left)
}

/// Stable sort putting IPv6 addresses ahead of IPv4 ones.
fn sort_ipv6_first(addrs: &mut [SocketAddr]) {
    addrs.sort_by_key(|a| !a.is_ipv6());
}
