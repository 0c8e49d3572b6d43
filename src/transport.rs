//! Sending queries and receiving replies.
//!
//! The resolver only depends on the [`Transport`] trait, so tests can drive it
//! with canned responses. [`UdpTransport`] is the real implementation: one
//! UDP exchange per attempt with a read timeout, a bounded number of attempts,
//! and a receive buffer that reports oversized replies instead of cutting them.

use std::io;
use std::net::{Ipv4Addr, UdpSocket};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::ResolverConfig;
use crate::error::DnsError;

/// Standard DNS port.
pub const DNS_PORT: u16 = 53;

/// One request/response exchange with a name server.
pub trait Transport {
    /// Sends `query` to `server` and returns the raw reply.
    fn exchange(&mut self, server: Ipv4Addr, query: &[u8]) -> Result<Vec<u8>, DnsError>;
}

/// Blocking UDP transport.
#[derive(Debug, Clone)]
pub struct UdpTransport {
    port: u16,
    timeout: Duration,
    attempts: u32,
    buffer_size: usize,
}

impl UdpTransport {
    pub fn new(port: u16, timeout: Duration, attempts: u32, buffer_size: usize) -> Self {
        UdpTransport {
            port,
            timeout,
            attempts: attempts.max(1),
            buffer_size,
        }
    }

    pub fn from_config(config: &ResolverConfig) -> Self {
        Self::new(
            config.port,
            Duration::from_millis(config.timeout_ms),
            config.attempts,
            config.buffer_size,
        )
    }

    fn exchange_once(&self, server: Ipv4Addr, query: &[u8]) -> Result<Vec<u8>, DnsError> {
        let transport_err = |source: io::Error| DnsError::TransportFailure { server, source };

        // Let the OS pick the interface and an ephemeral port.
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).map_err(transport_err)?;
        socket.send_to(query, (server, self.port)).map_err(transport_err)?;

        // One spare byte tells an exactly-full reply apart from a cut one.
        let mut buffer = vec![0u8; self.buffer_size + 1];
        let deadline = Instant::now() + self.timeout;

        loop {
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                return Err(transport_err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "no reply before timeout",
                )));
            }
            socket.set_read_timeout(Some(left)).map_err(transport_err)?;

            let (size, from) = socket.recv_from(&mut buffer).map_err(|e| match e.kind() {
                io::ErrorKind::WouldBlock => transport_err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "no reply before timeout",
                )),
                _ => transport_err(e),
            })?;

            if from.ip() != server {
                debug!(%server, %from, "ignoring datagram from unexpected source");
                continue;
            }
            if size > self.buffer_size {
                return Err(DnsError::ResponseTruncated {
                    server,
                    limit: self.buffer_size,
                });
            }

            buffer.truncate(size);
            return Ok(buffer);
        }
    }
}

impl Default for UdpTransport {
    fn default() -> Self {
        Self::from_config(&ResolverConfig::default())
    }
}

impl Transport for UdpTransport {
    fn exchange(&mut self, server: Ipv4Addr, query: &[u8]) -> Result<Vec<u8>, DnsError> {
        let mut attempt = 1;
        loop {
            match self.exchange_once(server, query) {
                Err(DnsError::TransportFailure { source, .. })
                    if source.kind() == io::ErrorKind::TimedOut && attempt < self.attempts =>
                {
                    warn!(%server, attempt, max = self.attempts, "query timed out, retrying");
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}
