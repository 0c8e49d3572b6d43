//! Error type shared by the codec, the transport and the resolver.
//!
//! Every failure on the resolution path surfaces as exactly one [`DnsError`]
//! variant. Nothing in this crate aborts the process on bad input: truncated or
//! adversarial datagrams end up as [`DnsError::OutOfBounds`] or
//! [`DnsError::Malformed`] and are handed back to the caller.

use std::net::Ipv4Addr;

use thiserror::Error;

use crate::dns::ResponseCode;

/// Errors that can occur while encoding, decoding or resolving.
#[derive(Error, Debug)]
pub enum DnsError {
    /// The buffer ended in the middle of a field.
    #[error("read of {needed} bytes at offset {offset} exceeds buffer ({available} bytes left)")]
    OutOfBounds {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// A domain could not be encoded into wire labels.
    #[error("invalid label in '{domain}': {reason}")]
    InvalidLabel { domain: String, reason: String },

    /// The reply did not fit into the receive buffer, or the server set the TC bit.
    #[error("response from {server} truncated (limit {limit} bytes)")]
    ResponseTruncated { server: Ipv4Addr, limit: usize },

    /// The referral chain or the nameserver lookup nesting went past its bound.
    #[error("resolution depth exceeded for {domain}: {detail}")]
    ResolutionDepthExceeded { domain: String, detail: String },

    /// Answer, additional and authority sections offered nothing to follow.
    #[error("no path forward for {domain} at {server}")]
    NoPathForward { domain: String, server: Ipv4Addr },

    /// Sending or receiving failed, including read timeouts.
    #[error("transport failure talking to {server}: {source}")]
    TransportFailure {
        server: Ipv4Addr,
        #[source]
        source: std::io::Error,
    },

    /// Structurally invalid message content.
    #[error("malformed message: {0}")]
    Malformed(String),

    /// Compression pointers kept jumping without reaching a terminator.
    #[error("compression pointer loop at offset {offset}")]
    CompressionLoop { offset: usize },

    /// The reply carried a different transaction id than the query.
    #[error("transaction id mismatch: sent {expected:#06x}, got {actual:#06x}")]
    IdMismatch { expected: u16, actual: u16 },

    /// The reply answers a different question than the one sent.
    #[error("reply is for '{actual}', expected '{expected}'")]
    QuestionMismatch { expected: String, actual: String },

    /// The server answered with a non-zero RCODE.
    #[error("DNS server returned an error: {0:?}")]
    ServerReturnedError(ResponseCode),
}

impl DnsError {
    /// Whether repeating the whole resolution could reasonably succeed.
    ///
    /// The resolver itself never retries; this only tells callers which
    /// failures are worth another attempt with their own backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DnsError::TransportFailure { .. }
                | DnsError::OutOfBounds { .. }
                | DnsError::ResponseTruncated { .. }
        )
    }
}
