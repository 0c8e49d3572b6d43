//! Iterative DNS resolution over raw UDP.
//!
//! The crate speaks the DNS wire protocol directly: it encodes a query,
//! sends it to a root server, decodes the reply (label compression included)
//! and follows referrals down the delegation chain until an authoritative
//! server hands out an IPv4 address.
//!
//! - [`name`] encodes and decodes domain names
//! - [`cursor`] is the bounds-checked reader decoding runs on
//! - [`dns`] holds the message types and their codec
//! - [`resolver`] walks the delegation chain
//! - [`transport`] sends queries; [`config`] carries the knobs

pub mod config;
pub mod cursor;
pub mod dns;
pub mod error;
pub mod name;
pub mod resolver;
pub mod transport;

pub use config::{Config, ResolverConfig};
pub use dns::{DnsMessage, RecordType};
pub use error::DnsError;
pub use resolver::{Resolution, Resolver};
pub use transport::{Transport, UdpTransport};
