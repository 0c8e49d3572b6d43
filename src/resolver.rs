//! Iterative DNS resolution.
//!
//! Resolution starts at a root server and follows referrals down the
//! delegation chain until some server answers with an A record. Each round
//! sends one query and lands in one of these outcomes:
//!
//! - **Answer**: the answer section holds an A record; its address is the
//!   result (or, inside a nameserver lookup, the next server to ask).
//! - **Referral**: the additional section carries an A record (glue); that
//!   address becomes the next server for the same name.
//! - **Nameserver lookup**: only an NS name is given; that host name is
//!   resolved from the root first, then the outer lookup continues
//!   against the address found.
//! - **Dead end**: nothing to follow, reported as [`DnsError::NoPathForward`].
//!
//! Nameserver lookups nest, but not on the call stack: pending lookups wait
//! on an explicit stack, and both the referrals per lookup and the nesting
//! depth are bounded so cyclic delegations end in
//! [`DnsError::ResolutionDepthExceeded`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use iterative_resolver::config::ResolverConfig;
//! use iterative_resolver::resolver::Resolver;
//!
//! let mut resolver = Resolver::from_config(&ResolverConfig::default());
//! let address = resolver.resolve("example.com")?;
//! println!("example.com -> {}", address);
//! # Ok::<(), iterative_resolver::DnsError>(())
//! ```

use std::fmt;
use std::net::Ipv4Addr;

use tracing::{debug, info, trace};

use crate::config::ResolverConfig;
use crate::dns::{DnsMessage, FLAG_RESPONSE, RecordType, ResponseCode};
use crate::error::DnsError;
use crate::transport::{Transport, UdpTransport};

/// What the resolver does after inspecting one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// The answer section produced an address.
    HaveAnswer(Ipv4Addr),
    /// Glue in the additional section names the next server to ask.
    NeedReferral(Ipv4Addr),
    /// Only a name server host name is known; it must be resolved first.
    ResolveNsName(String),
}

/// Decides the next step from a decoded response.
///
/// `domain` and `server` only serve error reporting.
///
/// # Errors
///
/// - [`DnsError::ServerReturnedError`] if the RCODE is not NOERROR
/// - [`DnsError::NoPathForward`] if no A answer, glue or NS record is present
pub fn next_step(message: &DnsMessage, domain: &str, server: Ipv4Addr) -> Result<Step, DnsError> {
    let rcode = message.header.response_code();
    if rcode != ResponseCode::NoError {
        return Err(DnsError::ServerReturnedError(rcode));
    }

    let dead_end = || DnsError::NoPathForward {
        domain: domain.to_string(),
        server,
    };

    if !message.answers.is_empty() {
        return message
            .answers
            .iter()
            .find_map(|record| record.ipv4_address())
            .map(Step::HaveAnswer)
            .ok_or_else(dead_end);
    }

    if let Some(glue) = message
        .additionals
        .iter()
        .find_map(|record| record.ipv4_address())
    {
        return Ok(Step::NeedReferral(glue));
    }

    message
        .authorities
        .iter()
        .find_map(|record| record.nameserver())
        .map(|host| Step::ResolveNsName(host.to_string()))
        .ok_or_else(dead_end)
}

/// One query sent during a resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hop {
    pub domain: String,
    pub nameserver: Ipv4Addr,
}

/// The outcome of a successful resolution along with every query it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub address: Ipv4Addr,
    pub hops: Vec<Hop>,
}

impl fmt::Display for Resolution {
    /// One line per name with the servers asked for it, then `= address`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut current: Option<&str> = None;
        for hop in &self.hops {
            if current != Some(hop.domain.as_str()) {
                if current.is_some() {
                    writeln!(f)?;
                }
                write!(f, "{}", hop.domain)?;
                current = Some(hop.domain.as_str());
            }
            write!(f, " -> {}", hop.nameserver)?;
        }
        if current.is_some() {
            writeln!(f)?;
        }
        write!(f, "= {}", self.address)
    }
}

/// A lookup in progress: the name being resolved and who to ask next.
#[derive(Debug)]
struct Lookup {
    domain: String,
    nameserver: Ipv4Addr,
    queries: usize,
}

impl Lookup {
    fn new(domain: String, nameserver: Ipv4Addr) -> Self {
        Lookup {
            domain,
            nameserver,
            queries: 0,
        }
    }
}

/// Iterative resolver over some [`Transport`].
#[derive(Debug)]
pub struct Resolver<T> {
    transport: T,
    root_server: Ipv4Addr,
    max_referrals: usize,
    max_ns_depth: usize,
    max_hops: usize,
    buffer_size: usize,
}

impl Resolver<UdpTransport> {
    /// Creates a resolver that talks UDP with the configured timeouts.
    pub fn from_config(config: &ResolverConfig) -> Self {
        Resolver::new(UdpTransport::from_config(config), config)
    }
}

impl<T: Transport> Resolver<T> {
    pub fn new(transport: T, config: &ResolverConfig) -> Self {
        Resolver {
            transport,
            root_server: config.root_server,
            max_referrals: config.max_referrals,
            max_ns_depth: config.max_ns_depth,
            max_hops: config.max_hops,
            buffer_size: config.buffer_size,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Resolves `domain` to an IPv4 address, starting at the root server.
    pub fn resolve(&mut self, domain: &str) -> Result<Ipv4Addr, DnsError> {
        self.resolve_with_trace(domain).map(|resolution| resolution.address)
    }

    /// Like [`Resolver::resolve`], also returning every query made on the way.
    ///
    /// # Errors
    ///
    /// Any decode or transport error of a round ends the resolution as is;
    /// nothing is retried here. A lookup that needs more than
    /// `max_referrals` queries, or nameserver lookups nested deeper than
    /// `max_ns_depth`, fail with [`DnsError::ResolutionDepthExceeded`]. So
    /// does the whole resolution once it has sent `max_hops` queries, however
    /// they are spread over nested lookups.
    pub fn resolve_with_trace(&mut self, domain: &str) -> Result<Resolution, DnsError> {
        let mut hops = Vec::new();
        let mut current = Lookup::new(domain.to_string(), self.root_server);
        // Lookups suspended while one of their name servers gets resolved.
        let mut waiting: Vec<Lookup> = Vec::new();

        loop {
            if hops.len() >= self.max_hops {
                return Err(DnsError::ResolutionDepthExceeded {
                    domain: domain.to_string(),
                    detail: format!("gave up after {} queries in total", self.max_hops),
                });
            }
            if current.queries >= self.max_referrals {
                return Err(DnsError::ResolutionDepthExceeded {
                    domain: current.domain,
                    detail: format!("no answer after {} referrals", self.max_referrals),
                });
            }
            current.queries += 1;

            info!(domain = %current.domain, nameserver = %current.nameserver, "querying");
            hops.push(Hop {
                domain: current.domain.clone(),
                nameserver: current.nameserver,
            });

            let message = self.query(current.nameserver, &current.domain)?;

            match next_step(&message, &current.domain, current.nameserver)? {
                Step::HaveAnswer(address) => match waiting.pop() {
                    None => {
                        info!(domain = %current.domain, %address, "resolved");
                        return Ok(Resolution { address, hops });
                    }
                    Some(mut parent) => {
                        debug!(nameserver = %current.domain, %address, "nameserver resolved");
                        parent.nameserver = address;
                        current = parent;
                    }
                },
                Step::NeedReferral(next) => {
                    debug!(domain = %current.domain, %next, "following glue");
                    current.nameserver = next;
                }
                Step::ResolveNsName(host) => {
                    if waiting.len() >= self.max_ns_depth {
                        return Err(DnsError::ResolutionDepthExceeded {
                            domain: current.domain,
                            detail: format!(
                                "nameserver lookups nested deeper than {}",
                                self.max_ns_depth
                            ),
                        });
                    }
                    debug!(domain = %current.domain, nameserver = %host, "no glue, resolving nameserver");
                    let nested = Lookup::new(host, self.root_server);
                    waiting.push(std::mem::replace(&mut current, nested));
                }
            }
        }
    }

    /// One round trip: build, send, decode and sanity-check the reply.
    fn query(&mut self, server: Ipv4Addr, domain: &str) -> Result<DnsMessage, DnsError> {
        let query = DnsMessage::query(fastrand::u16(..), domain, RecordType::A)?;
        let reply = self.transport.exchange(server, &query.to_bytes()?)?;
        let message = DnsMessage::from_bytes(&reply)?;

        if message.header.id != query.header.id {
            return Err(DnsError::IdMismatch {
                expected: query.header.id,
                actual: message.header.id,
            });
        }
        if message.header.flags & FLAG_RESPONSE == 0 {
            return Err(DnsError::Malformed(format!(
                "reply from {} does not have the QR bit set",
                server
            )));
        }
        let asked = domain.trim_end_matches('.');
        match message.questions.first() {
            Some(question) if question.name.eq_ignore_ascii_case(asked) => {}
            other => {
                return Err(DnsError::QuestionMismatch {
                    expected: asked.to_string(),
                    actual: other.map(|q| q.name.clone()).unwrap_or_default(),
                });
            }
        }
        if message.header.is_truncated() {
            return Err(DnsError::ResponseTruncated {
                server,
                limit: self.buffer_size,
            });
        }

        debug!(
            %server,
            answers = message.answers.len(),
            authorities = message.authorities.len(),
            additionals = message.additionals.len(),
            "response decoded"
        );
        for record in message
            .answers
            .iter()
            .chain(&message.authorities)
            .chain(&message.additionals)
        {
            trace!("  {}", record);
        }

        Ok(message)
    }
}
