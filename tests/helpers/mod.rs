#![allow(dead_code)]

use iterative_resolver::dns::{DnsMessage, FLAG_RESPONSE, FLAG_TRUNCATED};
use iterative_resolver::name::encode_name;
use iterative_resolver::{DnsError, Transport};
use std::collections::HashMap;
use std::net::Ipv4Addr;

pub const ROOT: Ipv4Addr = Ipv4Addr::new(198, 41, 0, 4);

/// Builds response datagrams for a single question, names written out in full.
#[derive(Clone)]
pub struct ResponseBuilder {
    question: String,
    flags: u16,
    answers: Vec<Vec<u8>>,
    authorities: Vec<Vec<u8>>,
    additionals: Vec<Vec<u8>>,
}

impl ResponseBuilder {
    pub fn new(question: &str) -> Self {
        Self {
            question: question.to_string(),
            flags: FLAG_RESPONSE,
            answers: Vec::new(),
            authorities: Vec::new(),
            additionals: Vec::new(),
        }
    }

    pub fn rcode(mut self, rcode: u16) -> Self {
        self.flags = (self.flags & !0x000f) | rcode;
        self
    }

    pub fn truncated(mut self) -> Self {
        self.flags |= FLAG_TRUNCATED;
        self
    }

    pub fn answer_a(mut self, name: &str, ip: [u8; 4]) -> Self {
        self.answers.push(record(name, 1, &ip));
        self
    }

    pub fn authority_ns(mut self, zone: &str, host: &str) -> Self {
        let host = encode_name(host).unwrap();
        self.authorities.push(record(zone, 2, &host));
        self
    }

    pub fn authority_soa(mut self, zone: &str) -> Self {
        self.authorities.push(record(zone, 6, &[0; 22]));
        self
    }

    pub fn additional_a(mut self, name: &str, ip: [u8; 4]) -> Self {
        self.additionals.push(record(name, 1, &ip));
        self
    }

    pub fn additional_aaaa(mut self, name: &str) -> Self {
        let ip = [0x20, 0x01, 0x05, 0x03, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x30];
        self.additionals.push(record(name, 28, &ip));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        for field in [
            0,
            self.flags,
            1,
            self.answers.len() as u16,
            self.authorities.len() as u16,
            self.additionals.len() as u16,
        ] {
            bytes.extend_from_slice(&field.to_be_bytes());
        }
        bytes.extend_from_slice(&encode_name(&self.question).unwrap());
        bytes.extend_from_slice(&[0, 1, 0, 1]);
        for rec in self
            .answers
            .iter()
            .chain(&self.authorities)
            .chain(&self.additionals)
        {
            bytes.extend_from_slice(rec);
        }
        bytes
    }
}

fn record(name: &str, rtype: u16, rdata: &[u8]) -> Vec<u8> {
    let mut rec = encode_name(name).unwrap();
    rec.extend_from_slice(&rtype.to_be_bytes());
    rec.extend_from_slice(&1u16.to_be_bytes());
    rec.extend_from_slice(&172_800u32.to_be_bytes());
    rec.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
    rec.extend_from_slice(rdata);
    rec
}

/// How the mock answers a query it has a script for.
#[derive(Clone)]
pub enum Reply {
    /// Echo the query id into the canned bytes.
    Canned(Vec<u8>),
    /// Send the canned bytes with a different id than the query's.
    WrongId(Vec<u8>),
    /// Send the bytes exactly as given.
    Raw(Vec<u8>),
    /// Send the query itself back.
    Echo,
}

/// Transport that answers from a script keyed by (server, queried name).
pub struct MockTransport {
    script: HashMap<(Ipv4Addr, String), Reply>,
    calls: Vec<(Ipv4Addr, String)>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            script: HashMap::new(),
            calls: Vec::new(),
        }
    }

    pub fn on(mut self, server: Ipv4Addr, domain: &str, response: &ResponseBuilder) -> Self {
        self.script
            .insert((server, domain.to_string()), Reply::Canned(response.build()));
        self
    }

    pub fn on_reply(mut self, server: Ipv4Addr, domain: &str, reply: Reply) -> Self {
        self.script.insert((server, domain.to_string()), reply);
        self
    }

    pub fn calls(&self) -> &[(Ipv4Addr, String)] {
        &self.calls
    }
}

impl Transport for MockTransport {
    fn exchange(&mut self, server: Ipv4Addr, query: &[u8]) -> Result<Vec<u8>, DnsError> {
        let parsed = DnsMessage::from_bytes(query).expect("resolver sent an undecodable query");
        assert_eq!(parsed.questions.len(), 1);
        let domain = parsed.questions[0].name.clone();
        self.calls.push((server, domain.clone()));

        let id = parsed.header.id.to_be_bytes();
        match self.script.get(&(server, domain)).cloned() {
            Some(Reply::Canned(mut bytes)) => {
                bytes[..2].copy_from_slice(&id);
                Ok(bytes)
            }
            Some(Reply::WrongId(mut bytes)) => {
                let wrong = parsed.header.id.wrapping_add(1).to_be_bytes();
                bytes[..2].copy_from_slice(&wrong);
                Ok(bytes)
            }
            Some(Reply::Raw(bytes)) => Ok(bytes),
            Some(Reply::Echo) => Ok(query.to_vec()),
            None => Err(DnsError::TransportFailure {
                server,
                source: std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "no scripted reply",
                ),
            }),
        }
    }
}
