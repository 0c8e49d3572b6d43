//! DNS message types and their wire codec.
//!
//! This module covers the parts of RFC 1035 an iterative A-record lookup
//! needs: the 12-byte header, a single question, and resource records whose
//! payload is understood for types A and NS and carried as opaque bytes for
//! everything else.
//!
//! # Core Types
//!
//! - [`RecordType`] - Numeric record type codes with names for the common ones
//! - [`DnsHeader`] - The fixed 12-byte message header
//! - [`DnsQuestion`] - The question section entry
//! - [`ResourceRecord`] / [`RData`] - Answer, authority and additional entries
//! - [`DnsMessage`] - A complete message, built for queries and parsed from responses
//!
//! # Examples
//!
//! ```rust
//! use iterative_resolver::dns::{DnsMessage, RecordType};
//!
//! let query = DnsMessage::query(0x1234, "example.com", RecordType::A).unwrap();
//! let bytes = query.to_bytes().unwrap();
//!
//! assert_eq!(&bytes[..4], &[0x12, 0x34, 0x01, 0x00]);
//! assert_eq!(bytes.len(), 12 + 13 + 4);
//! ```
//!
//! # Wire Format Compatibility
//!
//! All multi-byte fields use network byte order (big-endian). Decoding is a
//! strict left-to-right walk over the message with a [`ByteReader`]; only
//! compression pointers look back into earlier parts of the buffer.

use core::fmt;
use std::net::Ipv4Addr;

use tracing::trace;

use crate::cursor::ByteReader;
use crate::error::DnsError;
use crate::name::{decode_name, encode_name, pack_domain_name, unpack_domain_name};

/// Size of the fixed message header.
pub const HEADER_LEN: usize = 12;

/// Recursion Desired flag bit.
pub const FLAG_RECURSION_DESIRED: u16 = 0x0100;

/// Truncation flag bit.
pub const FLAG_TRUNCATED: u16 = 0x0200;

/// Response flag bit (QR).
pub const FLAG_RESPONSE: u16 = 0x8000;

/// The Internet class.
pub const CLASS_IN: u16 = 1;

/// A DNS record type code.
///
/// Only [`RecordType::A`] and [`RecordType::NS`] carry structured payloads in
/// this crate; the other named variants exist so logs read well. Codes
/// without a name are kept verbatim in [`RecordType::Unknown`].
///
/// # Examples
///
/// ```rust
/// use iterative_resolver::dns::RecordType;
///
/// assert_eq!(RecordType::from(2), RecordType::NS);
/// assert_eq!(u16::from(RecordType::A), 1);
/// assert_eq!(RecordType::from(99).to_string(), "TYPE99");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    /// IPv4 address record.
    A,
    /// Authoritative name server.
    NS,
    /// Canonical name.
    CNAME,
    /// Start of authority.
    SOA,
    /// Mail exchange.
    MX,
    /// Text record.
    TXT,
    /// IPv6 address record.
    AAAA,
    /// Any other code.
    Unknown(u16),
}

impl From<u16> for RecordType {
    fn from(value: u16) -> Self {
        match value {
            1 => RecordType::A,
            2 => RecordType::NS,
            5 => RecordType::CNAME,
            6 => RecordType::SOA,
            15 => RecordType::MX,
            16 => RecordType::TXT,
            28 => RecordType::AAAA,
            other => RecordType::Unknown(other),
        }
    }
}

impl From<RecordType> for u16 {
    fn from(value: RecordType) -> Self {
        match value {
            RecordType::A => 1,
            RecordType::NS => 2,
            RecordType::CNAME => 5,
            RecordType::SOA => 6,
            RecordType::MX => 15,
            RecordType::TXT => 16,
            RecordType::AAAA => 28,
            RecordType::Unknown(code) => code,
        }
    }
}

impl fmt::Display for RecordType {
    /// Uses `pad` so width specifiers line records up in logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordType::A => f.pad("A"),
            RecordType::NS => f.pad("NS"),
            RecordType::CNAME => f.pad("CNAME"),
            RecordType::SOA => f.pad("SOA"),
            RecordType::MX => f.pad("MX"),
            RecordType::TXT => f.pad("TXT"),
            RecordType::AAAA => f.pad("AAAA"),
            RecordType::Unknown(code) => f.pad(&format!("TYPE{}", code)),
        }
    }
}

/// The 4-bit response code (RCODE) carried in the low bits of the header flags.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ResponseCode {
    /// No error condition (RCODE = 0).
    NoError = 0,

    /// Format error (RCODE = 1).
    ///
    /// The name server was unable to interpret the query.
    FormatError = 1,

    /// Server failure (RCODE = 2).
    ///
    /// The name server could not process the query because of a problem on
    /// its side. Unknown codes are folded into this variant as well.
    ServerFailure = 2,

    /// Name error (RCODE = 3), commonly known as NXDOMAIN.
    NameError = 3,

    /// Not implemented (RCODE = 4).
    NotImplemented = 4,

    /// Refused (RCODE = 5).
    Refused = 5,
}

/// The 12-byte header of a DNS message.
///
/// # Layout
///
/// Six big-endian 16-bit fields, in order: ID, flags, QDCOUNT, ANCOUNT,
/// NSCOUNT, ARCOUNT.
///
/// # Examples
///
/// ```rust
/// use iterative_resolver::dns::DnsHeader;
///
/// let mut header = DnsHeader::new();
/// header.id = 12345;
/// header.question_count = 1;
///
/// let mut buffer = Vec::new();
/// header.pack(&mut buffer);
/// assert_eq!(buffer.len(), 12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DnsHeader {
    /// Transaction identifier chosen by the client and echoed by the server.
    pub id: u16,

    /// QR, opcode, AA, TC, RD, RA, Z and RCODE packed into one word.
    pub flags: u16,

    /// Number of entries in the question section.
    pub question_count: u16,

    /// Number of resource records in the answer section.
    pub answer_count: u16,

    /// Number of name server resource records in the authority section.
    pub authority_count: u16,

    /// Number of resource records in the additional section.
    pub additional_count: u16,
}

impl DnsHeader {
    /// Creates a header with every field set to zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the 12-byte big-endian encoding of the header to `buffer`.
    pub fn pack(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.id.to_be_bytes());
        buffer.extend_from_slice(&self.flags.to_be_bytes());
        buffer.extend_from_slice(&self.question_count.to_be_bytes());
        buffer.extend_from_slice(&self.answer_count.to_be_bytes());
        buffer.extend_from_slice(&self.authority_count.to_be_bytes());
        buffer.extend_from_slice(&self.additional_count.to_be_bytes());
    }

    /// Reads a header from the reader, advancing it by 12 bytes.
    ///
    /// # Errors
    ///
    /// Returns [`DnsError::OutOfBounds`] if fewer than 12 bytes are left.
    pub fn from_reader(reader: &mut ByteReader<'_>) -> Result<Self, DnsError> {
        Ok(DnsHeader {
            id: reader.read_u16()?,
            flags: reader.read_u16()?,
            question_count: reader.read_u16()?,
            answer_count: reader.read_u16()?,
            authority_count: reader.read_u16()?,
            additional_count: reader.read_u16()?,
        })
    }

    /// Extracts the response code from the low four bits of the flags.
    ///
    /// Codes this crate does not know are reported as
    /// [`ResponseCode::ServerFailure`].
    pub fn response_code(&self) -> ResponseCode {
        match self.flags & 0x000F {
            0 => ResponseCode::NoError,
            1 => ResponseCode::FormatError,
            2 => ResponseCode::ServerFailure,
            3 => ResponseCode::NameError,
            4 => ResponseCode::NotImplemented,
            5 => ResponseCode::Refused,
            _ => ResponseCode::ServerFailure,
        }
    }

    pub fn is_truncated(&self) -> bool {
        self.flags & FLAG_TRUNCATED != 0
    }
}

/// A question section entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsQuestion {
    /// Dotted domain name, encoded to labels when packed.
    pub name: String,
    pub qtype: RecordType,
    pub qclass: u16,
}

impl DnsQuestion {
    /// Appends name, type and class to `buffer`.
    ///
    /// # Errors
    ///
    /// Returns [`DnsError::InvalidLabel`] if the name cannot be encoded.
    pub fn pack(&self, buffer: &mut Vec<u8>) -> Result<(), DnsError> {
        pack_domain_name(buffer, &self.name)?;
        buffer.extend_from_slice(&u16::from(self.qtype).to_be_bytes());
        buffer.extend_from_slice(&self.qclass.to_be_bytes());
        Ok(())
    }

    /// Reads one question, consuming the name's bytes plus four.
    pub fn from_reader(reader: &mut ByteReader<'_>) -> Result<Self, DnsError> {
        let name = unpack_domain_name(reader)?;
        let qtype = RecordType::from(reader.read_u16()?);
        let qclass = reader.read_u16()?;

        Ok(DnsQuestion {
            name,
            qtype,
            qclass,
        })
    }
}

/// The payload of a resource record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RData {
    A(Ipv4Addr),
    /// Host name of a name server, compression already resolved.
    NS(String),
    /// Raw RDATA of a type this crate does not interpret.
    Other { rtype: u16, data: Vec<u8> },
}

/// A resource record from the answer, authority or additional section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    pub name: String,
    pub rtype: RecordType,
    pub rclass: u16,
    pub ttl: u32,
    pub data: RData,
}

impl fmt::Display for ResourceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<30} {:<10} {:<6} {}",
            self.name, self.ttl, self.rtype, self.data
        )
    }
}

impl fmt::Display for RData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RData::A(addr) => write!(f, "{}", addr),
            RData::NS(name) => write!(f, "{}", name),
            RData::Other { data, .. } => write!(f, "\\# {}", data.len()),
        }
    }
}

impl ResourceRecord {
    /// Returns the address if this is an A record.
    pub fn ipv4_address(&self) -> Option<Ipv4Addr> {
        match &self.data {
            RData::A(addr) => Some(*addr),
            _ => None,
        }
    }

    /// Returns the name server host name if this is an NS record.
    pub fn nameserver(&self) -> Option<&str> {
        match &self.data {
            RData::NS(name) => Some(name),
            _ => None,
        }
    }

    /// Reads one resource record.
    ///
    /// The reader ends exactly `RDLENGTH` bytes after the fixed fields,
    /// whatever the payload type. NS payloads are decoded against the full
    /// message so compression pointers inside them resolve.
    ///
    /// # Errors
    ///
    /// - [`DnsError::OutOfBounds`] if the record or its RDATA runs past the buffer
    /// - [`DnsError::Malformed`] if an A payload is not 4 bytes or an NS name
    ///   overruns its RDATA
    pub fn from_reader(reader: &mut ByteReader<'_>) -> Result<Self, DnsError> {
        let name = unpack_domain_name(reader)?;
        let rtype_val = reader.read_u16()?;
        let rtype = RecordType::from(rtype_val);
        let rclass = reader.read_u16()?;
        let ttl = reader.read_u32()?;
        let data_len = reader.read_u16()? as usize;

        let data_start = reader.position();
        let rdata = reader.read_bytes(data_len)?;

        let data = match rtype {
            RecordType::A => {
                let octets: [u8; 4] = rdata.try_into().map_err(|_| {
                    DnsError::Malformed(format!(
                        "A record for '{}' has {} bytes of data, expected 4",
                        name, data_len
                    ))
                })?;
                RData::A(Ipv4Addr::from(octets))
            }
            RecordType::NS => {
                let (host, consumed) = decode_name(reader.buffer(), data_start)?;
                if consumed > data_len {
                    return Err(DnsError::Malformed(format!(
                        "NS name for '{}' spans {} bytes, RDLENGTH is {}",
                        name, consumed, data_len
                    )));
                }
                RData::NS(host)
            }
            _ => RData::Other {
                rtype: rtype_val,
                data: rdata.to_vec(),
            },
        };

        Ok(ResourceRecord {
            name,
            rtype,
            rclass,
            ttl,
            data,
        })
    }
}

/// A complete DNS message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DnsMessage {
    pub header: DnsHeader,
    pub questions: Vec<DnsQuestion>,
    pub answers: Vec<ResourceRecord>,
    pub authorities: Vec<ResourceRecord>,
    pub additionals: Vec<ResourceRecord>,
}

impl DnsMessage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a single-question query with the Recursion Desired bit set.
    ///
    /// # Errors
    ///
    /// Returns [`DnsError::InvalidLabel`] if `domain` cannot be encoded. The
    /// name is checked here so a bad domain never reaches the network.
    pub fn query(id: u16, domain: &str, qtype: RecordType) -> Result<Self, DnsError> {
        encode_name(domain)?;

        let mut message = DnsMessage::new();
        message.header.id = id;
        message.header.flags = FLAG_RECURSION_DESIRED;
        message.header.question_count = 1;
        message.questions.push(DnsQuestion {
            name: domain.to_string(),
            qtype,
            qclass: CLASS_IN,
        });
        Ok(message)
    }

    /// Serializes the header and questions.
    ///
    /// Resource records are never sent by a stub client, so they are not packed.
    pub fn pack(&self, buffer: &mut Vec<u8>) -> Result<(), DnsError> {
        self.header.pack(buffer);
        for question in &self.questions {
            question.pack(buffer)?;
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, DnsError> {
        let mut buffer = Vec::with_capacity(HEADER_LEN + 32);
        self.pack(&mut buffer)?;
        Ok(buffer)
    }

    /// Parses a complete response.
    ///
    /// Section lengths always equal the header counts; a header that claims
    /// more entries than the buffer holds fails with
    /// [`DnsError::OutOfBounds`]. Bytes after the last record are ignored.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use iterative_resolver::dns::DnsMessage;
    ///
    /// let mut bytes = vec![0x12, 0x34, 0x81, 0x80, 0, 1, 0, 1, 0, 0, 0, 0];
    /// bytes.extend_from_slice(b"\x07example\x03com\x00\x00\x01\x00\x01");
    /// // answer: pointer to the question name, A, IN, TTL 300, 4 bytes
    /// bytes.extend_from_slice(&[0xc0, 0x0c, 0, 1, 0, 1, 0, 0, 1, 44, 0, 4, 93, 184, 216, 34]);
    ///
    /// let message = DnsMessage::from_bytes(&bytes).unwrap();
    /// assert_eq!(message.answers[0].name, "example.com");
    /// assert_eq!(message.answers[0].ipv4_address().unwrap().to_string(), "93.184.216.34");
    /// ```
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DnsError> {
        let mut reader = ByteReader::new(bytes);
        let header = DnsHeader::from_reader(&mut reader)?;

        let mut questions = Vec::with_capacity(header.question_count as usize);
        for _ in 0..header.question_count {
            questions.push(DnsQuestion::from_reader(&mut reader)?);
        }

        let answers = read_records(&mut reader, header.answer_count)?;
        let authorities = read_records(&mut reader, header.authority_count)?;
        let additionals = read_records(&mut reader, header.additional_count)?;

        trace!(
            id = header.id,
            answers = answers.len(),
            authorities = authorities.len(),
            additionals = additionals.len(),
            trailing = reader.remaining().len(),
            "DNS message decoded"
        );

        Ok(DnsMessage {
            header,
            questions,
            answers,
            authorities,
            additionals,
        })
    }
}

fn read_records(
    reader: &mut ByteReader<'_>,
    count: u16,
) -> Result<Vec<ResourceRecord>, DnsError> {
    // Capacity is bounded by what the buffer could possibly hold, not by the
    // header's claim.
    let max_possible = reader.remaining().len() / 11;
    let mut records = Vec::with_capacity((count as usize).min(max_possible));
    for _ in 0..count {
        records.push(ResourceRecord::from_reader(reader)?);
    }
    Ok(records)
}

/// Builds the wire bytes of a single-question query with a random id.
///
/// # Examples
///
/// ```rust
/// use iterative_resolver::dns::{build_query, RecordType};
///
/// let bytes = build_query("example.com", RecordType::A).unwrap();
/// assert_eq!(&bytes[2..12], &[0x01, 0x00, 0, 1, 0, 0, 0, 0, 0, 0]);
/// assert_eq!(&bytes[bytes.len() - 4..], &[0, 1, 0, 1]);
/// ```
pub fn build_query(domain: &str, qtype: RecordType) -> Result<Vec<u8>, DnsError> {
    DnsMessage::query(fastrand::u16(..), domain, qtype)?.to_bytes()
}
