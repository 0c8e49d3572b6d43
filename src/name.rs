//! Domain name encoding and decoding (RFC 1035 section 4.1.4).
//!
//! Names travel as a sequence of length-prefixed labels closed by a zero byte.
//! Responses may replace any suffix of a name with a two-byte compression
//! pointer into an earlier part of the same message, so decoding always works
//! against the full message buffer rather than a record-local slice.

use crate::cursor::ByteReader;
use crate::error::DnsError;

/// Longest label allowed on the wire.
pub const MAX_LABEL_LEN: usize = 63;

/// Longest encoded name, terminator included.
pub const MAX_NAME_LEN: usize = 255;

/// Hard cap on pointer jumps while decoding one name.
const MAX_POINTER_JUMPS: usize = 128;

const POINTER_MASK: u8 = 0b1100_0000;

/// Encodes `domain` as wire labels and appends them to `buffer`.
///
/// A single trailing dot is ignored; an empty domain (or `"."`) is the root
/// and encodes to a lone zero byte. `buffer` is left untouched on failure.
///
/// # Examples
///
/// ```rust
/// use iterative_resolver::name::pack_domain_name;
///
/// let mut buffer = Vec::new();
/// pack_domain_name(&mut buffer, "example.com").unwrap();
/// assert_eq!(buffer, b"\x07example\x03com\x00");
/// ```
///
/// # Errors
///
/// Returns [`DnsError::InvalidLabel`] for labels longer than 63 bytes, empty
/// interior labels, or names whose encoding exceeds 255 bytes.
pub fn pack_domain_name(buffer: &mut Vec<u8>, domain: &str) -> Result<(), DnsError> {
    let encoded = encode_name(domain)?;
    buffer.extend_from_slice(&encoded);
    Ok(())
}

/// Encodes `domain` into a freshly allocated label sequence.
pub fn encode_name(domain: &str) -> Result<Vec<u8>, DnsError> {
    let invalid = |reason: String| DnsError::InvalidLabel {
        domain: domain.to_string(),
        reason,
    };

    let trimmed = domain.strip_suffix('.').unwrap_or(domain);
    let mut encoded = Vec::with_capacity(trimmed.len() + 2);

    if !trimmed.is_empty() {
        for label in trimmed.split('.') {
            let len = label.len();
            if len == 0 {
                return Err(invalid("empty label".to_string()));
            }
            if len > MAX_LABEL_LEN {
                return Err(invalid(format!(
                    "label '{}' exceeds maximum length of {} bytes",
                    label, MAX_LABEL_LEN
                )));
            }
            encoded.push(len as u8);
            encoded.extend_from_slice(label.as_bytes());
        }
    }
    encoded.push(0);

    if encoded.len() > MAX_NAME_LEN {
        return Err(invalid(format!(
            "encoded name is {} bytes, limit is {}",
            encoded.len(),
            MAX_NAME_LEN
        )));
    }
    Ok(encoded)
}

/// Decodes the name starting at `start` in `message`.
///
/// Returns the dotted name and the number of bytes the name occupies at
/// `start`. A compression pointer counts as exactly two bytes no matter how
/// long the name it points to is. The root name decodes to `""`.
///
/// # Examples
///
/// ```rust
/// use iterative_resolver::name::decode_name;
///
/// // "example.com" at offset 0, then "www" followed by a pointer to offset 0.
/// let message = b"\x07example\x03com\x00\x03www\xc0\x00";
///
/// assert_eq!(decode_name(message, 0).unwrap(), ("example.com".to_string(), 13));
/// assert_eq!(decode_name(message, 13).unwrap(), ("www.example.com".to_string(), 6));
/// ```
///
/// # Errors
///
/// - [`DnsError::OutOfBounds`] if a label or pointer runs past the buffer
/// - [`DnsError::CompressionLoop`] if pointers keep jumping without terminating
/// - [`DnsError::Malformed`] for the reserved `01`/`10` label types, or a
///   label holding a `.` that would not survive re-encoding
pub fn decode_name(message: &[u8], start: usize) -> Result<(String, usize), DnsError> {
    let mut labels: Vec<String> = Vec::new();
    let mut pos = start;
    let mut consumed: Option<usize> = None;
    let mut jumps = 0;
    let max_jumps = message.len().min(MAX_POINTER_JUMPS);

    loop {
        let len = *message.get(pos).ok_or_else(|| out_of_bounds(message, pos, 1))?;

        match len & POINTER_MASK {
            POINTER_MASK => {
                let low = *message
                    .get(pos + 1)
                    .ok_or_else(|| out_of_bounds(message, pos, 2))?;
                if consumed.is_none() {
                    consumed = Some(pos + 2 - start);
                }
                jumps += 1;
                if jumps > max_jumps {
                    return Err(DnsError::CompressionLoop { offset: pos });
                }
                pos = (((len & !POINTER_MASK) as usize) << 8) | low as usize;
            }
            0 if len == 0 => {
                if consumed.is_none() {
                    consumed = Some(pos + 1 - start);
                }
                break;
            }
            0 => {
                let len = len as usize;
                let label = message
                    .get(pos + 1..pos + 1 + len)
                    .ok_or_else(|| out_of_bounds(message, pos + 1, len))?;
                if label.contains(&b'.') {
                    return Err(DnsError::Malformed(format!(
                        "label at offset {} contains a '.'",
                        pos
                    )));
                }
                labels.push(String::from_utf8_lossy(label).into_owned());
                pos += 1 + len;
            }
            _ => {
                return Err(DnsError::Malformed(format!(
                    "reserved label type {:#04x} at offset {}",
                    len, pos
                )));
            }
        }
    }

    Ok((labels.join("."), consumed.unwrap_or(0)))
}

/// Decodes the name at the reader's position and advances past it.
pub fn unpack_domain_name(reader: &mut ByteReader<'_>) -> Result<String, DnsError> {
    let (name, consumed) = decode_name(reader.buffer(), reader.position())?;
    reader.skip(consumed)?;
    Ok(name)
}

fn out_of_bounds(message: &[u8], offset: usize, needed: usize) -> DnsError {
    DnsError::OutOfBounds {
        offset,
        needed,
        available: message.len().saturating_sub(offset),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_domain_name() {
        let mut buffer = Vec::new();
        pack_domain_name(&mut buffer, "www.google.com").unwrap();
        assert_eq!(
            buffer,
            vec![
                3, b'w', b'w', b'w', 6, b'g', b'o', b'o', b'g', b'l', b'e', 3, b'c', b'o', b'm', 0
            ]
        );
    }

    #[test]
    fn test_root_and_trailing_dot() {
        assert_eq!(encode_name("").unwrap(), vec![0]);
        assert_eq!(encode_name(".").unwrap(), vec![0]);
        assert_eq!(encode_name("com.").unwrap(), encode_name("com").unwrap());
        assert_eq!(decode_name(&[0], 0).unwrap(), (String::new(), 1));
    }

    #[test]
    fn test_label_length_limit() {
        let ok = "a".repeat(63);
        assert!(encode_name(&format!("{}.com", ok)).is_ok());

        let too_long = "a".repeat(64);
        let mut buffer = vec![0xff];
        let err = pack_domain_name(&mut buffer, &format!("{}.com", too_long)).unwrap_err();
        assert!(matches!(err, DnsError::InvalidLabel { .. }));
        assert_eq!(buffer, vec![0xff]);
    }

    #[test]
    fn test_empty_interior_label_rejected() {
        assert!(matches!(
            encode_name("a..b"),
            Err(DnsError::InvalidLabel { .. })
        ));
    }

    #[test]
    fn test_name_length_limit() {
        let label = "a".repeat(63);
        let name = vec![label.as_str(); 4].join(".");
        // 4 * 64 + 1 = 257 bytes
        assert!(matches!(
            encode_name(&name),
            Err(DnsError::InvalidLabel { .. })
        ));
    }

    #[test]
    fn test_round_trip() {
        for name in [
            "a",
            "example.com",
            "ns1.example.net",
            "www.a-very-long-label-that-still-fits-in-sixty-three-bytes.org",
        ] {
            let encoded = encode_name(name).unwrap();
            let (decoded, consumed) = decode_name(&encoded, 0).unwrap();
            assert_eq!(decoded, name);
            assert_eq!(consumed, encoded.len());
        }
    }

    #[test]
    fn test_unpack_simple_domain_name() {
        let data = vec![
            3, b'w', b'w', b'w', 6, b'g', b'o', b'o', b'g', b'l', b'e', 3, b'c', b'o', b'm', 0,
            0xaa,
        ];
        let mut reader = ByteReader::new(&data);
        let name = unpack_domain_name(&mut reader).unwrap();
        assert_eq!(name, "www.google.com");
        assert_eq!(reader.position(), 16);
    }

    #[test]
    fn test_unpack_compressed_domain_name() {
        let data = vec![
            0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, // 12 bytes
            // "www.google.com" at offset 12
            3, b'w', b'w', b'w', 6, b'g', b'o', b'o', b'g', b'l', b'e', 3, b'c', b'o', b'm', 0,
            0xde, 0xad, 0xbe, 0xef, // pointer to offset 12 at offset 32
            0xc0, 0x0c,
        ];
        let (direct, _) = decode_name(&data, 12).unwrap();
        let (name, consumed) = decode_name(&data, 32).unwrap();
        assert_eq!(name, "www.google.com");
        assert_eq!(name, direct);
        assert_eq!(consumed, 2);
    }

    #[test]
    fn test_labels_then_pointer() {
        let data = vec![
            0x01, b'f', 0x07, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 0x03, b'c', b'o', b'm',
            0x00, // "f.example.com" at 0
            0x03, b'w', b'w', b'w', 0xc0, 0x02, // "www" + pointer to "example.com"
        ];
        let mut reader = ByteReader::new(&data);
        reader.skip(15).unwrap();

        let name = unpack_domain_name(&mut reader).unwrap();
        assert_eq!(name, "www.example.com");
        assert_eq!(reader.position(), 21);
    }

    #[test]
    fn test_chained_pointers() {
        let data = vec![
            0x03, b'c', b'o', b'm', 0x00, // "com" at 0
            0x07, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 0xc0, 0x00, // "example" + ptr at 5
            0x03, b'w', b'w', b'w', 0xc0, 0x05, // "www" + ptr at 15
        ];
        assert_eq!(
            decode_name(&data, 15).unwrap(),
            ("www.example.com".to_string(), 6)
        );
    }

    #[test]
    fn test_pointer_loop_is_rejected() {
        // Two pointers that point at each other.
        let data = vec![0xc0, 0x02, 0xc0, 0x00];
        assert!(matches!(
            decode_name(&data, 0),
            Err(DnsError::CompressionLoop { .. })
        ));

        let self_loop = vec![0x00, 0x00, 0xc0, 0x02];
        assert!(matches!(
            decode_name(&self_loop, 2),
            Err(DnsError::CompressionLoop { .. })
        ));
    }

    #[test]
    fn test_truncated_names() {
        // label claims 5 bytes but only 2 follow
        assert!(matches!(
            decode_name(&[5, b'a', b'b'], 0),
            Err(DnsError::OutOfBounds { .. })
        ));
        // no terminator
        assert!(matches!(
            decode_name(&[1, b'a'], 0),
            Err(DnsError::OutOfBounds { .. })
        ));
        // pointer missing its second byte
        assert!(matches!(
            decode_name(&[0xc0], 0),
            Err(DnsError::OutOfBounds { .. })
        ));
        // pointer past the end
        assert!(matches!(
            decode_name(&[0xc0, 0x40], 0),
            Err(DnsError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_reserved_label_type() {
        assert!(matches!(
            decode_name(&[0x41, b'a', 0], 0),
            Err(DnsError::Malformed(_))
        ));
    }

    #[test]
    fn test_dotted_label_is_rejected() {
        // one label "a.b" would come back as two labels once re-encoded
        let data = b"\x03a.b\x03com\x00";
        assert!(matches!(
            decode_name(data, 0),
            Err(DnsError::Malformed(_))
        ));
    }
}
