use std::fmt;
use std::net::Ipv4Addr;

use crate::ParseError;

/// Decoded view over the fixed part of an IPv4 datagram header (RFC 791 3.1).
///
/// ```text
///   0                   1                   2                   3
///    0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
///   +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///   |Version|  IHL  |Type of Service|          Total Length         |
///   +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///   |         Identification        |Flags|      Fragment Offset    |
///   +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///   |  Time to Live |    Protocol   |         Header Checksum       |
///   +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///   |                       Source Address                          |
///   +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///   |                    Destination Address                        |
///   +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// Only the first 20 bytes are ever read. Field values are taken as-is: the
/// version, IHL, total length and checksum are reported, never validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IPv4Header {
    /// Version (high nibble) and IHL in 32-bit words (low nibble).
    version_ihl: u8,
    tos: u8,
    total_len: u16,
    id: u16,
    /// Reserved/DF/MF flags in the top 3 bits, fragment offset in the lower 13.
    flags_and_offset: u16,
    ttl: u8,
    protocol: u8,
    header_checksum: u16,
    src_addr: [u8; 4],
    dst_addr: [u8; 4],
}

impl IPv4Header {
    /// Length of the fixed IPv4 header in bytes, and the offset at which the
    /// payload is taken.
    pub const MIN_HEADER_LEN: usize = 20;

    /// Returns the Version field.
    pub fn version(&self) -> u8 {
        // Stored in the higher 4 bits.
        self.version_ihl >> 4
    }

    /// Returns the IHL (Internet Header Length) field.
    ///
    /// The IHL specifies the header length in 32-bit (4-byte) words. It is not
    /// checked against the captured buffer.
    pub fn ihl(&self) -> u8 {
        // Stored in the lower 4 bits.
        self.version_ihl & 0xF
    }

    /// Returns the Type of Service field.
    pub fn tos(&self) -> u8 {
        self.tos
    }

    /// Returns the Total Length field.
    pub fn total_len(&self) -> u16 {
        self.total_len
    }

    /// Returns the Identification field.
    pub fn id(&self) -> u16 {
        self.id
    }

    /// Returns the raw flags and fragment offset word.
    pub fn flags_and_offset(&self) -> u16 {
        self.flags_and_offset
    }

    /// Checks if the DF (Don't Fragment) bit is set.
    pub fn dont_fragment(&self) -> bool {
        (self.flags_and_offset >> 14) & 1 == 1
    }

    /// Checks if the MF (More Fragments) bit is set.
    pub fn more_fragments(&self) -> bool {
        (self.flags_and_offset >> 13) & 1 == 1
    }

    /// Returns the Fragment Offset field.
    pub fn fragment_offset(&self) -> u16 {
        self.flags_and_offset & 0x1FFF
    }

    /// Returns the Time to Live field.
    pub fn ttl(&self) -> u8 {
        self.ttl
    }

    /// Returns the classified Protocol field.
    pub fn protocol(&self) -> Protocol {
        classify_protocol(self.protocol)
    }

    /// Returns the raw Protocol number.
    pub fn protocol_number(&self) -> u8 {
        self.protocol
    }

    /// Returns the Header Checksum field.
    pub fn header_checksum(&self) -> u16 {
        self.header_checksum
    }

    /// Returns the source address octets in network order.
    pub fn src(&self) -> [u8; 4] {
        self.src_addr
    }

    /// Returns the destination address octets in network order.
    pub fn dst(&self) -> [u8; 4] {
        self.dst_addr
    }

    /// Returns the source address.
    pub fn src_addr(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.src_addr)
    }

    /// Returns the destination address.
    pub fn dst_addr(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.dst_addr)
    }

    /// Returns the header length declared by the IHL, in bytes.
    ///
    /// Informational only; the payload always starts at
    /// [IPv4Header::MIN_HEADER_LEN].
    pub fn header_len(&self) -> usize {
        self.ihl() as usize * 4
    }

    /// Returns the bytes following the fixed 20-byte header of `raw`, or an
    /// empty slice if `raw` holds no payload.
    pub fn payload(raw: &[u8]) -> &[u8] {
        raw.get(Self::MIN_HEADER_LEN..).unwrap_or_default()
    }
}

impl TryFrom<&[u8]> for IPv4Header {
    type Error = ParseError;

    fn try_from(raw: &[u8]) -> Result<Self, Self::Error> {
        let Some(h) = raw.first_chunk::<{ IPv4Header::MIN_HEADER_LEN }>() else {
            return Err(ParseError::TruncatedHeader {
                provided: raw.len(),
                minimum: Self::MIN_HEADER_LEN,
            });
        };

        Ok(Self {
            version_ihl: h[0],
            tos: h[1],
            total_len: u16::from_be_bytes([h[2], h[3]]),
            id: u16::from_be_bytes([h[4], h[5]]),
            flags_and_offset: u16::from_be_bytes([h[6], h[7]]),
            ttl: h[8],
            protocol: h[9],
            header_checksum: u16::from_be_bytes([h[10], h[11]]),
            src_addr: [h[12], h[13], h[14], h[15]],
            dst_addr: [h[16], h[17], h[18], h[19]],
        })
    }
}

impl fmt::Display for IPv4Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Protocol: {} {} -> {}",
            self.protocol(),
            self.src_addr(),
            self.dst_addr()
        )
    }
}

/// Decodes the fixed IPv4 header from the first 20 bytes of `raw`.
///
/// # Errors
///
/// Returns [ParseError::TruncatedHeader] if `raw` is shorter than 20 bytes.
pub fn decode(raw: &[u8]) -> Result<IPv4Header, ParseError> {
    IPv4Header::try_from(raw)
}

/// Transport protocol carried by a datagram, as far as this tool cares.
///
/// Every protocol number maps to a variant; numbers without a name of their
/// own land in [Protocol::Other].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(clippy::upper_case_acronyms)]
pub enum Protocol {
    /// Internet Control Message (1).
    ICMP,
    /// Transmission Control (6).
    TCP,
    /// Any other protocol number.
    Other(u8),
}

impl From<u8> for Protocol {
    fn from(val: u8) -> Self {
        match val {
            1 => Protocol::ICMP,
            6 => Protocol::TCP,
            other => Protocol::Other(other),
        }
    }
}

impl From<Protocol> for u8 {
    fn from(proto: Protocol) -> u8 {
        match proto {
            Protocol::ICMP => 1,
            Protocol::TCP => 6,
            Protocol::Other(val) => val,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Protocol::ICMP => f.write_str("ICMP"),
            Protocol::TCP => f.write_str("TCP"),
            Protocol::Other(val) => write!(f, "{val}"),
        }
    }
}

/// Maps a protocol number onto its label. Never fails.
pub fn classify_protocol(proto: u8) -> Protocol {
    Protocol::from(proto)
}
