//! Decoding of the fixed IPv4 header and rendering of decoded packets.

mod ipv4;
mod render;

pub use ipv4::{IPv4Header, Protocol, classify_protocol, decode};
pub use render::{PAYLOAD_END, PAYLOAD_START, format_payload, format_summary};
