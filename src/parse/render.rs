//! Text rendering of decoded packets for the terminal.

use super::IPv4Header;

/// Opening banner of a payload dump.
pub const PAYLOAD_START: &str = "**********ASCII START**********";

/// Closing banner of a payload dump.
pub const PAYLOAD_END: &str = "**********ASCII END**********";

/// Formats the one-line summary: `Protocol: {label} {src} -> {dst}`.
pub fn format_summary(header: &IPv4Header) -> String {
    header.to_string()
}

/// Renders the payload of `raw` (bytes `[20..]`) between the dump banners.
///
/// Each byte is mapped directly onto the code point of the same value
/// (Latin-1), so bytes >= 128 never produce replacement characters. Renderings
/// are separated by a single space. The result spans three lines, the middle
/// one empty when there is no payload, and carries no trailing newline.
pub fn format_payload(raw: &[u8]) -> String {
    let payload = IPv4Header::payload(raw);

    let mut out =
        String::with_capacity(PAYLOAD_START.len() + PAYLOAD_END.len() + payload.len() * 3 + 2);

    out.push_str(PAYLOAD_START);
    out.push('\n');

    for (i, &byte) in payload.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push(char::from(byte));
    }

    out.push('\n');
    out.push_str(PAYLOAD_END);

    out
}
