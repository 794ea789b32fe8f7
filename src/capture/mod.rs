//! The capture loop: receive raw datagrams, decode them, print a summary.

mod signal;
mod socket;

pub use signal::Interrupt;
pub use socket::{RECV_BUF_LEN, RawSocket};

use std::io::Write;

use crate::config::Config;
use crate::parse;
use crate::{Result, debug, info, warn};

/// Outcome of waiting on a [PacketSource].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A datagram of the given length was written to the buffer.
    Packet(usize),
    /// The operator asked capture to stop.
    Interrupted,
}

/// A blocking supplier of raw IPv4 datagrams.
pub trait PacketSource {
    /// Blocks until a datagram is written into `buf` or an interrupt arrives.
    ///
    /// # Errors
    ///
    /// Returns an error if receiving fails.
    fn next_packet(&mut self, buf: &mut [u8]) -> Result<Event>;
}

/// Drives a [PacketSource], writing one summary line per decoded packet (and
/// optionally a payload dump) to `out`.
#[derive(Debug)]
pub struct Sniffer<S, W> {
    source: S,
    out: W,
    dump_payload: bool,
    printed: u64,
    skipped: u64,
}

impl<S: PacketSource, W: Write> Sniffer<S, W> {
    /// Creates a sniffer over `source` that writes to `out`.
    pub fn new(source: S, out: W, config: &Config) -> Self {
        Self {
            source,
            out,
            dump_payload: config.dump_payload,
            printed: 0,
            skipped: 0,
        }
    }

    /// Number of packets summarized so far.
    pub fn printed(&self) -> u64 {
        self.printed
    }

    /// Number of packets dropped because they could not be decoded.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Consumes the sniffer, returning the output sink.
    pub fn into_output(self) -> W {
        self.out
    }

    /// Receives and prints packets until the source reports an interrupt.
    ///
    /// Packets too short to hold an IPv4 header are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if receiving from the source or writing the output
    /// fails.
    pub fn run(&mut self) -> Result<()> {
        let mut buf = vec![0u8; RECV_BUF_LEN];

        loop {
            let nbytes = match self.source.next_packet(&mut buf)? {
                Event::Packet(n) => n.min(buf.len()),
                Event::Interrupted => {
                    info!(
                        "capture interrupted: {} packets printed, {} skipped",
                        self.printed, self.skipped
                    );
                    return Ok(());
                }
            };

            self.handle(&buf[..nbytes])?;
        }
    }

    fn handle(&mut self, raw: &[u8]) -> Result<()> {
        let header = match parse::decode(raw) {
            Ok(header) => header,
            Err(err) => {
                warn!("skipping packet: {err}");
                self.skipped += 1;
                return Ok(());
            }
        };

        debug!(
            "ver={} ihl={} tos={:#04x} len={} id={} df={} mf={} off={} ttl={} proto={} csum={:#06x} captured={}",
            header.version(),
            header.ihl(),
            header.tos(),
            header.total_len(),
            header.id(),
            header.dont_fragment(),
            header.more_fragments(),
            header.fragment_offset(),
            header.ttl(),
            header.protocol_number(),
            header.header_checksum(),
            raw.len(),
        );

        writeln!(self.out, "{}", parse::format_summary(&header))?;

        if self.dump_payload {
            writeln!(self.out, "{}", parse::format_payload(raw))?;
        }

        self.out.flush()?;
        self.printed += 1;

        Ok(())
    }
}
