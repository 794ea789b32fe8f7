//! Command-line options and the capture configuration derived from them.

use std::net::Ipv4Addr;

use clap::{ArgAction, Parser, ValueEnum};

use crate::log::Level;

/// Transport protocol the raw socket is opened for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CaptureProtocol {
    /// Capture TCP segments (`IPPROTO_TCP`).
    Tcp,
    /// Capture ICMP messages (`IPPROTO_ICMP`).
    Icmp,
}

impl CaptureProtocol {
    /// Returns the protocol number passed to `socket(2)`.
    pub fn as_raw(self) -> libc::c_int {
        match self {
            CaptureProtocol::Tcp => libc::IPPROTO_TCP,
            CaptureProtocol::Icmp => libc::IPPROTO_ICMP,
        }
    }
}

/// Capture raw IPv4 packets and print a one-line summary for each.
#[derive(Parser, Debug)]
#[command(name = "ipsniff")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Local IPv4 address to bind the raw socket to
    #[arg(long = "ip", value_name = "ADDR")]
    pub ip: Ipv4Addr,

    /// Transport protocol to capture
    #[arg(
        long = "protocol",
        alias = "protocal",
        value_enum,
        ignore_case = true,
        value_name = "PROTO"
    )]
    pub protocol: CaptureProtocol,

    /// Print the payload bytes after each summary line
    #[arg(long = "data")]
    pub data: bool,

    /// Enable debug logging (per-packet header details)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only log errors
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,
}

impl Args {
    /// Returns the log level selected by `-v` / `-q`.
    pub fn log_level(&self) -> Level {
        if self.quiet {
            Level::Error
        } else if self.verbose > 0 {
            Level::Debug
        } else {
            Level::Info
        }
    }
}

/// Settings the capture loop is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Address the raw socket is bound to.
    pub host: Ipv4Addr,
    /// Protocol the raw socket is opened for.
    pub protocol: CaptureProtocol,
    /// Whether payload bytes are rendered after each summary.
    pub dump_payload: bool,
}

impl From<&Args> for Config {
    fn from(args: &Args) -> Self {
        Self {
            host: args.ip,
            protocol: args.protocol,
            dump_payload: args.data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_required_options() {
        let args = Args::try_parse_from(["ipsniff", "--ip", "10.0.0.5", "--protocol", "icmp"])
            .unwrap();
        let config = Config::from(&args);

        assert_eq!(config.host, Ipv4Addr::new(10, 0, 0, 5));
        assert_eq!(config.protocol, CaptureProtocol::Icmp);
        assert!(!config.dump_payload);
        assert_eq!(args.log_level(), Level::Info);
    }

    #[test]
    fn accepts_legacy_spelling_and_case() {
        let args = Args::try_parse_from([
            "ipsniff",
            "--ip",
            "127.0.0.1",
            "--protocal",
            "TCP",
            "--data",
        ])
        .unwrap();
        let config = Config::from(&args);

        assert_eq!(config.protocol, CaptureProtocol::Tcp);
        assert!(config.dump_payload);
    }

    #[test]
    fn rejects_unknown_protocol() {
        let res = Args::try_parse_from(["ipsniff", "--ip", "127.0.0.1", "--protocol", "udp"]);
        assert!(res.is_err());
    }

    #[test]
    fn rejects_missing_or_invalid_address() {
        assert!(Args::try_parse_from(["ipsniff", "--protocol", "tcp"]).is_err());
        assert!(
            Args::try_parse_from(["ipsniff", "--ip", "not-an-ip", "--protocol", "tcp"]).is_err()
        );
    }

    #[test]
    fn verbosity_flags() {
        let args =
            Args::try_parse_from(["ipsniff", "--ip", "127.0.0.1", "--protocol", "tcp", "-v"])
                .unwrap();
        assert_eq!(args.log_level(), Level::Debug);

        let args =
            Args::try_parse_from(["ipsniff", "--ip", "127.0.0.1", "--protocol", "tcp", "-q"])
                .unwrap();
        assert_eq!(args.log_level(), Level::Error);

        let res = Args::try_parse_from([
            "ipsniff",
            "--ip",
            "127.0.0.1",
            "--protocol",
            "tcp",
            "-v",
            "-q",
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn protocol_numbers() {
        assert_eq!(CaptureProtocol::Tcp.as_raw(), 6);
        assert_eq!(CaptureProtocol::Icmp.as_raw(), 1);
    }
}
