//! Raw-socket IPv4 packet sniffer.
//!
//! Captures datagrams for a single transport protocol on a local address,
//! decodes the fixed IPv4 header, and prints a one-line summary per packet,
//! optionally followed by a dump of the payload bytes.
//!
//! Diagnostic tool; no reassembly, checksum validation, or IPv6.

#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

#[cfg(not(target_os = "linux"))]
compile_error!("This crate is only compatible with Linux systems that support raw sockets and signalfd.");

pub mod capture;
pub mod config;
pub mod error;
pub mod log;
pub mod parse;

pub use error::{Error, ParseError, Result};
