//! Crate error types and the `errno!` helper for failed libc calls.

use std::{error, fmt, io, result};

/// Creates an [`std::io::Error`] with a custom message prefixed to the current
/// `errno` value.
macro_rules! errno {
    ($($arg:tt)+) => {{
        let errno = ::std::io::Error::last_os_error();
        let prefix = format!($($arg)+);
        let msg = format!("{prefix}: {errno}");
        ::std::io::Error::new(errno.kind(), msg)
    }};
}
pub(crate) use errno;

/// A convenience wrapper around `Result` for [crate::Error].
pub type Result<T> = result::Result<T, Error>;

/// Represents errors that can occur while capturing and decoding packets.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// The raw socket could not be created, bound, or configured. Fatal: the
    /// receive loop is never entered.
    Setup(io::Error),
    /// An I/O error occurred while receiving packets or writing output.
    Io(io::Error),
    /// An error occurred while decoding a captured packet.
    Parse(ParseError),
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::Setup(ref e) | Error::Io(ref e) => Some(e),
            Error::Parse(ref e) => Some(e),
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Error {
        Error::Parse(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::Setup(ref e) => write!(f, "socket setup failed: {e}"),
            Error::Io(ref e) => fmt::Display::fmt(e, f),
            Error::Parse(ref e) => fmt::Display::fmt(e, f),
        }
    }
}

/// Represents errors that can occur during IPv4 header decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// The input buffer is smaller than the fixed IPv4 header.
    TruncatedHeader {
        /// The length of the input buffer provided.
        provided: usize,
        /// The minimum required length for the header.
        minimum: usize,
    },
}

impl error::Error for ParseError {}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ParseError::TruncatedHeader { provided, minimum } => {
                write!(
                    f,
                    "truncated IPv4 header: {provided} bytes (less than minimum required {minimum} bytes)",
                )
            }
        }
    }
}
