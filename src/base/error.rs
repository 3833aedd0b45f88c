use std::error;
use std::fmt;
use std::io;

/// Represents errors that can occur while talking to an SDS011 sensor.
///
/// Malformed frames and transport timeouts are deliberately NOT errors:
/// the read paths report them as an absent value (`Ok(None)`) so the
/// caller can simply retry.
#[derive(Debug)]
pub enum Error {
    /// The buffer provided is too small for command encoding.
    BufferTooSmall,

    /// An I/O error occurred on the underlying transport (e.g. the
    /// serial port).
    IoError(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BufferTooSmall => write!(f, "buffer is too small for command encoding"),
            Error::IoError(err) => write!(f, "io error: {}", err),
        }
    }
}

impl error::Error for Error {}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::IoError(err)
    }
}

/// A specialized `Result` type for SDS011 operations.
pub type Result<T> = std::result::Result<T, Error>;
