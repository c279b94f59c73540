use std::convert::From;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Generic(&'static str),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    /// The capture layer rejected the filter expression
    #[error("filter syntax error: {0}")]
    InvalidFilterSyntax(String),
    /// The capture device or driver could not be opened
    #[error("failed to open capture device: {0}")]
    DriverOpenFailed(String),
    #[error("failed to read packet: {0}")]
    Recv(String),
    /// No packet was available before the read timeout expired
    #[error("read timeout expired")]
    Timeout,
    #[error("failed to send packet: {0}")]
    Send(String),
    /// Input data is shorter than the layout being read or copied
    #[error("truncated packet: {0}")]
    Truncated(&'static str),
    #[error("unsupported: {0}")]
    Unsupported(&'static str),
}

impl From<&'static str> for Error {
    fn from(s: &'static str) -> Self {
        Error::Generic(s)
    }
}

impl Error {
    /// Return `true` if this error happens before any packet can be processed
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::InvalidFilterSyntax(_) | Error::DriverOpenFailed(_)
        )
    }
}
