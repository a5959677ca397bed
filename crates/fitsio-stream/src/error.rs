//! Error type shared by every stage of decoding.

use alloc::string::String;

use crate::io::IoError;

/// All errors that can occur while decoding a FITS stream.
#[derive(Debug)]
pub enum Error {
    /// A keyword required by the HDU class is absent or has the wrong type.
    MissingKeyword(String),
    /// Unrecognized BITPIX value.
    InvalidBitpix(i64),
    /// A header is structurally wrong (bad NAXIS, bad TBCOL, row overflow, ...).
    InvalidHeader(String),
    /// A quoted string literal is malformed or never closed.
    InvalidString,
    /// A TFORM code the decoder does not support.
    UnsupportedForm(String),
    /// The underlying byte source failed.
    Io(IoError),
}

/// Coarse classification of [`Error`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing mandatory keyword, invalid BITPIX, bad quoted string, missing NAXISn.
    MalformedHeader,
    /// Binary codes X/P/Q, or text codes outside A/I/D/E/F.
    UnsupportedForm,
    /// Any read failure other than orderly exhaustion.
    Io,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;

impl Error {
    /// Returns the taxonomy bucket this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MissingKeyword(_)
            | Error::InvalidBitpix(_)
            | Error::InvalidHeader(_)
            | Error::InvalidString => ErrorKind::MalformedHeader,
            Error::UnsupportedForm(_) => ErrorKind::UnsupportedForm,
            Error::Io(_) => ErrorKind::Io,
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::MissingKeyword(kw) => write!(f, "missing required keyword: {kw}"),
            Error::InvalidBitpix(v) => write!(f, "invalid BITPIX value: {v}"),
            Error::InvalidHeader(msg) => write!(f, "invalid FITS header: {msg}"),
            Error::InvalidString => write!(f, "malformed quoted string value"),
            Error::UnsupportedForm(form) => write!(f, "unsupported TFORM: {form}"),
            Error::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<IoError> for Error {
    fn from(e: IoError) -> Self {
        Error::Io(e)
    }
}
