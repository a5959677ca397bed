//! Byte-source abstraction for the block reader in both `std` and `no_std` builds.
//!
//! With the `std` feature the standard library's `Read`, `Cursor` and
//! `io::Error` are re-exported as-is. Without it, a read-only subset is
//! provided so a [`BlockReader`](crate::block::BlockReader) can still page
//! blocks out of an in-memory buffer.

#[cfg(feature = "std")]
#[allow(unused_imports)]
pub use std::io::{Cursor, Error as IoError, Read, Result};

/// Returns `true` when a failed read should simply be retried.
#[cfg(feature = "std")]
pub(crate) fn is_interrupted(e: &IoError) -> bool {
    e.kind() == std::io::ErrorKind::Interrupted
}

// ── no_std: provide our own implementations ──

#[cfg(not(feature = "std"))]
mod nostd {
    /// Minimal I/O error type for `no_std` environments.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum IoError {
        /// The read was interrupted and may be retried.
        Interrupted,
        /// The source failed for a reason it describes itself.
        Other(&'static str),
    }

    impl core::fmt::Display for IoError {
        fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
            match self {
                IoError::Interrupted => write!(f, "operation interrupted"),
                IoError::Other(msg) => write!(f, "{msg}"),
            }
        }
    }

    /// Result type returned by [`Read`] implementations.
    pub type Result<T> = core::result::Result<T, IoError>;

    /// Read bytes from a source.
    pub trait Read {
        /// Pull some bytes from this source into `buf`, returning how many were
        /// read. `Ok(0)` means the source is exhausted.
        fn read(&mut self, buf: &mut [u8]) -> Result<usize>;
    }

    impl<R: Read + ?Sized> Read for &mut R {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
            (**self).read(buf)
        }
    }

    impl Read for &[u8] {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
            let n = buf.len().min(self.len());
            let (head, tail) = self.split_at(n);
            buf[..n].copy_from_slice(head);
            *self = tail;
            Ok(n)
        }
    }

    /// A read cursor over a byte buffer, the `no_std` stand-in for
    /// `std::io::Cursor`.
    #[derive(Debug, Clone)]
    pub struct Cursor<T> {
        inner: T,
        pos: usize,
    }

    impl<T> Cursor<T> {
        /// Create a new cursor wrapping the given byte buffer.
        pub fn new(inner: T) -> Self {
            Cursor { inner, pos: 0 }
        }

        /// Return the current byte offset of the cursor.
        pub fn position(&self) -> u64 {
            self.pos as u64
        }

        /// Consume the cursor, returning the wrapped buffer.
        pub fn into_inner(self) -> T {
            self.inner
        }
    }

    impl<T: AsRef<[u8]>> Read for Cursor<T> {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
            let data = self.inner.as_ref();
            if self.pos >= data.len() {
                return Ok(0);
            }
            let available = &data[self.pos..];
            let n = buf.len().min(available.len());
            buf[..n].copy_from_slice(&available[..n]);
            self.pos += n;
            Ok(n)
        }
    }
}

#[cfg(not(feature = "std"))]
pub use nostd::*;

#[cfg(not(feature = "std"))]
pub(crate) fn is_interrupted(e: &IoError) -> bool {
    *e == IoError::Interrupted
}

// ── Tests ──
