//! Fixed-size block paging over a byte source.

use alloc::format;
use alloc::vec;
use alloc::vec::Vec;

use log::{trace, warn};

use crate::endian::{read_f32_be, read_f64_be, read_i16_be, read_i32_be, read_i64_be};
use crate::error::{Error, Result};
use crate::io::{is_interrupted, Read};

/// FITS block size in bytes (each logical record is one block).
pub const BLOCK_SIZE: usize = 2880;

/// FITS card (keyword record) size in bytes.
pub const CARD_SIZE: usize = 80;

/// Number of cards that fit in a single block.
pub const CARDS_PER_BLOCK: usize = BLOCK_SIZE / CARD_SIZE;

/// Sequential reader over a source that is consumed in 2880-byte blocks.
///
/// Byte reads transparently cross block boundaries. Running out of source
/// data is not an error: reads return what was gathered and
/// [`is_exhausted`](Self::is_exhausted) flips to `true`. Any other failure of
/// the source is returned as [`Error::Io`](crate::Error::Io).
pub struct BlockReader<R> {
    source: R,
    block: Vec<u8>,
    /// Next unread position in `block`.
    left: usize,
    /// Number of valid bytes in `block`.
    right: usize,
    exhausted: bool,
    blocks_read: usize,
}

impl<R: Read> BlockReader<R> {
    /// Wrap `source`. Nothing is read until the first request.
    pub fn new(source: R) -> Self {
        BlockReader {
            source,
            block: vec![0u8; BLOCK_SIZE],
            left: 0,
            right: 0,
            exhausted: false,
            blocks_read: 0,
        }
    }

    /// Returns `true` once the source has reported end of data.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Number of blocks paged in so far, including a short final block.
    pub fn blocks_read(&self) -> usize {
        self.blocks_read
    }

    /// Consume the reader, returning the underlying source.
    pub fn into_inner(self) -> R {
        self.source
    }

    /// Page in the next block, replacing the current one.
    ///
    /// Keeps reading until a whole block is gathered or the source runs dry.
    /// Returns the number of valid bytes now held.
    fn fill_block(&mut self) -> Result<usize> {
        let mut filled = 0;
        while filled < BLOCK_SIZE {
            match self.source.read(&mut self.block[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if is_interrupted(&e) => continue,
                Err(e) => return Err(e.into()),
            }
        }

        self.left = 0;
        self.right = filled;
        if filled == 0 {
            self.exhausted = true;
            trace!("block source exhausted after {} blocks", self.blocks_read);
        } else {
            self.blocks_read += 1;
            if filled < BLOCK_SIZE {
                warn!(
                    "short block {}: {} of {} bytes",
                    self.blocks_read, filled, BLOCK_SIZE
                );
            }
        }
        Ok(filled)
    }

    /// Discard whatever is left of the current block and page in a fresh one.
    ///
    /// The whole new block is handed to the caller and counts as consumed, so
    /// the next byte read starts at the following block. Returns `None` when
    /// the source is exhausted.
    pub fn next_block(&mut self) -> Result<Option<&[u8]>> {
        if self.exhausted {
            return Ok(None);
        }
        let n = self.fill_block()?;
        if n == 0 {
            return Ok(None);
        }
        self.left = self.right;
        Ok(Some(&self.block[..n]))
    }

    /// Fill `dest` with the next bytes of the stream.
    ///
    /// Returns the number of bytes copied, which is smaller than `dest.len()`
    /// only when the source ran out.
    pub fn read_into(&mut self, dest: &mut [u8]) -> Result<usize> {
        let mut n = 0;
        while n < dest.len() {
            if self.left == self.right {
                if self.exhausted || self.fill_block()? == 0 {
                    break;
                }
            }
            let k = (dest.len() - n).min(self.right - self.left);
            dest[n..n + k].copy_from_slice(&self.block[self.left..self.left + k]);
            self.left += k;
            n += k;
        }
        Ok(n)
    }

    /// Read the next `n` bytes. The result is shorter than `n` only at end of
    /// stream.
    ///
    /// The buffer grows block by block as bytes arrive, so a large `n` read
    /// from a short stream allocates only what the stream holds.
    pub fn read(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(n.min(BLOCK_SIZE));
        while buf.len() < n {
            if self.left == self.right {
                if self.exhausted || self.fill_block()? == 0 {
                    break;
                }
            }
            let k = (n - buf.len()).min(self.right - self.left);
            buf.extend_from_slice(&self.block[self.left..self.left + k]);
            self.left += k;
        }
        Ok(buf)
    }

    /// Read exactly `n` bytes, zero-filling whatever the stream is missing.
    ///
    /// Returns the buffer and the number of bytes that came from the stream.
    /// A missing tail too large to allocate is reported as
    /// [`Error::InvalidHeader`] rather than aborting.
    pub fn read_zero_filled(&mut self, n: usize) -> Result<(Vec<u8>, usize)> {
        let mut buf = self.read(n)?;
        let got = buf.len();
        if got < n {
            let missing = n - got;
            buf.try_reserve_exact(missing).map_err(|_| {
                Error::InvalidHeader(format!("cannot zero-fill {missing} missing data bytes"))
            })?;
            buf.resize(n, 0);
        }
        Ok((buf, got))
    }

    /// Advance past `n` bytes without keeping them. Returns how many were
    /// actually skipped.
    pub fn skip(&mut self, n: usize) -> Result<usize> {
        let mut skipped = 0;
        while skipped < n {
            if self.left == self.right {
                if self.exhausted || self.fill_block()? == 0 {
                    break;
                }
            }
            let k = (n - skipped).min(self.right - self.left);
            self.left += k;
            skipped += k;
        }
        Ok(skipped)
    }

    /// Gather `N` bytes through a scratch buffer; values may straddle blocks.
    /// Missing trailing bytes at end of stream read as zero.
    fn read_elem<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut elem = [0u8; N];
        self.read_into(&mut elem)?;
        Ok(elem)
    }

    /// Read one unsigned byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_elem::<1>()?[0])
    }

    /// Read a big-endian `i16`.
    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(read_i16_be(&self.read_elem::<2>()?))
    }

    /// Read a big-endian `i32`.
    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(read_i32_be(&self.read_elem::<4>()?))
    }

    /// Read a big-endian `i64`.
    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(read_i64_be(&self.read_elem::<8>()?))
    }

    /// Read a big-endian IEEE 754 `f32`.
    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(read_f32_be(&self.read_elem::<4>()?))
    }

    /// Read a big-endian IEEE 754 `f64`.
    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(read_f64_be(&self.read_elem::<8>()?))
    }
}
