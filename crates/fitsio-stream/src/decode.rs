//! The top-level decode loop over consecutive HDUs.

use alloc::vec::Vec;

use log::{debug, warn};

use crate::block::BlockReader;
use crate::error::{Error, Result};
use crate::hdu::{validate, HduClass, Payload, Unit};
use crate::header::{read_header, HeaderRead};
use crate::image::load_image;
use crate::io::Read;
use crate::table::{load_table, TableKind};

/// Streaming decoder yielding one [`Unit`] per HDU.
///
/// Iteration ends at end of stream, at a header that is neither primary nor
/// a supported extension (including a first header without SIMPLE), or
/// after a random-groups primary. An error is
/// yielded at most once and ends iteration.
pub struct Decoder<R> {
    reader: BlockReader<R>,
    decoded: usize,
    finished: bool,
}

impl<R: Read> Decoder<R> {
    pub fn new(source: R) -> Self {
        Decoder {
            reader: BlockReader::new(source),
            decoded: 0,
            finished: false,
        }
    }

    /// Number of units produced so far.
    pub fn units_decoded(&self) -> usize {
        self.decoded
    }

    /// Consume the decoder, returning the byte source.
    pub fn into_inner(self) -> R {
        self.reader.into_inner()
    }

    fn next_unit(&mut self) -> Result<Option<Unit>> {
        if self.finished {
            return Ok(None);
        }
        let number = self.decoded + 1;

        let (header, naxis) = match read_header(&mut self.reader)? {
            HeaderRead::Parsed { header, naxis } => (header, naxis),
            HeaderRead::Done => {
                debug!("end of stream after {} HDU(s)", self.decoded);
                self.finished = true;
                return Ok(None);
            }
        };

        let Some(class) = HduClass::classify(&header, self.decoded == 0) else {
            warn!("HDU {number}: unrecognized header, stopping");
            self.finished = true;
            return Ok(None);
        };
        validate(class, &header)?;
        debug!("HDU {number}: {class} naxis {naxis:?}");

        let payload = match class {
            HduClass::Simple | HduClass::Image if naxis.first().is_some_and(|&n| n > 0) => {
                Payload::Image(load_image(&mut self.reader, &header, &naxis)?)
            }
            HduClass::Simple | HduClass::Image => Payload::None,
            HduClass::Table => {
                Payload::Table(load_table(&mut self.reader, &header, &naxis, TableKind::Text)?)
            }
            HduClass::BinTable => {
                let table = load_table(&mut self.reader, &header, &naxis, TableKind::Binary)?;
                self.skip_heap(number, header.int("PCOUNT").unwrap_or(0))?;
                Payload::Table(table)
            }
        };

        let unit = Unit::new(class, header, naxis, payload);
        if unit.is_random_groups() {
            debug!("HDU {number}: random groups primary, stopping");
            self.finished = true;
        }
        self.decoded = number;
        Ok(Some(unit))
    }

    /// Step over the BINTABLE heap; its contents are not interpreted.
    fn skip_heap(&mut self, number: usize, pcount: i32) -> Result<()> {
        let Ok(heap) = usize::try_from(pcount) else {
            return Ok(());
        };
        if heap == 0 {
            return Ok(());
        }
        let skipped = self.reader.skip(heap)?;
        if skipped < heap {
            warn!("HDU {number}: heap truncated, {skipped} of {heap} bytes");
        } else {
            debug!("HDU {number}: skipped {heap}-byte heap");
        }
        Ok(())
    }
}

impl<R: Read> Iterator for Decoder<R> {
    type Item = Result<Unit>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_unit() {
            Ok(unit) => unit.map(Ok),
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

/// Everything decoded from a stream, plus the error that stopped it early.
#[derive(Debug)]
pub struct Decoded {
    /// Units decoded before the stream ended or failed, in file order.
    pub units: Vec<Unit>,
    pub error: Option<Error>,
}

impl Decoded {
    /// `true` when decoding reached a clean end.
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// The units, or the error if decoding stopped on one.
    pub fn into_result(self) -> Result<Vec<Unit>> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.units),
        }
    }
}

/// Decode every HDU in `source`.
///
/// Failures do not discard earlier work: the units decoded before the
/// failing HDU are returned alongside the error.
pub fn decode<R: Read>(source: R) -> Decoded {
    let mut units = Vec::new();
    for item in Decoder::new(source) {
        match item {
            Ok(unit) => units.push(unit),
            Err(e) => {
                return Decoded {
                    units,
                    error: Some(e),
                }
            }
        }
    }
    Decoded { units, error: None }
}
