//! HDU classes, their mandatory keywords, and the decoded unit.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::error::{Error, Result};
use crate::field::{ColumnRef, FieldAccessor, FieldValue, Table};
use crate::format::{parse_display, render};
use crate::header::{indexed_key, Header};
use crate::image::{Bitpix, Image, Pixel};

/// Kind of header data unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HduClass {
    /// The primary HDU (`SIMPLE = T`).
    Simple,
    /// Image extension (`XTENSION = 'IMAGE'`).
    Image,
    /// Text table extension (`XTENSION = 'TABLE'`).
    Table,
    /// Binary table extension (`XTENSION = 'BINTABLE'`).
    BinTable,
}

impl HduClass {
    /// Classify a parsed header.
    ///
    /// The first HDU is primary when it carries `SIMPLE`. Later HDUs are
    /// classified by `XTENSION`; any other extension type yields `None`.
    pub fn classify(header: &Header, first: bool) -> Option<Self> {
        if first {
            return header.contains("SIMPLE").then_some(HduClass::Simple);
        }
        match header.string("XTENSION")?.trim() {
            "IMAGE" => Some(HduClass::Image),
            "TABLE" => Some(HduClass::Table),
            "BINTABLE" => Some(HduClass::BinTable),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            HduClass::Simple => "SIMPLE",
            HduClass::Image => "IMAGE",
            HduClass::Table => "TABLE",
            HduClass::BinTable => "BINTABLE",
        }
    }

    pub fn is_image(self) -> bool {
        matches!(self, HduClass::Simple | HduClass::Image)
    }

    pub fn is_table(self) -> bool {
        matches!(self, HduClass::Table | HduClass::BinTable)
    }
}

impl fmt::Display for HduClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Check the mandatory-keyword contract of an HDU class.
///
/// Every class needs a valid BITPIX and integer NAXIS and NAXISn.
/// Extensions also need integer PCOUNT and GCOUNT. IMAGE requires
/// `PCOUNT = 0`; tables require `BITPIX = 8`, `NAXIS = 2` and TFIELDS.
pub fn validate(class: HduClass, header: &Header) -> Result<()> {
    let require_int = |key: &str| {
        header
            .int(key)
            .ok_or_else(|| Error::MissingKeyword(key.into()))
    };

    match class {
        HduClass::Simple if !header.contains("SIMPLE") => {
            return Err(Error::MissingKeyword("SIMPLE".into()));
        }
        HduClass::Simple => {}
        _ if header.string("XTENSION").is_none() => {
            return Err(Error::MissingKeyword("XTENSION".into()));
        }
        _ => {}
    }

    let bitpix = require_int("BITPIX")?;
    Bitpix::from_value(bitpix as i64)?;
    let naxis = require_int("NAXIS")?;
    if naxis < 0 {
        return Err(Error::InvalidHeader(format!("negative NAXIS value {naxis}")));
    }
    for i in 1..=naxis as usize {
        require_int(&indexed_key("NAXIS", i))?;
    }
    if class == HduClass::Simple {
        return Ok(());
    }

    let pcount = require_int("PCOUNT")?;
    require_int("GCOUNT")?;
    match class {
        HduClass::Image if pcount != 0 => Err(Error::InvalidHeader(format!(
            "PCOUNT must be 0 in an IMAGE extension, found {pcount}"
        ))),
        HduClass::Table | HduClass::BinTable if bitpix != 8 => Err(Error::InvalidHeader(
            format!("BITPIX must be 8 in a {class} extension, found {bitpix}"),
        )),
        HduClass::Table | HduClass::BinTable if naxis != 2 => Err(Error::InvalidHeader(
            format!("NAXIS must be 2 in a {class} extension, found {naxis}"),
        )),
        HduClass::Table | HduClass::BinTable => require_int("TFIELDS").map(|_| ()),
        _ => Ok(()),
    }
}

/// Data attached to a unit.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// No data section: NAXIS = 0, a zero-length axis, or random groups.
    None,
    Image(Image),
    Table(Table),
}

/// One decoded header data unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    class: HduClass,
    header: Header,
    naxis: Vec<usize>,
    payload: Payload,
}

impl Unit {
    pub fn new(class: HduClass, header: Header, naxis: Vec<usize>, payload: Payload) -> Self {
        Unit {
            class,
            header,
            naxis,
            payload,
        }
    }

    pub fn class(&self) -> HduClass {
        self.class
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Axis extents, NAXIS1 first.
    pub fn naxis(&self) -> &[usize] {
        &self.naxis
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// The BITPIX keyword value.
    pub fn bitpix(&self) -> Option<i32> {
        self.header.int("BITPIX")
    }

    /// `true` for a primary or IMAGE unit whose first axis is non-empty.
    pub fn has_image(&self) -> bool {
        self.class.is_image() && self.naxis.first().is_some_and(|&n| n > 0)
    }

    /// `true` for TABLE and BINTABLE units.
    pub fn has_table(&self) -> bool {
        self.class.is_table()
    }

    /// A primary unit whose NAXIS1 is 0 marks the random-groups structure.
    pub fn is_random_groups(&self) -> bool {
        self.class == HduClass::Simple && self.naxis.first() == Some(&0)
    }

    pub fn image(&self) -> Option<&Image> {
        match &self.payload {
            Payload::Image(img) => Some(img),
            _ => None,
        }
    }

    pub fn table(&self) -> Option<&Table> {
        match &self.payload {
            Payload::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn at(&self, coords: &[usize]) -> Option<Pixel> {
        self.image()?.at(coords)
    }

    pub fn int_at(&self, coords: &[usize]) -> Option<i64> {
        self.image()?.int_at(coords)
    }

    pub fn float_at(&self, coords: &[usize]) -> Option<f64> {
        self.image()?.float_at(coords)
    }

    pub fn is_blank(&self, coords: &[usize]) -> bool {
        self.image().is_some_and(|img| img.is_blank(coords))
    }

    /// Min and max over non-blank pixels; `(0.0, 0.0)` without image data.
    pub fn stats(&self) -> (f64, f64) {
        self.image().map_or((0.0, 0.0), Image::stats)
    }

    /// Accessor for a table column by index or name.
    pub fn field<'c>(&self, col: impl Into<ColumnRef<'c>>) -> Option<FieldAccessor<'_>> {
        self.table()?.field(col)
    }

    pub fn value<'c>(&self, col: impl Into<ColumnRef<'c>>, row: usize) -> Option<FieldValue> {
        self.field(col)?.get(row)
    }

    /// Render a cell through its TDISP, or the storage form's default.
    ///
    /// Unknown columns and out-of-range rows render as an empty string.
    pub fn format<'c>(&self, col: impl Into<ColumnRef<'c>>, row: usize) -> String {
        let Some(field) = self.field(col) else {
            return String::new();
        };
        let Some(value) = field.get(row) else {
            return String::new();
        };
        render(&value, parse_display(&field.descriptor().display).as_ref())
    }
}
