//! Text (TABLE) column forms, and table loading for both table kinds.
//!
//! A text TFORM is `Tw` or `Tw.d`; the column's start is given by the
//! 1-based `TBCOLn` keyword rather than derived from its neighbours.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use log::{debug, warn};

use crate::bintable::layout_binary_fields;
use crate::block::BlockReader;
use crate::error::{Error, Result};
use crate::field::{FieldDescriptor, FieldKind, Table};
use crate::header::{indexed_key, Header, MAX_INDEX};
use crate::io::Read;

/// A parsed text-table TFORM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextForm {
    pub code: char,
    pub width: usize,
    pub decimals: Option<usize>,
    pub kind: FieldKind,
}

impl TextForm {
    /// TDISP used when the header does not supply one.
    pub fn default_display(&self) -> String {
        match self.kind {
            FieldKind::Char => format!("A{}", self.width),
            FieldKind::TextInt => format!("I{}", self.width),
            _ => "F14.7".into(),
        }
    }
}

/// Which table grammar a data section uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Text,
    Binary,
}

/// Parse a text TFORM such as `A8`, `I6` or `F10.4`.
pub fn parse_text_form(form: &str) -> Result<TextForm> {
    let form = form.trim();
    let mut chars = form.chars();
    let code = chars.next().ok_or_else(|| Error::UnsupportedForm(form.into()))?;
    let kind = match code {
        'A' => FieldKind::Char,
        'I' => FieldKind::TextInt,
        'D' | 'E' | 'F' => FieldKind::TextFloat,
        _ => return Err(Error::UnsupportedForm(form.into())),
    };

    let bad = || Error::InvalidHeader(format!("bad width in TFORM {form:?}"));
    let rest = chars.as_str();
    let (width, decimals) = match rest.split_once('.') {
        Some((w, d)) => (w, Some(d.parse::<usize>().map_err(|_| bad())?)),
        None => (rest, None),
    };
    let width = width.parse::<usize>().map_err(|_| bad())?;
    if width == 0 {
        return Err(bad());
    }

    Ok(TextForm {
        code,
        width,
        decimals,
        kind,
    })
}

/// Number of columns declared by TFIELDS.
pub(crate) fn field_count(header: &Header) -> Result<usize> {
    let n = header
        .int("TFIELDS")
        .ok_or_else(|| Error::MissingKeyword("TFIELDS".into()))?;
    usize::try_from(n).map_err(|_| Error::InvalidHeader(format!("negative TFIELDS value {n}")))
}

/// Derive the descriptors of every TABLE column.
///
/// Each field must lie within `row_len` (NAXIS1).
pub fn layout_text_fields(header: &Header, row_len: usize) -> Result<Vec<FieldDescriptor>> {
    let count = field_count(header)?;
    let mut fields = Vec::with_capacity(count.min(MAX_INDEX));

    for i in 0..count {
        let key = indexed_key("TFORM", i + 1);
        let form = header
            .string(&key)
            .ok_or_else(|| Error::MissingKeyword(key.clone()))?;
        let parsed = parse_text_form(form)?;

        let key = indexed_key("TBCOL", i + 1);
        let tbcol = header
            .int(&key)
            .ok_or_else(|| Error::MissingKeyword(key.clone()))?;
        let offset = usize::try_from(tbcol)
            .ok()
            .and_then(|c| c.checked_sub(1))
            .ok_or_else(|| Error::InvalidHeader(format!("{key} = {tbcol} is not 1-based")))?;
        if offset.checked_add(parsed.width).filter(|&end| end <= row_len).is_none() {
            return Err(Error::InvalidHeader(format!(
                "column {} ({form} at {tbcol}) ends beyond NAXIS1 = {row_len}",
                i + 1
            )));
        }

        let display = header
            .string(&indexed_key("TDISP", i + 1))
            .map(String::from)
            .unwrap_or_else(|| parsed.default_display());

        fields.push(FieldDescriptor {
            index: i,
            form: form.into(),
            code: parsed.code,
            kind: parsed.kind,
            repeat: 1,
            width: parsed.width,
            offset,
            display,
            name: header.string(&indexed_key("TTYPE", i + 1)).map(String::from),
        });
    }

    debug!("text table layout: {count} fields in {row_len}-byte rows");
    Ok(fields)
}

/// Read a table data section and bind its column layout.
///
/// `naxis` must be `[row_len, rows]`. The column layout is checked before
/// any data is read. A data section cut short by the end of the stream is
/// zero-filled.
pub fn load_table<R: Read>(
    reader: &mut BlockReader<R>,
    header: &Header,
    naxis: &[usize],
    kind: TableKind,
) -> Result<Table> {
    let &[row_len, rows] = naxis else {
        return Err(Error::InvalidHeader(format!(
            "table needs exactly 2 axes, found {}",
            naxis.len()
        )));
    };

    let fields = match kind {
        TableKind::Text => layout_text_fields(header, row_len)?,
        TableKind::Binary => layout_binary_fields(header, row_len)?,
    };

    let byte_len = row_len
        .checked_mul(rows)
        .ok_or_else(|| Error::InvalidHeader(format!("table size {row_len} x {rows} overflows")))?;
    let (blob, got) = reader.read_zero_filled(byte_len)?;
    if got < byte_len {
        warn!("table data truncated: {got} of {byte_len} bytes, zero-filling");
    }
    debug!("{kind:?} table: {rows} rows of {row_len} bytes, {} fields", fields.len());

    Ok(Table::new(blob, row_len, rows, fields))
}
