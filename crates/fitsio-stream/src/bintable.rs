//! BINTABLE column forms and row layout.
//!
//! A binary TFORM is `rT`: an optional repeat count followed by a type code.
//! Columns are packed back to back, so each column's offset is the running
//! sum of `repeat * element_size` over the columns before it.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use log::debug;

use crate::error::{Error, Result};
use crate::field::{FieldDescriptor, FieldKind};
use crate::header::{indexed_key, Header, MAX_INDEX};
use crate::table::field_count;

/// Type codes recognised when scanning a TFORM for its code letter.
const TYPE_CODES: &[char] = &['A', 'B', 'C', 'D', 'E', 'I', 'J', 'K', 'L', 'M', 'P', 'Q', 'X'];

/// A parsed binary-table TFORM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinaryForm {
    pub repeat: usize,
    pub code: char,
    pub kind: FieldKind,
}

impl BinaryForm {
    /// Stored size of one element.
    pub fn element_size(&self) -> usize {
        match self.kind {
            FieldKind::Char | FieldKind::Logical | FieldKind::Byte => 1,
            FieldKind::Short => 2,
            FieldKind::Int | FieldKind::Float => 4,
            FieldKind::Long | FieldKind::Double | FieldKind::Complex => 8,
            FieldKind::DoubleComplex => 16,
            FieldKind::TextInt | FieldKind::TextFloat => 0,
        }
    }

    /// TDISP used when the header does not supply one.
    pub fn default_display(&self) -> String {
        match self.kind {
            FieldKind::Char => format!("A{}", self.repeat),
            FieldKind::Byte => "I3".into(),
            FieldKind::Logical => "B1".into(),
            FieldKind::Short => "I6".into(),
            FieldKind::Int => "I11".into(),
            FieldKind::Long => "I20".into(),
            _ => "F14.7".into(),
        }
    }
}

/// Parse a binary TFORM such as `1J`, `E` or `20A`.
///
/// Text after the code letter is ignored. Bit arrays (`X`) and
/// variable-length descriptors (`P`, `Q`) are rejected.
pub fn parse_binary_form(form: &str) -> Result<BinaryForm> {
    let form = form.trim();
    let Some(pos) = form.find(TYPE_CODES) else {
        return Err(Error::UnsupportedForm(form.into()));
    };

    let prefix = &form[..pos];
    let repeat = if prefix.is_empty() {
        1
    } else {
        prefix
            .parse::<usize>()
            .map_err(|_| Error::InvalidHeader(format!("bad repeat count in TFORM {form:?}")))?
    };

    let code = form[pos..].chars().next().unwrap_or_default();
    let kind = match code {
        'A' => FieldKind::Char,
        'L' => FieldKind::Logical,
        'B' => FieldKind::Byte,
        'I' => FieldKind::Short,
        'J' => FieldKind::Int,
        'K' => FieldKind::Long,
        'E' => FieldKind::Float,
        'D' => FieldKind::Double,
        'C' => FieldKind::Complex,
        'M' => FieldKind::DoubleComplex,
        _ => return Err(Error::UnsupportedForm(form.into())),
    };

    Ok(BinaryForm { repeat, code, kind })
}

/// Derive the descriptors of every BINTABLE column.
///
/// Zero-repeat columns are kept in the list but take no bytes. The packed
/// columns must fit within `row_len` (NAXIS1).
pub fn layout_binary_fields(header: &Header, row_len: usize) -> Result<Vec<FieldDescriptor>> {
    let count = field_count(header)?;
    let mut fields = Vec::with_capacity(count.min(MAX_INDEX));
    let mut cursor = 0usize;

    for i in 0..count {
        let key = indexed_key("TFORM", i + 1);
        let form = header
            .string(&key)
            .ok_or_else(|| Error::MissingKeyword(key.clone()))?;
        let parsed = parse_binary_form(form)?;
        let width = parsed.element_size();

        let offset = cursor;
        cursor = parsed
            .repeat
            .checked_mul(width)
            .and_then(|len| cursor.checked_add(len))
            .filter(|&end| end <= row_len)
            .ok_or_else(|| {
                Error::InvalidHeader(format!(
                    "column {} ({form}) ends beyond NAXIS1 = {row_len}",
                    i + 1
                ))
            })?;

        let display = header
            .string(&indexed_key("TDISP", i + 1))
            .map(String::from)
            .unwrap_or_else(|| parsed.default_display());

        fields.push(FieldDescriptor {
            index: i,
            form: form.into(),
            code: parsed.code,
            kind: parsed.kind,
            repeat: parsed.repeat,
            width,
            offset,
            display,
            name: header.string(&indexed_key("TTYPE", i + 1)).map(String::from),
        });
    }

    debug!("binary table layout: {count} fields, {cursor} of {row_len} row bytes used");
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::HeaderCard;
    use crate::value::HeaderValue;

    fn header(cards: &[(&str, HeaderValue)]) -> Header {
        let mut h = Header::new();
        for (key, value) in cards {
            h.insert(HeaderCard {
                key: (*key).into(),
                value: value.clone(),
                comment: None,
            });
        }
        h
    }

    fn s(v: &str) -> HeaderValue {
        HeaderValue::String(v.into())
    }

    // ---- parse_binary_form ----

    #[test]
    fn form_with_repeat() {
        let f = parse_binary_form("10E").unwrap();
        assert_eq!((f.repeat, f.code, f.kind), (10, 'E', FieldKind::Float));
        assert_eq!(f.element_size(), 4);
    }

    #[test]
    fn form_without_repeat_defaults_to_one() {
        let f = parse_binary_form("J").unwrap();
        assert_eq!(f.repeat, 1);
        assert_eq!(f.kind, FieldKind::Int);
    }

    #[test]
    fn form_zero_repeat() {
        assert_eq!(parse_binary_form("0D").unwrap().repeat, 0);
    }

    #[test]
    fn form_trailing_text_ignored() {
        let f = parse_binary_form(" 20A8 ").unwrap();
        assert_eq!((f.repeat, f.kind), (20, FieldKind::Char));
    }

    #[test]
    fn element_sizes() {
        for (form, size) in [
            ("A", 1),
            ("L", 1),
            ("B", 1),
            ("I", 2),
            ("J", 4),
            ("K", 8),
            ("E", 4),
            ("D", 8),
            ("C", 8),
            ("M", 16),
        ] {
            assert_eq!(parse_binary_form(form).unwrap().element_size(), size, "{form}");
        }
    }

    #[test]
    fn unsupported_forms_rejected() {
        for form in ["16X", "1PE(12)", "1QD(4)", "3Z", ""] {
            let err = parse_binary_form(form).unwrap_err();
            assert!(matches!(err, Error::UnsupportedForm(_)), "{form}");
        }
    }

    #[test]
    fn bad_repeat_rejected() {
        assert!(matches!(
            parse_binary_form("x3J"),
            Err(Error::InvalidHeader(_))
        ));
    }

    #[test]
    fn default_displays() {
        let d = |f: &str| parse_binary_form(f).unwrap().default_display();
        assert_eq!(d("12A"), "A12");
        assert_eq!(d("B"), "I3");
        assert_eq!(d("L"), "B1");
        assert_eq!(d("I"), "I6");
        assert_eq!(d("J"), "I11");
        assert_eq!(d("K"), "I20");
        assert_eq!(d("E"), "F14.7");
        assert_eq!(d("M"), "F14.7");
    }

    // ---- layout ----

    #[test]
    fn offsets_accumulate() {
        let h = header(&[
            ("TFIELDS", HeaderValue::Int(3)),
            ("TFORM1", s("3I")),
            ("TFORM2", s("1J")),
            ("TFORM3", s("8A")),
            ("TTYPE2", s("FLUX")),
            ("TDISP2", s("I8")),
        ]);
        let fields = layout_binary_fields(&h, 18).unwrap();
        let offsets: Vec<usize> = fields.iter().map(|f| f.offset).collect();
        assert_eq!(offsets, [0, 6, 10]);
        assert_eq!(fields[1].name.as_deref(), Some("FLUX"));
        assert_eq!(fields[1].display, "I8");
        assert_eq!(fields[2].display, "A8");
        assert_eq!(fields[2].byte_len(), 8);
    }

    #[test]
    fn zero_repeat_takes_no_bytes() {
        let h = header(&[
            ("TFIELDS", HeaderValue::Int(3)),
            ("TFORM1", s("1B")),
            ("TFORM2", s("0E")),
            ("TFORM3", s("1I")),
        ]);
        let fields = layout_binary_fields(&h, 3).unwrap();
        assert_eq!(fields.len(), 3);
        assert!(!fields[1].has_data());
        assert_eq!(fields[2].offset, 1);
    }

    #[test]
    fn row_overflow_is_error() {
        let h = header(&[("TFIELDS", HeaderValue::Int(1)), ("TFORM1", s("2D"))]);
        assert!(matches!(
            layout_binary_fields(&h, 15),
            Err(Error::InvalidHeader(_))
        ));
    }

    #[test]
    fn missing_tform_is_error() {
        let h = header(&[("TFIELDS", HeaderValue::Int(2)), ("TFORM1", s("J"))]);
        let err = layout_binary_fields(&h, 8).unwrap_err();
        assert!(matches!(err, Error::MissingKeyword(ref k) if k == "TFORM2"));
    }
}
