//! Table field model shared by text (TABLE) and binary (BINTABLE) tables.
//!
//! A [`Table`] owns the raw row-major data blob and one [`FieldDescriptor`]
//! per column. Reading a cell goes through a [`FieldAccessor`], a borrowed
//! view that computes `row * row_len + offset` on every call, so accessors
//! hold no mutable state and can be shared across threads.

use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use core::str;

use log::warn;

use crate::endian::{read_f32_be, read_f64_be, read_i16_be, read_i32_be, read_i64_be};
use crate::value::parse_fortran_float;

/// One decoded table element.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Str(String),
    Bool(bool),
    U8(u8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    /// Single-precision complex (`C`).
    C32(f32, f32),
    /// Double-precision complex (`M`).
    C64(f64, f64),
}

impl Scalar {
    /// Integer value; floats are truncated, booleans are 0 or 1.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Bool(b) => Some(*b as i64),
            Scalar::U8(v) => Some(*v as i64),
            Scalar::I16(v) => Some(*v as i64),
            Scalar::I32(v) => Some(*v as i64),
            Scalar::I64(v) => Some(*v),
            Scalar::F32(v) => Some(*v as i64),
            Scalar::F64(v) => Some(*v as i64),
            Scalar::Str(_) | Scalar::C32(..) | Scalar::C64(..) => None,
        }
    }

    /// Real value; complex numbers yield their real part.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Bool(b) => Some(*b as u8 as f64),
            Scalar::U8(v) => Some(*v as f64),
            Scalar::I16(v) => Some(*v as f64),
            Scalar::I32(v) => Some(*v as f64),
            Scalar::I64(v) => Some(*v as f64),
            Scalar::F32(v) => Some(*v as f64),
            Scalar::F64(v) => Some(*v),
            Scalar::C32(re, _) => Some(*re as f64),
            Scalar::C64(re, _) => Some(*re),
            Scalar::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Str(s) => f.write_str(s),
            Scalar::Bool(b) => f.write_str(if *b { "T" } else { "F" }),
            Scalar::U8(v) => write!(f, "{v}"),
            Scalar::I16(v) => write!(f, "{v}"),
            Scalar::I32(v) => write!(f, "{v}"),
            Scalar::I64(v) => write!(f, "{v}"),
            Scalar::F32(v) => write!(f, "{v}"),
            Scalar::F64(v) => write!(f, "{v}"),
            Scalar::C32(re, im) => write!(f, "({re}{im:+}i)"),
            Scalar::C64(re, im) => write!(f, "({re}{im:+}i)"),
        }
    }
}

/// The value of one cell: a scalar, or a fixed-length vector when the
/// binary repeat count is greater than one.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Scalar(Scalar),
    Array(Vec<Scalar>),
}

impl FieldValue {
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            FieldValue::Scalar(s) => Some(s),
            FieldValue::Array(_) => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Scalar]> {
        match self {
            FieldValue::Array(v) => Some(v),
            FieldValue::Scalar(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Scalar(s) => write!(f, "{s}"),
            FieldValue::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

/// Storage type of a column element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// `A`: characters, decoded as one string per cell.
    Char,
    /// `L`: logical byte, true for `T`.
    Logical,
    /// `B`: unsigned byte.
    Byte,
    /// `I`: 16-bit integer.
    Short,
    /// `J`: 32-bit integer.
    Int,
    /// `K`: 64-bit integer.
    Long,
    /// `E`: 32-bit float.
    Float,
    /// `D`: 64-bit float.
    Double,
    /// `C`: pair of 32-bit floats.
    Complex,
    /// `M`: pair of 64-bit floats.
    DoubleComplex,
    /// Text-table `I`: right-justified decimal integer.
    TextInt,
    /// Text-table `D`, `E` or `F`: decimal float, Fortran `D` exponent allowed.
    TextFloat,
}

impl FieldKind {
    /// Decode one element from exactly its stored bytes.
    fn decode(self, bytes: &[u8]) -> Option<Scalar> {
        let scalar = match self {
            FieldKind::Char => Scalar::Str(String::from_utf8_lossy(bytes).into_owned()),
            FieldKind::Logical => Scalar::Bool(*bytes.first()? == b'T'),
            FieldKind::Byte => Scalar::U8(*bytes.first()?),
            FieldKind::Short => Scalar::I16(read_i16_be(bytes)),
            FieldKind::Int => Scalar::I32(read_i32_be(bytes)),
            FieldKind::Long => Scalar::I64(read_i64_be(bytes)),
            FieldKind::Float => Scalar::F32(read_f32_be(bytes)),
            FieldKind::Double => Scalar::F64(read_f64_be(bytes)),
            FieldKind::Complex => Scalar::C32(read_f32_be(bytes), read_f32_be(&bytes[4..])),
            FieldKind::DoubleComplex => {
                Scalar::C64(read_f64_be(bytes), read_f64_be(&bytes[8..]))
            }
            FieldKind::TextInt => {
                Scalar::I64(str::from_utf8(bytes).ok()?.trim().parse().ok()?)
            }
            FieldKind::TextFloat => {
                Scalar::F64(parse_fortran_float(str::from_utf8(bytes).ok()?.trim())?)
            }
        };
        Some(scalar)
    }
}

/// Layout and presentation of one table column.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// 0-based column index.
    pub index: usize,
    /// The TFORM value as written in the header.
    pub form: String,
    /// Storage-form code letter.
    pub code: char,
    pub kind: FieldKind,
    /// Element count per cell. Always 1 for text tables.
    pub repeat: usize,
    /// Bytes per element.
    pub width: usize,
    /// Byte offset of the column within a row.
    pub offset: usize,
    /// TDISP from the header, or the default for the storage form.
    pub display: String,
    /// TTYPE from the header, if any.
    pub name: Option<String>,
}

impl FieldDescriptor {
    /// Bytes the column occupies in each row.
    pub fn byte_len(&self) -> usize {
        self.repeat * self.width
    }

    /// A zero-repeat binary column has no data and no accessor.
    pub fn has_data(&self) -> bool {
        self.repeat > 0
    }

    /// The public name: TTYPE, or `COL{n}` with a 1-based `n`.
    pub fn public_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("COL{}", self.index + 1),
        }
    }
}

/// How a caller picks a column: 0-based index or case-sensitive name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRef<'a> {
    Index(usize),
    Name(&'a str),
}

impl From<usize> for ColumnRef<'_> {
    fn from(i: usize) -> Self {
        ColumnRef::Index(i)
    }
}

impl<'a> From<&'a str> for ColumnRef<'a> {
    fn from(name: &'a str) -> Self {
        ColumnRef::Name(name)
    }
}

/// Decoded table data: the raw blob plus column layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    blob: Vec<u8>,
    row_len: usize,
    rows: usize,
    fields: Vec<FieldDescriptor>,
    names: BTreeMap<String, usize>,
}

impl Table {
    /// Assemble a table. `blob` must hold `row_len * rows` bytes.
    ///
    /// Every column with data is registered under its public name; when two
    /// columns share a name the later one wins.
    pub fn new(blob: Vec<u8>, row_len: usize, rows: usize, fields: Vec<FieldDescriptor>) -> Self {
        let mut names = BTreeMap::new();
        for field in fields.iter().filter(|f| f.has_data()) {
            let name = field.public_name();
            if let Some(prev) = names.insert(name.clone(), field.index) {
                warn!(
                    "column name {name:?} used by columns {} and {}; keeping {}",
                    prev + 1,
                    field.index + 1,
                    field.index + 1
                );
            }
        }
        Table {
            blob,
            row_len,
            rows,
            fields,
            names,
        }
    }

    /// Row length in bytes (NAXIS1).
    pub fn row_len(&self) -> usize {
        self.row_len
    }

    /// Number of rows (NAXIS2).
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// The raw row-major data.
    pub fn blob(&self) -> &[u8] {
        &self.blob
    }

    /// All column descriptors in TFIELDS order, including zero-repeat ones.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Resolve a column reference to its 0-based index.
    pub fn column_index<'c>(&self, col: impl Into<ColumnRef<'c>>) -> Option<usize> {
        match col.into() {
            ColumnRef::Index(i) => (i < self.fields.len()).then_some(i),
            ColumnRef::Name(name) => self.names.get(name).copied(),
        }
    }

    pub fn descriptor<'c>(&self, col: impl Into<ColumnRef<'c>>) -> Option<&FieldDescriptor> {
        self.fields.get(self.column_index(col)?)
    }

    /// Accessor for a column, or `None` for an unknown or zero-repeat column.
    pub fn field<'c>(&self, col: impl Into<ColumnRef<'c>>) -> Option<FieldAccessor<'_>> {
        let descriptor = self.descriptor(col)?;
        if !descriptor.has_data() {
            return None;
        }
        Some(FieldAccessor {
            blob: &self.blob,
            stride: self.row_len,
            rows: self.rows,
            descriptor,
        })
    }

    /// Shorthand for `field(col)?.get(row)`.
    pub fn value<'c>(&self, col: impl Into<ColumnRef<'c>>, row: usize) -> Option<FieldValue> {
        self.field(col)?.get(row)
    }
}

/// Per-column reader over a table blob.
#[derive(Debug, Clone, Copy)]
pub struct FieldAccessor<'a> {
    blob: &'a [u8],
    stride: usize,
    rows: usize,
    descriptor: &'a FieldDescriptor,
}

impl<'a> FieldAccessor<'a> {
    pub fn descriptor(&self) -> &'a FieldDescriptor {
        self.descriptor
    }

    /// Decode the cell at `row`. Out-of-range rows yield `None`, as do text
    /// numbers that do not parse.
    pub fn get(&self, row: usize) -> Option<FieldValue> {
        if row >= self.rows {
            return None;
        }
        let d = self.descriptor;
        let start = row.checked_mul(self.stride)?.checked_add(d.offset)?;
        let bytes = self.blob.get(start..start + d.byte_len())?;

        if d.kind == FieldKind::Char || d.repeat == 1 {
            return d.kind.decode(bytes).map(FieldValue::Scalar);
        }
        bytes
            .chunks_exact(d.width)
            .map(|elem| d.kind.decode(elem))
            .collect::<Option<Vec<_>>>()
            .map(FieldValue::Array)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;
    use alloc::vec;

    fn descriptor(
        index: usize,
        kind: FieldKind,
        repeat: usize,
        width: usize,
        offset: usize,
        name: Option<&str>,
    ) -> FieldDescriptor {
        FieldDescriptor {
            index,
            form: String::new(),
            code: 'X',
            kind,
            repeat,
            width,
            offset,
            display: String::new(),
            name: name.map(String::from),
        }
    }

    /// Two rows of `1J 2I 3A`: 4 + 4 + 3 = 11 bytes.
    fn binary_table() -> Table {
        let mut blob = Vec::new();
        for (j, (a, b), s) in [(7i32, (1i16, 2i16), b"abc"), (-8, (3, -4), b"xy ")] {
            blob.extend_from_slice(&j.to_be_bytes());
            blob.extend_from_slice(&a.to_be_bytes());
            blob.extend_from_slice(&b.to_be_bytes());
            blob.extend_from_slice(s);
        }
        let fields = vec![
            descriptor(0, FieldKind::Int, 1, 4, 0, Some("ID")),
            descriptor(1, FieldKind::Short, 2, 2, 4, Some("PAIR")),
            descriptor(2, FieldKind::Char, 3, 1, 8, None),
        ];
        Table::new(blob, 11, 2, fields)
    }

    // ---- accessors ----

    #[test]
    fn scalar_and_array_cells() {
        let t = binary_table();
        assert_eq!(t.value(0usize, 0), Some(FieldValue::Scalar(Scalar::I32(7))));
        assert_eq!(t.value("ID", 1), Some(FieldValue::Scalar(Scalar::I32(-8))));
        assert_eq!(
            t.value("PAIR", 1),
            Some(FieldValue::Array(vec![Scalar::I16(3), Scalar::I16(-4)]))
        );
    }

    #[test]
    fn char_column_is_single_untrimmed_string() {
        let t = binary_table();
        assert_eq!(t.value(2usize, 0), Some(FieldValue::Scalar(Scalar::Str("abc".into()))));
        assert_eq!(t.value("COL3", 1), Some(FieldValue::Scalar(Scalar::Str("xy ".into()))));
    }

    #[test]
    fn out_of_range_row_and_unknown_column() {
        let t = binary_table();
        assert_eq!(t.value(0usize, 2), None);
        assert_eq!(t.value(3usize, 0), None);
        assert_eq!(t.value("id", 0), None);
        assert!(t.field("NOPE").is_none());
    }

    #[test]
    fn accessor_is_reusable_across_rows() {
        let t = binary_table();
        let id = t.field("ID").unwrap();
        let ids: Vec<i64> = (0..t.rows())
            .filter_map(|r| id.get(r)?.as_scalar()?.as_i64())
            .collect();
        assert_eq!(ids, vec![7, -8]);
        assert_eq!(id.descriptor().offset, 0);
    }

    #[test]
    fn accessors_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FieldAccessor<'static>>();
        assert_send_sync::<Table>();
    }

    // ---- names ----

    #[test]
    fn synthesized_names_and_index_lookup() {
        let t = binary_table();
        assert_eq!(t.column_index("ID"), Some(0));
        assert_eq!(t.column_index("COL3"), Some(2));
        assert_eq!(t.column_index(5usize), None);
    }

    #[test]
    fn duplicate_names_later_wins() {
        let fields = vec![
            descriptor(0, FieldKind::Byte, 1, 1, 0, Some("X")),
            descriptor(1, FieldKind::Byte, 1, 1, 1, Some("X")),
        ];
        let t = Table::new(vec![1, 2], 2, 1, fields);
        assert_eq!(t.column_index("X"), Some(1));
        assert_eq!(t.value("X", 0), Some(FieldValue::Scalar(Scalar::U8(2))));
    }

    #[test]
    fn zero_repeat_column_has_no_accessor() {
        let fields = vec![
            descriptor(0, FieldKind::Double, 0, 8, 0, Some("EMPTY")),
            descriptor(1, FieldKind::Byte, 1, 1, 0, Some("B")),
        ];
        let t = Table::new(vec![9], 1, 1, fields);
        assert!(t.field(0usize).is_none());
        assert_eq!(t.column_index("EMPTY"), None);
        assert_eq!(t.fields().len(), 2);
        assert_eq!(t.value("B", 0), Some(FieldValue::Scalar(Scalar::U8(9))));
    }

    // ---- element decoding ----

    #[test]
    fn decode_binary_kinds() {
        assert_eq!(FieldKind::Logical.decode(b"T"), Some(Scalar::Bool(true)));
        assert_eq!(FieldKind::Logical.decode(b"F"), Some(Scalar::Bool(false)));
        assert_eq!(FieldKind::Logical.decode(&[0]), Some(Scalar::Bool(false)));
        assert_eq!(
            FieldKind::Long.decode(&(-5i64).to_be_bytes()),
            Some(Scalar::I64(-5))
        );
        assert_eq!(
            FieldKind::Float.decode(&2.5f32.to_be_bytes()),
            Some(Scalar::F32(2.5))
        );
        let mut c = Vec::new();
        c.extend_from_slice(&1.0f64.to_be_bytes());
        c.extend_from_slice(&(-2.0f64).to_be_bytes());
        assert_eq!(FieldKind::DoubleComplex.decode(&c), Some(Scalar::C64(1.0, -2.0)));
    }

    #[test]
    fn decode_text_numbers() {
        assert_eq!(FieldKind::TextInt.decode(b"   42"), Some(Scalar::I64(42)));
        assert_eq!(FieldKind::TextInt.decode(b"  -7 "), Some(Scalar::I64(-7)));
        assert_eq!(FieldKind::TextInt.decode(b"  abc"), None);
        assert_eq!(FieldKind::TextFloat.decode(b" 1.5D2 "), Some(Scalar::F64(150.0)));
        assert_eq!(FieldKind::TextFloat.decode(b"  -0.25"), Some(Scalar::F64(-0.25)));
        assert_eq!(FieldKind::TextFloat.decode(b"     "), None);
    }

    // ---- display ----

    #[test]
    fn display_values() {
        assert_eq!(Scalar::Bool(true).to_string(), "T");
        assert_eq!(Scalar::C32(1.0, -2.0).to_string(), "(1-2i)");
        assert_eq!(Scalar::C64(0.5, 3.0).to_string(), "(0.5+3i)");
        let arr = FieldValue::Array(vec![Scalar::U8(1), Scalar::U8(2), Scalar::U8(3)]);
        assert_eq!(arr.to_string(), "[1 2 3]");
    }
}
