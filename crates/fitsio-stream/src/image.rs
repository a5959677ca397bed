//! Image pixel loading for primary and IMAGE HDUs.
//!
//! The data section is read in one pass as `product(naxis)` big-endian
//! elements and converted to a native typed buffer. Pixels are addressed
//! with axis 0 varying fastest, matching FITS storage order.

use alloc::format;
use alloc::vec::Vec;

use bytemuck::pod_collect_to_vec;
use log::{debug, warn};

use crate::block::BlockReader;
use crate::error::{Error, Result};
use crate::header::Header;
use crate::io::Read;
use crate::value::HeaderValue;

/// Element encoding declared by BITPIX.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bitpix {
    U8,
    I16,
    I32,
    I64,
    F32,
    F64,
}

impl Bitpix {
    /// Map a BITPIX keyword value to its encoding.
    pub fn from_value(value: i64) -> Result<Self> {
        match value {
            8 => Ok(Bitpix::U8),
            16 => Ok(Bitpix::I16),
            32 => Ok(Bitpix::I32),
            64 => Ok(Bitpix::I64),
            -32 => Ok(Bitpix::F32),
            -64 => Ok(Bitpix::F64),
            other => Err(Error::InvalidBitpix(other)),
        }
    }

    /// The BITPIX keyword value.
    pub fn value(self) -> i64 {
        match self {
            Bitpix::U8 => 8,
            Bitpix::I16 => 16,
            Bitpix::I32 => 32,
            Bitpix::I64 => 64,
            Bitpix::F32 => -32,
            Bitpix::F64 => -64,
        }
    }

    pub fn bytes_per_element(self) -> usize {
        (self.value().unsigned_abs() / 8) as usize
    }

    pub fn is_float(self) -> bool {
        matches!(self, Bitpix::F32 | Bitpix::F64)
    }
}

/// Image pixel data, typed by BITPIX.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageData {
    U8(Vec<u8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

/// A single raw pixel value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pixel {
    U8(u8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
}

impl Pixel {
    /// Widen to `i64`. Float pixels are truncated toward zero.
    pub fn as_i64(self) -> i64 {
        match self {
            Pixel::U8(v) => v as i64,
            Pixel::I16(v) => v as i64,
            Pixel::I32(v) => v as i64,
            Pixel::I64(v) => v,
            Pixel::F32(v) => v as i64,
            Pixel::F64(v) => v as i64,
        }
    }

    /// Widen to `f64`.
    pub fn as_f64(self) -> f64 {
        match self {
            Pixel::U8(v) => v as f64,
            Pixel::I16(v) => v as f64,
            Pixel::I32(v) => v as f64,
            Pixel::I64(v) => v as f64,
            Pixel::F32(v) => v as f64,
            Pixel::F64(v) => v,
        }
    }
}

impl ImageData {
    pub fn bitpix(&self) -> Bitpix {
        match self {
            ImageData::U8(_) => Bitpix::U8,
            ImageData::I16(_) => Bitpix::I16,
            ImageData::I32(_) => Bitpix::I32,
            ImageData::I64(_) => Bitpix::I64,
            ImageData::F32(_) => Bitpix::F32,
            ImageData::F64(_) => Bitpix::F64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ImageData::U8(v) => v.len(),
            ImageData::I16(v) => v.len(),
            ImageData::I32(v) => v.len(),
            ImageData::I64(v) => v.len(),
            ImageData::F32(v) => v.len(),
            ImageData::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw element at flat position `i`.
    pub fn get(&self, i: usize) -> Option<Pixel> {
        match self {
            ImageData::U8(v) => v.get(i).copied().map(Pixel::U8),
            ImageData::I16(v) => v.get(i).copied().map(Pixel::I16),
            ImageData::I32(v) => v.get(i).copied().map(Pixel::I32),
            ImageData::I64(v) => v.get(i).copied().map(Pixel::I64),
            ImageData::F32(v) => v.get(i).copied().map(Pixel::F32),
            ImageData::F64(v) => v.get(i).copied().map(Pixel::F64),
        }
    }

    fn empty(bitpix: Bitpix) -> Self {
        match bitpix {
            Bitpix::U8 => ImageData::U8(Vec::new()),
            Bitpix::I16 => ImageData::I16(Vec::new()),
            Bitpix::I32 => ImageData::I32(Vec::new()),
            Bitpix::I64 => ImageData::I64(Vec::new()),
            Bitpix::F32 => ImageData::F32(Vec::new()),
            Bitpix::F64 => ImageData::F64(Vec::new()),
        }
    }
}

/// How blank (undefined) pixels are recognised.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BlankPolicy {
    /// No blank value is defined.
    None,
    /// Integral image with a BLANK keyword; a pixel equal to it is blank.
    Value(i64),
    /// Floating-point image; NaN pixels are blank.
    NaN,
}

impl BlankPolicy {
    /// Choose the policy for an image. BLANK is ignored for float images.
    pub fn for_header(bitpix: Bitpix, header: &Header) -> Self {
        if bitpix.is_float() {
            return BlankPolicy::NaN;
        }
        match header.get("BLANK") {
            Some(HeaderValue::Int(n)) => BlankPolicy::Value(*n as i64),
            // 64-bit BLANK values overflow the integer literal type.
            Some(HeaderValue::Float(x)) if x.fract() == 0.0 => BlankPolicy::Value(*x as i64),
            _ => BlankPolicy::None,
        }
    }

    pub fn is_blank(self, pixel: Pixel) -> bool {
        match (self, pixel) {
            (BlankPolicy::NaN, Pixel::F32(v)) => v.is_nan(),
            (BlankPolicy::NaN, Pixel::F64(v)) => v.is_nan(),
            (BlankPolicy::Value(_), Pixel::F32(_) | Pixel::F64(_)) => false,
            (BlankPolicy::Value(b), p) => p.as_i64() == b,
            _ => false,
        }
    }
}

/// Number of elements described by `naxis`; 1 for an empty axis list.
/// `None` when the product overflows.
pub fn element_count(naxis: &[usize]) -> Option<usize> {
    naxis.iter().try_fold(1usize, |acc, &n| acc.checked_mul(n))
}

/// Flat buffer offset of `coords`, with axis 0 varying fastest.
///
/// Returns `None` when the coordinate count differs from the number of axes
/// or any coordinate is out of range.
pub fn pixel_index(coords: &[usize], naxis: &[usize]) -> Option<usize> {
    if coords.len() != naxis.len() {
        return None;
    }
    coords
        .iter()
        .zip(naxis)
        .rev()
        .try_fold(0usize, |acc, (&c, &n)| {
            if c >= n {
                return None;
            }
            acc.checked_mul(n)?.checked_add(c)
        })
}

/// A decoded image: typed buffer, geometry and blank policy.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    naxis: Vec<usize>,
    data: ImageData,
    blank: BlankPolicy,
}

impl Image {
    pub fn new(naxis: Vec<usize>, data: ImageData, blank: BlankPolicy) -> Self {
        Image { naxis, data, blank }
    }

    pub fn naxis(&self) -> &[usize] {
        &self.naxis
    }

    pub fn data(&self) -> &ImageData {
        &self.data
    }

    pub fn bitpix(&self) -> Bitpix {
        self.data.bitpix()
    }

    pub fn blank_policy(&self) -> BlankPolicy {
        self.blank
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Raw pixel at `coords`.
    pub fn at(&self, coords: &[usize]) -> Option<Pixel> {
        self.data.get(pixel_index(coords, &self.naxis)?)
    }

    /// Pixel at `coords` widened to `i64`.
    pub fn int_at(&self, coords: &[usize]) -> Option<i64> {
        self.at(coords).map(Pixel::as_i64)
    }

    /// Pixel at `coords` widened to `f64`.
    pub fn float_at(&self, coords: &[usize]) -> Option<f64> {
        self.at(coords).map(Pixel::as_f64)
    }

    /// Whether the pixel at `coords` is blank. Out-of-range coordinates are
    /// never blank.
    pub fn is_blank(&self, coords: &[usize]) -> bool {
        self.at(coords).is_some_and(|p| self.blank.is_blank(p))
    }

    /// Minimum and maximum over non-blank pixels, or `(0.0, 0.0)` when there
    /// are none.
    pub fn stats(&self) -> (f64, f64) {
        let mut range: Option<(f64, f64)> = None;
        for i in 0..self.data.len() {
            let Some(p) = self.data.get(i) else { break };
            if self.blank.is_blank(p) {
                continue;
            }
            let x = p.as_f64();
            range = Some(match range {
                None => (x, x),
                Some((lo, hi)) => (lo.min(x), hi.max(x)),
            });
        }
        range.unwrap_or((0.0, 0.0))
    }

    /// Copy the pixels into an `f64` array shaped `[.., NAXIS2, NAXIS1]`.
    #[cfg(feature = "array")]
    pub fn to_array(&self) -> Result<ndarray::ArrayD<f64>> {
        use alloc::string::ToString;

        let shape: Vec<usize> = self.naxis.iter().rev().copied().collect();
        let values: Vec<f64> = (0..self.data.len())
            .filter_map(|i| self.data.get(i).map(Pixel::as_f64))
            .collect();
        ndarray::Array::from_shape_vec(shape, values)
            .map_err(|e| Error::InvalidHeader(e.to_string()))
    }
}

/// Read the image data section that follows `header`.
///
/// An empty `naxis` means no data and yields an empty buffer. A data section
/// cut short by the end of the stream is zero-filled.
pub fn load_image<R: Read>(
    reader: &mut BlockReader<R>,
    header: &Header,
    naxis: &[usize],
) -> Result<Image> {
    let bitpix_value = header
        .int("BITPIX")
        .ok_or_else(|| Error::MissingKeyword("BITPIX".into()))?;
    let bitpix = Bitpix::from_value(bitpix_value as i64)?;
    let blank = BlankPolicy::for_header(bitpix, header);

    if naxis.is_empty() {
        return Ok(Image::new(Vec::new(), ImageData::empty(bitpix), blank));
    }

    let (count, byte_len) = element_count(naxis)
        .and_then(|count| Some((count, count.checked_mul(bitpix.bytes_per_element())?)))
        .ok_or_else(|| Error::InvalidHeader(format!("image dimensions {naxis:?} overflow")))?;

    let (raw, got) = reader.read_zero_filled(byte_len)?;
    if got < byte_len {
        warn!("image data truncated: {got} of {byte_len} bytes, zero-filling");
    }
    debug!("image {naxis:?} bitpix {bitpix_value}: {count} elements");

    Ok(Image::new(naxis.to_vec(), decode_pixels(&raw, bitpix), blank))
}

/// Convert big-endian bytes to a native typed buffer.
fn decode_pixels(raw: &[u8], bitpix: Bitpix) -> ImageData {
    match bitpix {
        Bitpix::U8 => ImageData::U8(raw.to_vec()),
        Bitpix::I16 => {
            let mut pixels: Vec<i16> = pod_collect_to_vec(raw);
            for v in &mut pixels {
                *v = i16::from_be(*v);
            }
            ImageData::I16(pixels)
        }
        Bitpix::I32 => {
            let mut pixels: Vec<i32> = pod_collect_to_vec(raw);
            for v in &mut pixels {
                *v = i32::from_be(*v);
            }
            ImageData::I32(pixels)
        }
        Bitpix::I64 => {
            let mut pixels: Vec<i64> = pod_collect_to_vec(raw);
            for v in &mut pixels {
                *v = i64::from_be(*v);
            }
            ImageData::I64(pixels)
        }
        Bitpix::F32 => {
            let mut pixels: Vec<f32> = pod_collect_to_vec(raw);
            for v in &mut pixels {
                *v = f32::from_bits(u32::from_be(v.to_bits()));
            }
            ImageData::F32(pixels)
        }
        Bitpix::F64 => {
            let mut pixels: Vec<f64> = pod_collect_to_vec(raw);
            for v in &mut pixels {
                *v = f64::from_bits(u64::from_be(v.to_bits()));
            }
            ImageData::F64(pixels)
        }
    }
}
