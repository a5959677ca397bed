//! Big-endian scalar decoding for FITS data.
//!
//! FITS stores every multi-byte number most-significant byte first. These
//! helpers decode one value from the front of a byte slice; callers are
//! responsible for the slice being long enough.

/// Read a big-endian `i16` from the first 2 bytes of the slice.
#[inline]
pub fn read_i16_be(buf: &[u8]) -> i16 {
    i16::from_be_bytes([buf[0], buf[1]])
}

/// Read a big-endian `i32` from the first 4 bytes of the slice.
#[inline]
pub fn read_i32_be(buf: &[u8]) -> i32 {
    i32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]])
}

/// Read a big-endian `i64` from the first 8 bytes of the slice.
#[inline]
pub fn read_i64_be(buf: &[u8]) -> i64 {
    i64::from_be_bytes([
        buf[0], buf[1], buf[2], buf[3], buf[4], buf[5], buf[6], buf[7],
    ])
}

/// Read a big-endian `f32` (IEEE 754) from the first 4 bytes of the slice.
#[inline]
pub fn read_f32_be(buf: &[u8]) -> f32 {
    f32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]])
}

/// Read a big-endian `f64` (IEEE 754) from the first 8 bytes of the slice.
#[inline]
pub fn read_f64_be(buf: &[u8]) -> f64 {
    f64::from_be_bytes([
        buf[0], buf[1], buf[2], buf[3], buf[4], buf[5], buf[6], buf[7],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_bytes_i16() {
        assert_eq!(read_i16_be(&[0x01, 0x02]), 0x0102);
        assert_eq!(read_i16_be(&[0xFF, 0xFE]), -2);
    }

    #[test]
    fn known_bytes_i32() {
        assert_eq!(read_i32_be(&[0x00, 0x00, 0x01, 0x00]), 256);
        assert_eq!(read_i32_be(&[0x80, 0x00, 0x00, 0x00]), i32::MIN);
    }

    #[test]
    fn known_bytes_i64() {
        let bytes = [0x01, 0x23, 0x45, 0x67, 0x89, 0xAB, 0xCD, 0xEF];
        assert_eq!(read_i64_be(&bytes), 0x0123_4567_89AB_CDEF);
        assert_eq!(read_i64_be(&[0xFF; 8]), -1);
    }

    #[test]
    fn known_bytes_f32() {
        // 1.0f32 = 0x3F800000
        assert_eq!(read_f32_be(&[0x3F, 0x80, 0x00, 0x00]), 1.0);
        assert!(read_f32_be(&[0x7F, 0xC0, 0x00, 0x00]).is_nan());
    }

    #[test]
    fn known_bytes_f64() {
        // -2.5 = 0xC004000000000000
        assert_eq!(
            read_f64_be(&[0xC0, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]),
            -2.5
        );
    }

    #[test]
    fn read_at_offset() {
        let buf = [0xAA, 0xBB, 0x00, 0x07, 0xCC];
        assert_eq!(read_i16_be(&buf[2..]), 7);
    }
}
