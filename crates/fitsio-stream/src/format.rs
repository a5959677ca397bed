//! Rendering of table values through Fortran-style TDISP directives.
//!
//! A directive is `<code><width>[.<precision>]`. The output is right-justified
//! in `width` characters and never truncated, except by `A` which also caps
//! the string at `width` characters. Floating-point conversions follow the C
//! `%f`, `%e` and `%g` conventions, with exponents of at least two digits.

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::field::{FieldValue, Scalar};

/// Width used when a directive gives a code but no usable width.
pub const DEFAULT_WIDTH: usize = 14;

/// A parsed TDISP directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayFormat {
    /// One of `A I B O Z F D E G`; `EN` and `ES` are folded into `E`.
    pub code: char,
    pub width: usize,
    pub precision: Option<usize>,
}

/// Parse a TDISP value. Returns `None` for an empty or unrecognised code,
/// which callers render with the generic default.
pub fn parse_display(tdisp: &str) -> Option<DisplayFormat> {
    let tdisp = tdisp.trim();
    let mut chars = tdisp.chars();
    let code = chars.next()?;
    if !matches!(code, 'A' | 'I' | 'B' | 'O' | 'Z' | 'F' | 'D' | 'E' | 'G') {
        return None;
    }

    let mut rest = chars.as_str();
    if code == 'E' {
        rest = rest.strip_prefix(['N', 'S']).unwrap_or(rest);
    }

    let (width, precision) = match rest.split_once('.') {
        Some((w, p)) => (w, p.parse().ok()),
        None => (rest, None),
    };
    Some(DisplayFormat {
        code,
        width: width.parse().unwrap_or(DEFAULT_WIDTH),
        precision,
    })
}

/// Render a cell value. Vectors render each element with the same directive,
/// space-separated inside brackets.
pub fn render(value: &FieldValue, format: Option<&DisplayFormat>) -> String {
    match value {
        FieldValue::Scalar(s) => render_scalar(s, format),
        FieldValue::Array(items) => {
            let parts: Vec<String> = items.iter().map(|s| render_scalar(s, format)).collect();
            format!("[{}]", parts.join(" "))
        }
    }
}

fn render_scalar(value: &Scalar, format: Option<&DisplayFormat>) -> String {
    let Some(f) = format else {
        return plain(value);
    };
    let body = match f.code {
        'A' => {
            let s = plain(value);
            match s.char_indices().nth(f.width) {
                Some((cut, _)) => String::from(&s[..cut]),
                None => s,
            }
        }
        'I' => with_integer(value, |n| n.to_string()),
        'B' => with_integer(value, |n| signed_radix(n, |m| format!("{m:b}"))),
        'O' => with_integer(value, |n| signed_radix(n, |m| format!("{m:o}"))),
        'Z' => with_integer(value, |n| signed_radix(n, |m| format!("{m:X}"))),
        'F' | 'D' => with_float(value, |x| fixed(x, f.precision.unwrap_or(6))),
        'E' => with_float(value, |x| scientific(x, f.precision.unwrap_or(6))),
        'G' => with_float(value, |x| general(x, f.precision)),
        _ => plain(value),
    };
    format!("{body:>width$}", width = f.width)
}

/// Generic rendering used when no directive applies.
fn plain(value: &Scalar) -> String {
    match value {
        Scalar::F32(x) => general(*x as f64, None),
        Scalar::F64(x) => general(*x, None),
        Scalar::C32(re, im) => complex(*re as f64, *im as f64, |x| general(x, None)),
        Scalar::C64(re, im) => complex(*re, *im, |x| general(x, None)),
        other => other.to_string(),
    }
}

/// Apply an integer conversion; floats are rounded to the nearest integer.
fn with_integer(value: &Scalar, conv: impl Fn(i64) -> String) -> String {
    match value {
        Scalar::F32(x) => conv(libm::round(*x as f64) as i64),
        Scalar::F64(x) => conv(libm::round(*x) as i64),
        Scalar::Str(_) | Scalar::Bool(_) | Scalar::C32(..) | Scalar::C64(..) => plain(value),
        other => other.as_i64().map(conv).unwrap_or_else(|| plain(other)),
    }
}

/// Apply a float conversion; integers are widened and complex values are
/// converted part by part.
fn with_float(value: &Scalar, conv: impl Fn(f64) -> String) -> String {
    match value {
        Scalar::C32(re, im) => complex(*re as f64, *im as f64, conv),
        Scalar::C64(re, im) => complex(*re, *im, conv),
        Scalar::Str(_) | Scalar::Bool(_) => plain(value),
        other => other.as_f64().map(conv).unwrap_or_else(|| plain(other)),
    }
}

fn complex(re: f64, im: f64, conv: impl Fn(f64) -> String) -> String {
    let sign = if im.is_sign_negative() && !im.is_nan() { '-' } else { '+' };
    format!("({}{sign}{}i)", conv(re), conv(im.abs()))
}

/// Digits of `|n|` in some radix, with a leading `-` for negative values.
fn signed_radix(n: i64, digits: impl Fn(u64) -> String) -> String {
    let body = digits(n.unsigned_abs());
    if n < 0 {
        format!("-{body}")
    } else {
        body
    }
}

fn non_finite(x: f64) -> Option<String> {
    if x.is_nan() {
        Some("NaN".into())
    } else if x.is_infinite() {
        Some(if x > 0.0 { "+Inf" } else { "-Inf" }.into())
    } else {
        None
    }
}

/// `%.pf`
fn fixed(x: f64, precision: usize) -> String {
    non_finite(x).unwrap_or_else(|| format!("{x:.precision$}"))
}

/// `%.pe`
fn scientific(x: f64, precision: usize) -> String {
    non_finite(x).unwrap_or_else(|| c_exponent(&format!("{x:.precision$e}")))
}

/// Rewrite Rust's `1.5e2` exponent as C's `1.5e+02`.
fn c_exponent(s: &str) -> String {
    match s.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{mantissa}e{sign}{:02}", exp.unsigned_abs())
        }
        None => String::from(s),
    }
}

/// `%g` / `%.pg`: fixed or scientific notation, whichever C would pick,
/// with trailing zeros removed. `None` selects the shortest digits that
/// round-trip.
fn general(x: f64, precision: Option<usize>) -> String {
    if let Some(s) = non_finite(x) {
        return s;
    }

    // Significant digits and decimal exponent of |x|.
    let sci = match precision {
        Some(p) => format!("{:.*e}", p.max(1) - 1, x.abs()),
        None => format!("{:e}", x.abs()),
    };
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    let digits = digits.trim_end_matches('0');
    let nd = digits.len() as i32;
    // Position of the decimal point relative to the digit string.
    let dp = if nd == 0 { 0 } else { exp + 1 };

    let shortest = precision.is_none();
    let mut prec = match precision {
        Some(p) => p.max(1) as i32,
        None => nd,
    };
    let mut eprec = prec;
    if eprec > nd && nd >= dp {
        eprec = nd;
    }
    if shortest {
        eprec = 6;
    }

    let sign = if x.is_sign_negative() { "-" } else { "" };
    let exp = dp - 1;
    if exp < -4 || exp >= eprec {
        prec = prec.min(nd).max(1);
        let mut out = String::from(sign);
        out.push_str(&digits[..1]);
        if prec > 1 {
            out.push('.');
            out.push_str(&digits[1..prec as usize]);
        }
        let esign = if exp < 0 { '-' } else { '+' };
        out.push_str(&format!("e{esign}{:02}", exp.unsigned_abs()));
        return out;
    }

    if prec > dp {
        prec = nd;
    }
    let decimals = (prec - dp).max(0) as usize;
    format!("{sign}{:.decimals$}", x.abs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn fmt(tdisp: &str, value: Scalar) -> String {
        render(&FieldValue::Scalar(value), parse_display(tdisp).as_ref())
    }

    // ---- parse_display ----

    #[test]
    fn parse_directives() {
        assert_eq!(
            parse_display("F10.4"),
            Some(DisplayFormat {
                code: 'F',
                width: 10,
                precision: Some(4)
            })
        );
        assert_eq!(parse_display(" I6 ").unwrap().width, 6);
        assert_eq!(parse_display("I6").unwrap().precision, None);
    }

    #[test]
    fn parse_engineering_and_scientific_fold_to_e() {
        let f = parse_display("EN12.3").unwrap();
        assert_eq!((f.code, f.width, f.precision), ('E', 12, Some(3)));
        let f = parse_display("ES9.2").unwrap();
        assert_eq!((f.code, f.width, f.precision), ('E', 9, Some(2)));
    }

    #[test]
    fn parse_missing_width_defaults() {
        assert_eq!(parse_display("G").unwrap().width, DEFAULT_WIDTH);
        assert_eq!(parse_display("F.3").unwrap().width, DEFAULT_WIDTH);
    }

    #[test]
    fn parse_unknown_code() {
        assert_eq!(parse_display("L5"), None);
        assert_eq!(parse_display(""), None);
    }

    // ---- fixed point ----

    #[test]
    fn fixed_point_right_justified() {
        assert_eq!(fmt("F10.4", Scalar::F64(987.654321)), "  987.6543");
        assert_eq!(fmt("F10.4", Scalar::F64(987.654321)).trim(), "987.6543");
        assert_eq!(fmt("D8.2", Scalar::F32(-1.5)), "   -1.50");
    }

    #[test]
    fn fixed_point_default_precision_and_overflow() {
        assert_eq!(fmt("F4", Scalar::F64(3.25)), "3.250000");
        assert_eq!(fmt("F6.1", Scalar::I32(42)), "  42.0");
    }

    // ---- scientific and general ----

    #[test]
    fn scientific_uses_two_digit_exponent() {
        assert_eq!(fmt("E12.4", Scalar::F64(987.654321)), "  9.8765e+02");
        assert_eq!(fmt("E10.2", Scalar::F64(-0.00125)), " -1.25e-03");
        assert_eq!(fmt("EN12.4", Scalar::F64(987.654321)), "  9.8765e+02");
    }

    #[test]
    fn general_with_precision() {
        assert_eq!(fmt("G10.3", Scalar::F64(987.654321)), "       988");
        assert_eq!(fmt("G10.3", Scalar::F64(1.5)), "       1.5");
        assert_eq!(fmt("G10.3", Scalar::F64(123456.0)), "  1.23e+05");
        assert_eq!(fmt("G8.4", Scalar::F64(0.0)), "       0");
    }

    #[test]
    fn general_shortest() {
        assert_eq!(general(987.654321, None), "987.654321");
        assert_eq!(general(0.0001234, None), "0.0001234");
        assert_eq!(general(1e-5, None), "1e-05");
        assert_eq!(general(1234567.0, None), "1.234567e+06");
        assert_eq!(general(100000.0, None), "100000");
        assert_eq!(general(-2.5, None), "-2.5");
        assert_eq!(general(0.0, None), "0");
    }

    #[test]
    fn non_finite_values() {
        assert_eq!(fmt("F6.2", Scalar::F64(f64::NAN)), "   NaN");
        assert_eq!(fmt("E8.2", Scalar::F64(f64::INFINITY)), "    +Inf");
        assert_eq!(general(f64::NEG_INFINITY, None), "-Inf");
    }

    // ---- integers ----

    #[test]
    fn integer_directives() {
        assert_eq!(fmt("I5", Scalar::I16(42)), "   42");
        assert_eq!(fmt("I3", Scalar::U8(255)), "255");
        assert_eq!(fmt("I2", Scalar::I64(-12345)), "-12345");
        assert_eq!(fmt("I4", Scalar::F64(2.5)), "   3");
    }

    #[test]
    fn radix_directives() {
        assert_eq!(fmt("B8", Scalar::I32(5)), "     101");
        assert_eq!(fmt("O4", Scalar::I32(-8)), " -10");
        assert_eq!(fmt("Z4", Scalar::I32(255)), "  FF");
    }

    #[test]
    fn logical_renders_letter() {
        assert_eq!(fmt("B1", Scalar::Bool(true)), "T");
        assert_eq!(fmt("I3", Scalar::Bool(false)), "  F");
    }

    // ---- strings ----

    #[test]
    fn character_directive_pads_and_truncates() {
        assert_eq!(fmt("A6", Scalar::Str("ab".into())), "    ab");
        assert_eq!(fmt("A3", Scalar::Str("abcdef".into())), "abc");
        assert_eq!(fmt("F8.2", Scalar::Str("text".into())), "    text");
    }

    // ---- complex, arrays and defaults ----

    #[test]
    fn complex_parts_share_the_directive() {
        assert_eq!(fmt("F4.1", Scalar::C64(1.0, -2.0)), "(1.0-2.0i)");
        assert_eq!(render(&FieldValue::Scalar(Scalar::C32(0.5, 3.0)), None), "(0.5+3i)");
    }

    #[test]
    fn array_elements_each_formatted() {
        let v = FieldValue::Array(vec![Scalar::I16(1), Scalar::I16(2)]);
        assert_eq!(render(&v, parse_display("I3").as_ref()), "[  1   2]");
        assert_eq!(render(&v, None), "[1 2]");
    }

    #[test]
    fn default_rendering() {
        assert_eq!(fmt("", Scalar::F64(1.5)), "1.5");
        assert_eq!(fmt("Q9", Scalar::I32(7)), "7");
        assert_eq!(fmt("", Scalar::Str("  raw ".into())), "  raw ");
    }
}
