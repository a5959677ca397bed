//! Header value literals: classification and the quoted-string scanner.

use alloc::string::String;
use core::fmt;

use log::warn;

use crate::error::{Error, Result};

/// A parsed FITS header value.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    /// Integer literal without `.`, `D` or `E`.
    Int(i32),
    /// Floating-point literal (Fortran `D` exponents accepted).
    Float(f64),
    /// Logical `T` or `F`.
    Bool(bool),
    /// Quoted character string with trailing spaces removed.
    String(String),
    /// Complex pair `(real, imag)`.
    Complex(f64, f64),
    /// No value: commentary cards, cards without `= `, or empty literals.
    Null,
}

impl HeaderValue {
    pub fn as_int(&self) -> Option<i32> {
        match self {
            HeaderValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric value as `f64`; integers are widened.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            HeaderValue::Int(n) => Some(*n as f64),
            HeaderValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            HeaderValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            HeaderValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, HeaderValue::Null)
    }
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderValue::Int(n) => write!(f, "{n}"),
            HeaderValue::Float(x) => write!(f, "{x}"),
            HeaderValue::Bool(b) => f.write_str(if *b { "T" } else { "F" }),
            HeaderValue::String(s) => write!(f, "'{s}'"),
            HeaderValue::Complex(re, im) => write!(f, "({re}, {im})"),
            HeaderValue::Null => Ok(()),
        }
    }
}

/// States of the quoted-string scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    /// Waiting for the opening quote.
    Open,
    /// Inside the string, echoing characters.
    Collect,
    /// Just saw a quote: either an escaped quote or the end of the string.
    CandidateClose,
}

/// Decode a FITS string literal such as `'O''Brien  '`.
///
/// A doubled quote inside the string is a literal quote. Anything after the
/// closing quote is ignored and trailing spaces are trimmed from the result.
/// Input that does not open with a quote, or that ends while the string is
/// still open, is rejected with [`Error::InvalidString`].
pub fn decode_string(literal: &str) -> Result<String> {
    let mut state = ScanState::Open;
    let mut out = String::new();

    for ch in literal.chars() {
        let quote = ch == '\'';
        state = match state {
            ScanState::Open if quote => ScanState::Collect,
            ScanState::Open => return Err(Error::InvalidString),
            ScanState::Collect if quote => ScanState::CandidateClose,
            ScanState::Collect => {
                out.push(ch);
                ScanState::Collect
            }
            ScanState::CandidateClose if quote => {
                out.push('\'');
                ScanState::Collect
            }
            ScanState::CandidateClose => break,
        };
    }

    match state {
        ScanState::Open | ScanState::Collect => Err(Error::InvalidString),
        ScanState::CandidateClose => {
            let trimmed = out.trim_end_matches(' ').len();
            out.truncate(trimmed);
            Ok(out)
        }
    }
}

/// Cut a value field at the first `/` that is not inside a quoted string.
pub fn strip_comment(field: &str) -> &str {
    let mut quoted = false;
    for (i, ch) in field.char_indices() {
        match ch {
            '\'' => quoted = !quoted,
            '/' if !quoted => return &field[..i],
            _ => {}
        }
    }
    field
}

/// Parse a float, accepting a Fortran `D` exponent.
pub(crate) fn parse_fortran_float(text: &str) -> Option<f64> {
    text.replacen('D', "E", 1).parse::<f64>().ok()
}

/// Classify and parse the value region of a card (columns 11–80).
///
/// The trailing comment is removed first. Numeric or complex literals that
/// cannot be parsed degrade to [`HeaderValue::Null`] with a warning; a bad
/// string literal is an error.
pub fn parse_literal(field: &str) -> Result<HeaderValue> {
    let literal = strip_comment(field).trim();
    let Some(first) = literal.chars().next() else {
        return Ok(HeaderValue::Null);
    };

    let value = match first {
        '\'' => HeaderValue::String(decode_string(literal)?),
        '0'..='9' | '+' | '-' => parse_number(literal),
        '(' => parse_complex(literal),
        _ if literal == "T" => HeaderValue::Bool(true),
        _ if literal == "F" => HeaderValue::Bool(false),
        _ => {
            warn!("unrecognized header literal {literal:?}");
            HeaderValue::Null
        }
    };
    Ok(value)
}

fn parse_number(literal: &str) -> HeaderValue {
    if literal.contains(['.', 'D', 'E']) {
        return match parse_fortran_float(literal) {
            Some(x) => HeaderValue::Float(x),
            None => {
                warn!("unparseable float literal {literal:?}");
                HeaderValue::Null
            }
        };
    }

    match literal.parse::<i32>() {
        Ok(n) => HeaderValue::Int(n),
        // Out-of-range integers and lowercase exponents still carry a number.
        Err(_) => match literal.parse::<f64>() {
            Ok(x) => HeaderValue::Float(x),
            Err(_) => {
                warn!("unparseable numeric literal {literal:?}");
                HeaderValue::Null
            }
        },
    }
}

fn parse_complex(literal: &str) -> HeaderValue {
    let parsed = literal
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .and_then(|inner| inner.split_once(','))
        .and_then(|(re, im)| {
            Some((
                parse_fortran_float(re.trim())?,
                parse_fortran_float(im.trim())?,
            ))
        });
    match parsed {
        Some((re, im)) => HeaderValue::Complex(re, im),
        None => {
            warn!("unparseable complex literal {literal:?}");
            HeaderValue::Null
        }
    }
}
