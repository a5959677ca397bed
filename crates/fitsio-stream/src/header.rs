//! FITS header card parsing and header assembly.

use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::str;

use log::{trace, warn};

use crate::block::{BlockReader, CARD_SIZE};
use crate::error::{Error, Result};
use crate::io::Read;
use crate::value::{parse_literal, strip_comment, HeaderValue};

// ── Types ──

/// One decoded 80-character header record.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderCard {
    /// Columns 1–8, trimmed.
    pub key: String,
    /// The value; [`HeaderValue::Null`] when columns 9–10 are not `= `.
    pub value: HeaderValue,
    /// Text after the first unquoted `/`, or the free text of a valueless card.
    pub comment: Option<String>,
}

impl HeaderCard {
    /// Returns `true` for the terminator card.
    pub fn is_end(&self) -> bool {
        self.key == "END"
    }
}

/// Keyword → value mapping for one HDU, plus the cards in file order.
///
/// A key that appears twice keeps the value of its last card.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    values: BTreeMap<String, HeaderValue>,
    cards: Vec<HeaderCard>,
}

/// Outcome of scanning the stream for the next header.
#[derive(Debug)]
pub enum HeaderRead {
    /// A complete header up to its END card, with the NAXISn extents.
    Parsed { header: Header, naxis: Vec<usize> },
    /// The stream ran out before an END card was found.
    Done,
}

/// Highest index the standard allows in NAXISn or a table column keyword.
/// Counts read from a header only preallocate up to this many slots.
pub(crate) const MAX_INDEX: usize = 999;

/// Build an indexed keyword such as `NAXIS2` or `TFORM10`.
pub fn indexed_key(prefix: &str, n: usize) -> String {
    format!("{prefix}{n}")
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a card, overwriting any earlier value for the same key.
    pub fn insert(&mut self, card: HeaderCard) {
        self.values.insert(card.key.clone(), card.value.clone());
        self.cards.push(card);
    }

    pub fn get(&self, key: &str) -> Option<&HeaderValue> {
        self.values.get(key)
    }

    /// `true` if any card carried this key, with or without a value.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn int(&self, key: &str) -> Option<i32> {
        self.get(key).and_then(HeaderValue::as_int)
    }

    /// Numeric value of `key`; integers are widened.
    pub fn float(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(HeaderValue::as_float)
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(HeaderValue::as_bool)
    }

    pub fn string(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(HeaderValue::as_str)
    }

    /// Iterate over keys and values in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// All cards before END, in the order they appeared.
    pub fn cards(&self) -> &[HeaderCard] {
        &self.cards
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ── Parsing ──

/// Decode one 80-byte card.
///
/// Columns 9–10 must read exactly `= ` for the card to carry a value;
/// commentary, blank and continuation cards come back with
/// [`HeaderValue::Null`].
pub fn parse_card(card: &[u8]) -> Result<HeaderCard> {
    if card.len() != CARD_SIZE {
        return Err(Error::InvalidHeader(format!(
            "card is {} bytes, expected {CARD_SIZE}",
            card.len()
        )));
    }
    if !card.is_ascii() {
        return Err(Error::InvalidHeader("non-ASCII byte in header card".into()));
    }
    let text = str::from_utf8(card)
        .map_err(|_| Error::InvalidHeader("non-ASCII byte in header card".into()))?;

    let key = String::from(text[..8].trim());

    if &text[8..10] != "= " {
        let rest = text[8..].trim();
        return Ok(HeaderCard {
            key,
            value: HeaderValue::Null,
            comment: (!rest.is_empty()).then(|| String::from(rest)),
        });
    }

    let field = &text[10..];
    let value = parse_literal(field)?;
    let comment = field[strip_comment(field).len()..]
        .strip_prefix('/')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(String::from);

    Ok(HeaderCard {
        key,
        value,
        comment,
    })
}

/// Read header blocks until the END card and collect the axis extents.
///
/// Each block is taken whole from [`BlockReader::next_block`], so after a
/// successful return the reader sits at the start of the data section.
/// Running out of input, even part way through a header, yields
/// [`HeaderRead::Done`].
pub fn read_header<R: Read>(reader: &mut BlockReader<R>) -> Result<HeaderRead> {
    let mut header = Header::new();
    let mut blocks = 0usize;

    loop {
        let Some(block) = reader.next_block()? else {
            if blocks > 0 {
                warn!("stream ended inside a header after {blocks} block(s)");
            }
            return Ok(HeaderRead::Done);
        };
        blocks += 1;

        for raw in block.chunks_exact(CARD_SIZE) {
            let card = parse_card(raw)?;
            if card.is_end() {
                let naxis = collect_naxis(&header)?;
                trace!(
                    "header complete: {} keys in {blocks} block(s), naxis {naxis:?}",
                    header.len()
                );
                return Ok(HeaderRead::Parsed { header, naxis });
            }
            header.insert(card);
        }
    }
}

/// Gather NAXIS1..NAXISn when NAXIS is an integer; otherwise no axes.
fn collect_naxis(header: &Header) -> Result<Vec<usize>> {
    let Some(n) = header.int("NAXIS") else {
        return Ok(Vec::new());
    };
    let n = usize::try_from(n)
        .map_err(|_| Error::InvalidHeader(format!("negative NAXIS value {n}")))?;

    let mut naxis = Vec::with_capacity(n.min(MAX_INDEX));
    for i in 1..=n {
        let key = indexed_key("NAXIS", i);
        let extent = header
            .int(&key)
            .ok_or_else(|| Error::MissingKeyword(key.clone()))?;
        let extent = usize::try_from(extent)
            .map_err(|_| Error::InvalidHeader(format!("negative {key} value {extent}")))?;
        naxis.push(extent);
    }
    Ok(naxis)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{BLOCK_SIZE, CARDS_PER_BLOCK};
    use crate::io::Cursor;
    use alloc::vec;

    fn make_card(s: &str) -> [u8; CARD_SIZE] {
        let mut buf = [b' '; CARD_SIZE];
        let bytes = s.as_bytes();
        let len = bytes.len().min(CARD_SIZE);
        buf[..len].copy_from_slice(&bytes[..len]);
        buf
    }

    fn make_blocks(cards: &[&str]) -> Vec<u8> {
        let blocks = cards.len().div_ceil(CARDS_PER_BLOCK).max(1);
        let mut data = vec![b' '; blocks * BLOCK_SIZE];
        for (i, c) in cards.iter().enumerate() {
            data[i * CARD_SIZE..(i + 1) * CARD_SIZE].copy_from_slice(&make_card(c));
        }
        data
    }

    fn parse(cards: &[&str]) -> Result<HeaderRead> {
        let data = make_blocks(cards);
        let mut reader = BlockReader::new(Cursor::new(&data[..]));
        read_header(&mut reader)
    }

    // ---- parse_card ----

    #[test]
    fn card_string_value_with_comment() {
        let c = parse_card(&make_card("TELESCOP= 'Hubble  '           / telescope name")).unwrap();
        assert_eq!(c.key, "TELESCOP");
        assert_eq!(c.value, HeaderValue::String("Hubble".into()));
        assert_eq!(c.comment.as_deref(), Some("telescope name"));
    }

    #[test]
    fn card_integer_value() {
        let c = parse_card(&make_card("BITPIX  =                   16 / bits per pixel")).unwrap();
        assert_eq!(c.key, "BITPIX");
        assert_eq!(c.value, HeaderValue::Int(16));
    }

    #[test]
    fn card_doubled_quote() {
        let c = parse_card(&make_card("OBSERVER= 'O''Brien'")).unwrap();
        assert_eq!(c.value, HeaderValue::String("O'Brien".into()));
        assert!(c.comment.is_none());
    }

    #[test]
    fn card_slash_inside_string_is_not_a_comment() {
        let c = parse_card(&make_card("DATE-OBS= '2024/01/15' / when")).unwrap();
        assert_eq!(c.value, HeaderValue::String("2024/01/15".into()));
        assert_eq!(c.comment.as_deref(), Some("when"));
    }

    #[test]
    fn card_without_value_indicator_is_null() {
        let c = parse_card(&make_card("COMMENT This is a comment = with equals")).unwrap();
        assert_eq!(c.key, "COMMENT");
        assert!(c.value.is_null());
        assert_eq!(c.comment.as_deref(), Some("This is a comment = with equals"));

        // '=' in column 9 without the following space does not count.
        let c = parse_card(&make_card("NOSPACE =1")).unwrap();
        assert!(c.value.is_null());
    }

    #[test]
    fn card_blank() {
        let c = parse_card(&[b' '; CARD_SIZE]).unwrap();
        assert_eq!(c.key, "");
        assert!(c.value.is_null());
        assert!(c.comment.is_none());
    }

    #[test]
    fn card_empty_value_with_comment() {
        let c = parse_card(&make_card("BLANK   =                      / undefined")).unwrap();
        assert!(c.value.is_null());
        assert_eq!(c.comment.as_deref(), Some("undefined"));
    }

    #[test]
    fn card_end() {
        assert!(parse_card(&make_card("END")).unwrap().is_end());
    }

    #[test]
    fn card_unterminated_string_is_error() {
        let err = parse_card(&make_card("OBJECT  = 'no closing quote")).unwrap_err();
        assert!(matches!(err, Error::InvalidString));
    }

    #[test]
    fn card_non_ascii_is_error() {
        let mut raw = make_card("OBJECT  = 'x'");
        raw[12] = 0xC3;
        assert!(matches!(parse_card(&raw), Err(Error::InvalidHeader(_))));
    }

    // ---- read_header ----

    #[test]
    fn header_simple_image() {
        let read = parse(&[
            "SIMPLE  =                    T / conforms to FITS standard",
            "BITPIX  =                   16",
            "NAXIS   =                    2",
            "NAXIS1  =                  100",
            "NAXIS2  =                  200",
            "END",
        ])
        .unwrap();
        let HeaderRead::Parsed { header, naxis } = read else {
            panic!("expected a header");
        };
        assert_eq!(naxis, vec![100, 200]);
        assert_eq!(header.bool("SIMPLE"), Some(true));
        assert_eq!(header.int("BITPIX"), Some(16));
        assert!(!header.contains("END"));
        assert_eq!(header.cards().len(), 5);
    }

    #[test]
    fn header_without_naxis_has_no_axes() {
        let read = parse(&["XTENSION= 'IMAGE   '", "END"]).unwrap();
        let HeaderRead::Parsed { naxis, .. } = read else {
            panic!("expected a header");
        };
        assert!(naxis.is_empty());
    }

    #[test]
    fn header_missing_naxisn_is_error() {
        let err = parse(&[
            "SIMPLE  =                    T",
            "BITPIX  =                    8",
            "NAXIS   =                    2",
            "NAXIS1  =                   10",
            "END",
        ])
        .unwrap_err();
        assert!(matches!(err, Error::MissingKeyword(ref k) if k == "NAXIS2"));
    }

    #[test]
    fn header_non_integer_naxisn_is_error() {
        let err = parse(&[
            "NAXIS   =                    1",
            "NAXIS1  =                 10.0",
            "END",
        ])
        .unwrap_err();
        assert!(matches!(err, Error::MissingKeyword(_)));
    }

    #[test]
    fn header_duplicate_key_last_wins() {
        let read = parse(&["OBJECT  = 'first'", "OBJECT  = 'second'", "END"]).unwrap();
        let HeaderRead::Parsed { header, .. } = read else {
            panic!("expected a header");
        };
        assert_eq!(header.string("OBJECT"), Some("second"));
        assert_eq!(header.cards().len(), 2);
        assert_eq!(header.len(), 1);
    }

    #[test]
    fn header_cards_after_end_are_ignored() {
        let read = parse(&["A       =                    1", "END", "B       =                    2"])
            .unwrap();
        let HeaderRead::Parsed { header, .. } = read else {
            panic!("expected a header");
        };
        assert!(header.contains("A"));
        assert!(!header.contains("B"));
    }

    #[test]
    fn header_spanning_two_blocks() {
        let mut cards: Vec<String> = (0..CARDS_PER_BLOCK)
            .map(|i| format!("KEY{i:<5}=                    {i}"))
            .collect();
        cards.push("END".into());
        let refs: Vec<&str> = cards.iter().map(String::as_str).collect();
        let data = make_blocks(&refs);
        assert_eq!(data.len(), 2 * BLOCK_SIZE);

        let mut reader = BlockReader::new(Cursor::new(&data[..]));
        let HeaderRead::Parsed { header, .. } = read_header(&mut reader).unwrap() else {
            panic!("expected a header");
        };
        assert_eq!(header.len(), CARDS_PER_BLOCK);
        assert_eq!(header.int("KEY35"), Some(35));
        assert_eq!(reader.blocks_read(), 2);
    }

    #[test]
    fn empty_stream_is_done() {
        let mut reader = BlockReader::new(Cursor::new(&[][..]));
        assert!(matches!(read_header(&mut reader).unwrap(), HeaderRead::Done));
    }

    #[test]
    fn header_without_end_is_done() {
        let read = parse(&["SIMPLE  =                    T", "BITPIX  =                    8"]).unwrap();
        assert!(matches!(read, HeaderRead::Done));
    }

    #[test]
    fn indexed_keys() {
        assert_eq!(indexed_key("NAXIS", 1), "NAXIS1");
        assert_eq!(indexed_key("TFORM", 12), "TFORM12");
    }
}
