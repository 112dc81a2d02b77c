//! Record model and codec for the mcabber history format.
//!
//! One record on disk is a fixed-offset header line followed by zero or
//! more continuation lines:
//!
//! ```text
//! MS 20100901T13:39:14Z 001 first body line
//! second body line
//! ```
//!
//! The header fields live at fixed byte offsets (kind at 0-1, timestamp at
//! 3-20, continuation count at 22-24, body from 26). Parsing must use those
//! offsets rather than whitespace splitting because body text may itself
//! contain spaces.

use std::io::{BufRead, Write};

use crate::error::HistoryError;

/// Length of the kind field ("MR", "MS", ...).
pub const KIND_LEN: usize = 2;
/// Length of the timestamp field ("20100901T13:39:14Z").
pub const TIMESTAMP_LEN: usize = 18;
/// Length of the zero-padded continuation count field ("000", "001", ...).
pub const COUNT_LEN: usize = 3;
/// Byte offset where the first body line starts on the header line.
pub const BODY_OFFSET: usize = KIND_LEN + 1 + TIMESTAMP_LEN + 1 + COUNT_LEN + 1;

const TIMESTAMP_OFFSET: usize = KIND_LEN + 1;
const COUNT_OFFSET: usize = TIMESTAMP_OFFSET + TIMESTAMP_LEN + 1;

/// One parsed chat-history entry.
///
/// Two records are considered the same entry (and deduplicated on merge)
/// only when kind, timestamp and every body line match; the derived
/// `PartialEq` is exactly that content-equality rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Message kind code, exactly two non-whitespace characters.
    pub kind: String,
    /// Fixed-width timestamp; lexicographic order equals chronological order.
    pub timestamp: String,
    /// Body lines, each terminated by exactly one `\n`.
    /// Length is always `continuation_count + 1`.
    pub body_lines: Vec<String>,
}

impl Record {
    /// Number of continuation lines following the header line.
    pub fn continuation_count(&self) -> usize {
        self.body_lines.len().saturating_sub(1)
    }

    /// Read one record from `reader`, positioned at a record boundary.
    ///
    /// Returns `Ok(None)` at clean end of stream, before any header bytes
    /// were consumed. A short, non-ASCII or otherwise malformed header
    /// fails with [`HistoryError::MalformedHeader`]; fewer continuation
    /// lines than declared fail with [`HistoryError::TruncatedRecord`].
    pub fn read_from<R: BufRead>(reader: &mut R) -> Result<Option<Self>, HistoryError> {
        let mut header = String::new();
        if reader.read_line(&mut header)? == 0 {
            return Ok(None);
        }

        let bytes = header.as_bytes();
        if bytes.len() < BODY_OFFSET || !bytes[..BODY_OFFSET].is_ascii() {
            return Err(malformed(&header));
        }
        if bytes[KIND_LEN] != b' '
            || bytes[TIMESTAMP_OFFSET + TIMESTAMP_LEN] != b' '
            || bytes[COUNT_OFFSET + COUNT_LEN] != b' '
        {
            return Err(malformed(&header));
        }

        let kind = &header[..KIND_LEN];
        if kind.bytes().any(|b| b.is_ascii_whitespace()) {
            return Err(malformed(&header));
        }

        let timestamp = &header[TIMESTAMP_OFFSET..TIMESTAMP_OFFSET + TIMESTAMP_LEN];

        let count_field = &header[COUNT_OFFSET..COUNT_OFFSET + COUNT_LEN];
        if !count_field.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed(&header));
        }
        // Always succeeds after the digit check; field width caps it at 999.
        let count: usize = count_field.parse().unwrap_or(0);

        // The remainder of the header line is the first body line. Trailing
        // whitespace (including the terminator, or a CRLF pair) is dropped
        // and exactly one '\n' is appended.
        let mut first = header[BODY_OFFSET..].trim_end().to_string();
        first.push('\n');

        let mut body_lines = Vec::with_capacity(count + 1);
        body_lines.push(first);

        for found in 0..count {
            let mut line = String::new();
            if reader.read_line(&mut line)? == 0 {
                return Err(HistoryError::TruncatedRecord {
                    expected: count,
                    found,
                });
            }
            if !line.ends_with('\n') {
                line.push('\n');
            }
            body_lines.push(line);
        }

        Ok(Some(Record {
            kind: kind.to_string(),
            timestamp: timestamp.to_string(),
            body_lines,
        }))
    }

    /// Write this record in its on-disk form.
    ///
    /// Body lines are written verbatim (they are terminator-normalized at
    /// decode time); nothing is re-validated here.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), HistoryError> {
        write!(
            writer,
            "{} {} {:0width$} ",
            self.kind,
            self.timestamp,
            self.continuation_count(),
            width = COUNT_LEN
        )?;
        for line in &self.body_lines {
            writer.write_all(line.as_bytes())?;
        }
        Ok(())
    }
}

/// Decode every record in `reader` until clean end of stream.
///
/// Any decode error fails the whole read; there is no partial-record
/// recovery within a file.
pub fn read_records<R: BufRead>(reader: &mut R) -> Result<Vec<Record>, HistoryError> {
    let mut records = Vec::new();
    while let Some(record) = Record::read_from(reader)? {
        records.push(record);
    }
    Ok(records)
}

fn malformed(header: &str) -> HistoryError {
    HistoryError::MalformedHeader(header.trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Cursor;

    fn decode_one(text: &str) -> Result<Option<Record>, HistoryError> {
        Record::read_from(&mut Cursor::new(text))
    }

    #[test]
    fn test_decode_simple_record() {
        let record = decode_one("MS 20200101T00:00:00Z 000 hello world\n")
            .unwrap()
            .unwrap();
        assert_eq!(record.kind, "MS");
        assert_eq!(record.timestamp, "20200101T00:00:00Z");
        assert_eq!(record.continuation_count(), 0);
        assert_eq!(record.body_lines, vec!["hello world\n"]);
    }

    #[test]
    fn test_decode_multiline_record() {
        let text = "MR 20200101T12:30:00Z 002 first\nsecond\nthird\n";
        let record = decode_one(text).unwrap().unwrap();
        assert_eq!(record.continuation_count(), 2);
        assert_eq!(record.body_lines, vec!["first\n", "second\n", "third\n"]);
    }

    #[test]
    fn test_body_may_contain_spaces_and_digits() {
        // Embedded spaces in the body must not desynchronize the fixed
        // offset parse.
        let text = "MS 20200101T00:00:00Z 000 a b c 123 MS 20200101T00:00:00Z\n";
        let record = decode_one(text).unwrap().unwrap();
        assert_eq!(record.body_lines[0], "a b c 123 MS 20200101T00:00:00Z\n");
    }

    #[test]
    fn test_clean_eof_returns_none() {
        assert!(decode_one("").unwrap().is_none());
    }

    #[test]
    fn test_round_trip_is_byte_identical() {
        let text = "MR 20160504T09:15:00Z 002 line one\n  indented line\n\n";
        let record = decode_one(text).unwrap().unwrap();
        let mut out = Vec::new();
        record.write_to(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), text);
    }

    #[test]
    fn test_decode_normalizes_trailing_whitespace() {
        let record = decode_one("MS 20200101T00:00:00Z 000 hello  \r\n")
            .unwrap()
            .unwrap();
        assert_eq!(record.body_lines[0], "hello\n");

        let mut out = Vec::new();
        record.write_to(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "MS 20200101T00:00:00Z 000 hello\n"
        );
    }

    #[test]
    fn test_encode_zero_pads_count() {
        let record = Record {
            kind: "MS".to_string(),
            timestamp: "20200101T00:00:00Z".to_string(),
            body_lines: vec!["a\n".to_string(), "b\n".to_string()],
        };
        let mut out = Vec::new();
        record.write_to(&mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().contains(" 001 "));
    }

    #[test]
    fn test_truncated_record() {
        let err = decode_one("MS 20200101T00:00:00Z 002 first\nonly one more\n").unwrap_err();
        match err {
            HistoryError::TruncatedRecord { expected, found } => {
                assert_eq!(expected, 2);
                assert_eq!(found, 1);
            }
            other => panic!("expected TruncatedRecord, got {other:?}"),
        }
    }

    #[rstest]
    #[case::one_char_kind("M 20200101T00:00:00Z 000 hello\n")]
    #[case::whitespace_in_kind("M  20200101T00:00:00Z 000 hello\n")]
    #[case::missing_separator("MS#20200101T00:00:00Z 000 hello\n")]
    #[case::non_digit_count("MS 20200101T00:00:00Z 0x0 hello\n")]
    #[case::short_header("MS 2020\n")]
    #[case::blank_line("\n")]
    fn test_malformed_headers(#[case] text: &str) {
        assert!(matches!(
            decode_one(text),
            Err(HistoryError::MalformedHeader(_))
        ));
    }

    #[test]
    fn test_read_records_reads_all() {
        let text = concat!(
            "MS 20200101T00:00:00Z 000 one\n",
            "MR 20200101T00:00:01Z 001 two\ntwo continued\n",
            "MS 20200101T00:00:02Z 000 three\n",
        );
        let records = read_records(&mut Cursor::new(text)).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].body_lines[1], "two continued\n");
    }

    #[test]
    fn test_read_records_fails_whole_file_on_bad_record() {
        let text = "MS 20200101T00:00:00Z 000 good\nbad header\n";
        assert!(read_records(&mut Cursor::new(text)).is_err());
    }

    #[test]
    fn test_content_equality_covers_body() {
        let a = decode_one("MS 20200101T00:00:00Z 000 hello\n")
            .unwrap()
            .unwrap();
        let b = decode_one("MS 20200101T00:00:00Z 000 hello\n")
            .unwrap()
            .unwrap();
        let c = decode_one("MS 20200101T00:00:00Z 000 world\n")
            .unwrap()
            .unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
