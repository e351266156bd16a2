//! Port log record format
//!
//! Every port log is a UTF-8 text file with one record per line:
//!
//! ```text
//! HH:MM:SS[:mmm] <value>
//! ```
//!
//! In multi-value mode the value is a whitespace-separated sequence of
//! tokens. Numeric tokens are read as `f64`; everything else stays text.

use crate::types::{PortValue, Result, SimTime};
use regex::Regex;
use std::io::BufRead;

/// Grammar of a single record line
const RECORD_PATTERN: &str = r"^(\d{2}):(\d{2}):(\d{2})(?::(\d{3}))?\s+(\S.*?)\s*$";

/// A single timestamped record from a port log
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Simulation time in milliseconds
    pub time: SimTime,
    /// Value recorded at that time
    pub value: PortValue,
}

/// Compiled record grammar
#[derive(Debug, Clone)]
pub struct RecordParser {
    pattern: Regex,
    multi_value: bool,
}

impl RecordParser {
    /// Create a parser for single-value or multi-value records
    pub fn new(multi_value: bool) -> Result<Self> {
        let pattern = Regex::new(RECORD_PATTERN).map_err(|e| {
            crate::types::HarnessError::Config(format!("Invalid record grammar: {}", e))
        })?;
        Ok(Self {
            pattern,
            multi_value,
        })
    }

    /// Parse one line; returns None if the line does not match the grammar
    ///
    /// Single-value mode keeps the first value token and ignores the rest.
    pub fn parse(&self, line: &str) -> Option<Record> {
        let caps = self.pattern.captures(line)?;

        let field = |idx: usize| -> Option<u64> {
            caps.get(idx).and_then(|m| m.as_str().parse::<u64>().ok())
        };

        let hours = field(1)?;
        let minutes = field(2)?;
        let seconds = field(3)?;
        let millis = field(4).unwrap_or(0);
        let time = hours * 3_600_000 + minutes * 60_000 + seconds * 1_000 + millis;

        let mut tokens = caps.get(5)?.as_str().split_whitespace();
        let value = if self.multi_value {
            PortValue::List(tokens.map(PortValue::from_token).collect())
        } else {
            PortValue::from_token(tokens.next()?)
        };

        Some(Record { time, value })
    }
}

/// Iterator over the records of a port log
///
/// The first line that does not match the record grammar ends the iteration,
/// as if the log were exhausted. Blank lines and lines that are not valid
/// UTF-8 count as malformed.
pub struct RecordReader<R> {
    reader: R,
    parser: RecordParser,
    buf: Vec<u8>,
    line_no: usize,
    source: String,
    done: bool,
}

impl<R: BufRead> RecordReader<R> {
    /// Wrap a buffered reader; `source` only labels log messages
    pub fn new(reader: R, parser: RecordParser, source: impl Into<String>) -> Self {
        Self {
            reader,
            parser,
            buf: Vec::new(),
            line_no: 0,
            source: source.into(),
            done: false,
        }
    }

    fn stop(&mut self, line: &str) {
        log::warn!(
            "Malformed record in {} at line {}: {:?}, treating as end of log",
            self.source,
            self.line_no,
            line
        );
        self.done = true;
    }
}

impl<R: BufRead> Iterator for RecordReader<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => {
                self.done = true;
                None
            }
            Ok(_) => {
                self.line_no += 1;
                let text = match std::str::from_utf8(&self.buf) {
                    Ok(text) => text.trim().to_string(),
                    Err(_) => {
                        let lossy = String::from_utf8_lossy(&self.buf).trim().to_string();
                        self.stop(&lossy);
                        return None;
                    }
                };

                match self.parser.parse(&text) {
                    Some(record) => {
                        log::trace!(
                            "{}:{} -> {} ms = {}",
                            self.source,
                            self.line_no,
                            record.time,
                            record.value
                        );
                        Some(Ok(record))
                    }
                    None => {
                        self.stop(&text);
                        None
                    }
                }
            }
            Err(e) => {
                self.done = true;
                Some(Err(e.into()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_single_value_numeric() {
        let parser = RecordParser::new(false).unwrap();
        let record = parser.parse("00:01:00 0.94").unwrap();
        assert_eq!(record.time, 60_000);
        assert_eq!(record.value, PortValue::Number(0.94));
    }

    #[test]
    fn test_multi_value_mixed_tokens() {
        let parser = RecordParser::new(true).unwrap();
        let record = parser.parse("00:00:01:500 1 2.5 on").unwrap();
        assert_eq!(record.time, 1500);
        assert_eq!(
            record.value,
            PortValue::List(vec![
                PortValue::Number(1.0),
                PortValue::Number(2.5),
                PortValue::Text("on".to_string()),
            ])
        );
    }

    #[test]
    fn test_timestamp_components() {
        let parser = RecordParser::new(false).unwrap();
        let record = parser.parse("01:02:03:004 1").unwrap();
        assert_eq!(record.time, 3_600_000 + 2 * 60_000 + 3_000 + 4);
    }

    #[test]
    fn test_symbolic_value() {
        let parser = RecordParser::new(false).unwrap();
        let record = parser.parse("00:00:05 idle").unwrap();
        assert_eq!(record.value, PortValue::Text("idle".to_string()));
    }

    #[test]
    fn test_malformed_lines() {
        let parser = RecordParser::new(false).unwrap();
        assert!(parser.parse("garbage").is_none());
        assert!(parser.parse("0:00:01 1").is_none());
        assert!(parser.parse("00:00:01").is_none());
        assert!(parser.parse("00:00:01:5 1").is_none());
    }

    fn read_times(data: &[u8]) -> Vec<SimTime> {
        let reader = RecordReader::new(
            Cursor::new(data.to_vec()),
            RecordParser::new(false).unwrap(),
            "test",
        );
        reader.map(|r| r.unwrap().time).collect()
    }

    #[test]
    fn test_reader_stops_at_malformed_line() {
        let data = b"00:00:00 0\n00:00:01 1\nnot a record\n00:00:02 0\n";
        assert_eq!(read_times(data), vec![0, 1000]);
    }

    #[test]
    fn test_reader_stops_at_blank_line() {
        let data = b"00:00:01 1\n\n00:00:02 2\n";
        assert_eq!(read_times(data), vec![1000]);

        let data = b"00:00:01 1\n   \n00:00:02 2\n";
        assert_eq!(read_times(data), vec![1000]);
    }

    #[test]
    fn test_reader_stops_at_invalid_utf8() {
        let data = b"00:00:01 1\n\xff\xfe garbage\n00:00:02 2\n";
        assert_eq!(read_times(data), vec![1000]);
    }

    #[test]
    fn test_reader_without_trailing_newline() {
        assert_eq!(read_times(b"00:00:01 1\n00:00:02 2"), vec![1000, 2000]);
    }
}
