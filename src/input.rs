//! Streaming reader for range files.
//!
//! Format: one `start-end` range per line, a blank line, then one query id
//! per line. Lines starting with `#` are comments. The query section is
//! optional.
//!
//! ```text
//! 3-5
//! 10-14
//!
//! 1
//! 11
//! ```

use crate::error::{PipelineError, Result};
use crate::interval::{Coord, Interval};
use memchr::memchr;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::marker::PhantomData;
use std::path::Path;

/// One parsed line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Record<C: Coord = u64> {
    Range(Interval<C>),
    Query(C),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Ranges,
    Queries,
}

/// A streaming range file reader.
pub struct RangeReader<R: Read, C: Coord = u64> {
    reader: BufReader<R>,
    line_number: usize,
    buffer: String,
    section: Section,
    _coord: PhantomData<C>,
}

impl<C: Coord> RangeReader<File, C> {
    /// Open a range file from a path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(file))
    }
}

impl<R: Read, C: Coord> RangeReader<R, C> {
    /// Create a new reader from any readable source.
    pub fn new(reader: R) -> Self {
        Self::with_capacity(reader, 64 * 1024)
    }

    /// Create a reader with custom buffer capacity.
    pub fn with_capacity(reader: R, capacity: usize) -> Self {
        Self {
            reader: BufReader::with_capacity(capacity, reader),
            line_number: 0,
            buffer: String::with_capacity(128),
            section: Section::Ranges,
            _coord: PhantomData,
        }
    }

    /// Read the next record.
    pub fn read_record(&mut self) -> Result<Option<Record<C>>> {
        loop {
            self.buffer.clear();
            let bytes_read = self.reader.read_line(&mut self.buffer)?;
            if bytes_read == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            let line = self.buffer.trim();
            if line.starts_with('#') {
                continue;
            }
            if line.is_empty() {
                // The first blank line ends the range section.
                self.section = Section::Queries;
                continue;
            }

            return match self.section {
                Section::Ranges => self.parse_range(line).map(|iv| Some(Record::Range(iv))),
                Section::Queries => self.parse_value(line, "query id").map(|v| Some(Record::Query(v))),
            };
        }
    }

    /// Parse a `start-end` line.
    fn parse_range(&self, line: &str) -> Result<Interval<C>> {
        let bytes = line.as_bytes();
        // Skip a leading sign so negative starts parse.
        let sep = bytes
            .get(1..)
            .and_then(|rest| memchr(b'-', rest))
            .map(|i| i + 1)
            .ok_or_else(|| PipelineError::Parse {
                line: self.line_number,
                message: format!("Expected 'start-end', got '{}'", line),
            })?;

        let start = self.parse_value(line[..sep].trim(), "start")?;
        let end = self.parse_value(line[sep + 1..].trim(), "end")?;

        if start > end {
            return Err(PipelineError::Parse {
                line: self.line_number,
                message: format!("Start ({}) > end ({})", start, end),
            });
        }
        Ok(Interval::new(start, end))
    }

    fn parse_value(&self, s: &str, field_name: &str) -> Result<C> {
        s.parse().map_err(|_| PipelineError::Parse {
            line: self.line_number,
            message: format!("Invalid {}: '{}'", field_name, s),
        })
    }

    /// Get an iterator over all records.
    pub fn records(self) -> RecordIter<R, C> {
        RecordIter { reader: self }
    }

    /// Read everything into a [`RangeInput`].
    pub fn read_all(self) -> Result<RangeInput<C>> {
        let mut input = RangeInput::default();
        for record in self.records() {
            match record? {
                Record::Range(interval) => input.ranges.push(interval),
                Record::Query(id) => input.queries.push(id),
            }
        }
        Ok(input)
    }
}

/// Iterator over records.
pub struct RecordIter<R: Read, C: Coord = u64> {
    reader: RangeReader<R, C>,
}

impl<R: Read, C: Coord> Iterator for RecordIter<R, C> {
    type Item = Result<Record<C>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

/// Ranges and query ids from one input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeInput<C: Coord = u64> {
    pub ranges: Vec<Interval<C>>,
    pub queries: Vec<C>,
}

impl<C: Coord> Default for RangeInput<C> {
    fn default() -> Self {
        Self {
            ranges: Vec::new(),
            queries: Vec::new(),
        }
    }
}

/// Read a whole range file.
pub fn read_input<C: Coord, P: AsRef<Path>>(path: P) -> Result<RangeInput<C>> {
    RangeReader::from_path(path)?.read_all()
}

/// Parse input from a string (useful for testing).
pub fn parse_input<C: Coord>(content: &str) -> Result<RangeInput<C>> {
    RangeReader::new(content.as_bytes()).read_all()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ranges_and_queries() {
        let content = "3-5\n10-14\n16-20\n12-18\n\n1\n5\n8\n11\n17\n32\n";
        let input: RangeInput = parse_input(content).unwrap();

        assert_eq!(input.ranges.len(), 4);
        assert_eq!(input.ranges[0], Interval::new(3, 5));
        assert_eq!(input.ranges[3], Interval::new(12, 18));
        assert_eq!(input.queries, vec![1, 5, 8, 11, 17, 32]);
    }

    #[test]
    fn test_ranges_only() {
        let input: RangeInput = parse_input("1-5\n3-10\n").unwrap();
        assert_eq!(input.ranges.len(), 2);
        assert!(input.queries.is_empty());
    }

    #[test]
    fn test_skip_comments_and_trailing_blanks() {
        let content = "# ranges\n1-2\n\n# ids\n7\n\n9\n";
        let input: RangeInput = parse_input(content).unwrap();
        assert_eq!(input.ranges, vec![Interval::new(1, 2)]);
        assert_eq!(input.queries, vec![7, 9]);
    }

    #[test]
    fn test_large_values() {
        let content = "350684792662754-350684792662999\n\n350684792662800\n";
        let input: RangeInput = parse_input(content).unwrap();
        assert_eq!(input.ranges[0].start, 350_684_792_662_754);
        assert_eq!(input.queries[0], 350_684_792_662_800);
    }

    #[test]
    fn test_signed_ranges() {
        let input: RangeInput<i64> = parse_input("-5--2\n-3-4\n\n-1\n").unwrap();
        assert_eq!(input.ranges[0], Interval::new(-5, -2));
        assert_eq!(input.ranges[1], Interval::new(-3, 4));
        assert_eq!(input.queries, vec![-1]);
    }

    #[test]
    fn test_missing_separator() {
        let err = parse_input::<u64>("12\n").unwrap_err();
        assert!(matches!(err, PipelineError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_start_after_end() {
        let err = parse_input::<u64>("1-2\n9-3\n").unwrap_err();
        match err {
            PipelineError::Parse { line, message } => {
                assert_eq!(line, 2);
                assert!(message.contains("Start (9) > end (3)"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_invalid_query() {
        let err = parse_input::<u64>("1-2\n\nabc\n").unwrap_err();
        assert!(matches!(err, PipelineError::Parse { line: 3, .. }));
    }

    #[test]
    fn test_negative_rejected_for_unsigned() {
        assert!(parse_input::<u64>("-1-5\n").is_err());
    }
}
