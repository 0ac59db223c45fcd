//! Buffered output for intervals and counts.
//!
//! Uses itoa for integer formatting to avoid allocation in the hot path.

use crate::error::Result;
use crate::interval::{Coord, Interval};
use std::io::{BufWriter, Write};

/// Buffer size for RangeWriter (1MB default).
const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;

/// Range output writer producing `start-end` lines.
pub struct RangeWriter<W: Write> {
    writer: BufWriter<W>,
    itoa_buf: itoa::Buffer,
}

impl<W: Write> RangeWriter<W> {
    /// Create a new RangeWriter with the default buffer.
    pub fn new(output: W) -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE, output)
    }

    /// Create a new RangeWriter with specified buffer size.
    pub fn with_capacity(capacity: usize, output: W) -> Self {
        Self {
            writer: BufWriter::with_capacity(capacity, output),
            itoa_buf: itoa::Buffer::new(),
        }
    }

    /// Write `start-end` without a newline.
    #[inline]
    pub fn write_interval<C: Coord>(&mut self, interval: &Interval<C>) -> Result<()> {
        self.writer
            .write_all(self.itoa_buf.format(interval.start).as_bytes())?;
        self.writer.write_all(b"-")?;
        self.writer
            .write_all(self.itoa_buf.format(interval.end).as_bytes())?;
        Ok(())
    }

    /// Write `start-end` followed by newline.
    #[inline]
    pub fn write_interval_line<C: Coord>(&mut self, interval: &Interval<C>) -> Result<()> {
        self.write_interval(interval)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    /// Write every interval, one per line.
    pub fn write_intervals<'a, C: Coord, I>(&mut self, intervals: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a Interval<C>>,
    {
        for interval in intervals {
            self.write_interval_line(interval)?;
        }
        Ok(())
    }

    /// Write a query id with its verdict: `id\tcovered` or `id\tmissing`.
    #[inline]
    pub fn write_verdict<C: Coord>(&mut self, id: C, covered: bool) -> Result<()> {
        self.writer.write_all(self.itoa_buf.format(id).as_bytes())?;
        self.writer
            .write_all(if covered { b"\tcovered\n" } else { b"\tmissing\n" })?;
        Ok(())
    }

    /// Write an integer on its own line.
    #[inline]
    pub fn write_count<I: itoa::Integer>(&mut self, n: I) -> Result<()> {
        self.writer.write_all(self.itoa_buf.format(n).as_bytes())?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    /// Write a full line as-is with newline.
    #[inline]
    pub fn write_line(&mut self, line: &[u8]) -> Result<()> {
        self.writer.write_all(line)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    /// Flush the output buffer.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
