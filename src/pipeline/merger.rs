//! Streaming coalescer with O(1) memory.
//!
//! Merges overlapping or touching intervals from a stream sorted by start.
//!
//! # Algorithm
//!
//! 1. The first interval becomes the accumulator
//! 2. If the next interval starts at or before the accumulator end, extend it
//! 3. If not, emit the accumulator and start a new one
//! 4. After the interval flagged `last`, one flush emits the accumulator as
//!    the terminal output
//!
//! The merge test is `next.start <= acc.end`, so `[1,5]` and `[5,10]`
//! merge while `[1,1]` and `[2,2]` stay separate.

use crate::error::{PipelineError, Result};
use crate::interval::{Coord, Interval};
use log::trace;

/// Merger control state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergerState {
    /// No input accepted yet.
    Idle,
    /// Accumulating.
    Process,
    /// The last input arrived; the terminal output is pending.
    Flushing,
    /// Terminal output emitted.
    Done,
}

impl MergerState {
    pub fn name(&self) -> &'static str {
        match self {
            MergerState::Idle => "merger IDLE",
            MergerState::Process => "merger PROCESS",
            MergerState::Flushing => "merger FLUSHING",
            MergerState::Done => "merger DONE",
        }
    }
}

/// A coalesced interval leaving the merger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutput<C: Coord = u64> {
    pub interval: Interval<C>,
    /// Set only on the terminal output.
    pub last: bool,
}

/// Statistics from one merge run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeStats {
    /// Number of intervals read
    pub intervals_read: usize,
    /// Number of merged intervals written
    pub intervals_written: usize,
}

impl MergeStats {
    /// Compression ratio (how many input intervals per output interval)
    pub fn compression_ratio(&self) -> f64 {
        if self.intervals_written == 0 {
            0.0
        } else {
            self.intervals_read as f64 / self.intervals_written as f64
        }
    }
}

impl std::fmt::Display for MergeStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Read: {}, Written: {}, Compression: {:.2}x",
            self.intervals_read,
            self.intervals_written,
            self.compression_ratio()
        )
    }
}

/// Single-accumulator interval coalescer.
#[derive(Debug, Clone)]
pub struct StreamMerger<C: Coord = u64> {
    state: MergerState,
    accum: Option<Interval<C>>,
    prev_start: Option<C>,
    compute_coverage: bool,
    coverage: u128,
    stats: MergeStats,
}

impl<C: Coord> Default for StreamMerger<C> {
    fn default() -> Self {
        Self::new(true)
    }
}

impl<C: Coord> StreamMerger<C> {
    pub fn new(compute_coverage: bool) -> Self {
        Self {
            state: MergerState::Idle,
            accum: None,
            prev_start: None,
            compute_coverage,
            coverage: 0,
            stats: MergeStats::default(),
        }
    }

    /// Accept the next sorted interval.
    ///
    /// Returns the interval completed by this input, if any. When `last` is
    /// set, [`flush`](Self::flush) must be called next to get the terminal
    /// output.
    pub fn push(&mut self, interval: Interval<C>, last: bool) -> Result<Option<MergeOutput<C>>> {
        if matches!(self.state, MergerState::Flushing | MergerState::Done) {
            return Err(self.violation("push"));
        }
        interval.validate()?;
        if self.prev_start.is_some_and(|prev| interval.start < prev) {
            return Err(PipelineError::OutOfOrder {
                index: self.stats.intervals_read,
            });
        }
        self.prev_start = Some(interval.start);
        self.stats.intervals_read += 1;

        let emitted = match self.accum.as_mut() {
            Some(acc) if acc.absorbs(&interval) => {
                acc.end = acc.end.max(interval.end);
                None
            }
            Some(acc) => {
                let done = *acc;
                *acc = interval;
                Some(self.emit(done, false))
            }
            None => {
                self.accum = Some(interval);
                None
            }
        };

        self.state = if last {
            MergerState::Flushing
        } else {
            MergerState::Process
        };
        Ok(emitted)
    }

    /// Emit the terminal output after the last input.
    pub fn flush(&mut self) -> Result<MergeOutput<C>> {
        if self.state != MergerState::Flushing {
            return Err(self.violation("flush"));
        }
        let acc = self.accum.take().ok_or_else(|| self.violation("flush"))?;
        self.state = MergerState::Done;
        Ok(self.emit(acc, true))
    }

    fn emit(&mut self, interval: Interval<C>, last: bool) -> MergeOutput<C> {
        if self.compute_coverage {
            self.coverage += interval.span();
        }
        self.stats.intervals_written += 1;
        trace!("merger emit {} (last: {})", interval, last);
        MergeOutput { interval, last }
    }

    pub fn state(&self) -> MergerState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == MergerState::Done
    }

    /// The in-progress interval, if any.
    pub fn accumulator(&self) -> Option<Interval<C>> {
        self.accum
    }

    /// Sum of `end - start + 1` over emitted intervals; zero when coverage
    /// accounting is disabled.
    pub fn total_coverage(&self) -> u128 {
        self.coverage
    }

    pub fn computes_coverage(&self) -> bool {
        self.compute_coverage
    }

    pub fn stats(&self) -> MergeStats {
        self.stats
    }

    /// Clear the accumulator and counters for a new run.
    pub fn reset(&mut self) {
        self.state = MergerState::Idle;
        self.accum = None;
        self.prev_start = None;
        self.coverage = 0;
        self.stats = MergeStats::default();
    }

    fn violation(&self, operation: &'static str) -> PipelineError {
        PipelineError::ProtocolViolation {
            operation,
            state: self.state.name(),
        }
    }
}

/// Coalesce an already sorted slice.
pub fn coalesce<C: Coord>(sorted: &[Interval<C>]) -> Result<Vec<Interval<C>>> {
    let mut merger = StreamMerger::new(false);
    let mut out = Vec::new();
    for (i, &interval) in sorted.iter().enumerate() {
        if let Some(output) = merger.push(interval, i + 1 == sorted.len())? {
            out.push(output.interval);
        }
    }
    if !sorted.is_empty() {
        out.push(merger.flush()?.interval);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ivs(pairs: &[(u64, u64)]) -> Vec<Interval> {
        pairs.iter().copied().map(Interval::from).collect()
    }

    #[test]
    fn test_small_examples() {
        let cases: Vec<(Vec<(u64, u64)>, Vec<(u64, u64)>)> = vec![
            (vec![(1, 5), (3, 10)], vec![(1, 10)]),
            (
                vec![(1, 5), (3, 10), (15, 20), (18, 25)],
                vec![(1, 10), (15, 25)],
            ),
            (
                vec![(1, 5), (10, 15), (20, 25)],
                vec![(1, 5), (10, 15), (20, 25)],
            ),
            (vec![(1, 5), (5, 10)], vec![(1, 10)]),
            (vec![(100, 200)], vec![(100, 200)]),
            (vec![(1, 20), (2, 3), (4, 5)], vec![(1, 20)]),
        ];

        for (input, expected) in cases {
            assert_eq!(coalesce(&ivs(&input)).unwrap(), ivs(&expected));
        }
    }

    #[test]
    fn test_consecutive_points_stay_apart() {
        let merged = coalesce(&ivs(&[(1, 1), (2, 2), (3, 3)])).unwrap();
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn test_empty_stream() {
        assert!(coalesce::<u64>(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_push_protocol() {
        let mut merger = StreamMerger::new(true);
        assert_eq!(merger.push(Interval::new(1u64, 5), false).unwrap(), None);
        assert_eq!(merger.push(Interval::new(3, 10), false).unwrap(), None);
        let out = merger.push(Interval::new(15, 20), true).unwrap();
        assert_eq!(
            out,
            Some(MergeOutput {
                interval: Interval::new(1, 10),
                last: false
            })
        );
        assert_eq!(merger.state(), MergerState::Flushing);
        assert!(matches!(
            merger.push(Interval::new(30, 31), false),
            Err(PipelineError::ProtocolViolation {
                operation: "push",
                state: "merger FLUSHING"
            })
        ));

        let terminal = merger.flush().unwrap();
        assert_eq!(terminal.interval, Interval::new(15, 20));
        assert!(terminal.last);
        assert!(merger.is_done());
        assert_eq!(merger.total_coverage(), 10 + 6);
        assert_eq!(merger.stats().intervals_read, 3);
        assert_eq!(merger.stats().intervals_written, 2);
    }

    #[test]
    fn test_last_on_first_input() {
        let mut merger = StreamMerger::new(true);
        assert_eq!(merger.push(Interval::new(7u64, 9), true).unwrap(), None);
        let terminal = merger.flush().unwrap();
        assert_eq!(terminal.interval, Interval::new(7, 9));
        assert!(terminal.last);
    }

    #[test]
    fn test_push_after_done_is_violation() {
        let mut merger = StreamMerger::new(false);
        merger.push(Interval::new(1u64, 2), true).unwrap();
        merger.flush().unwrap();
        assert!(matches!(
            merger.push(Interval::new(3, 4), false),
            Err(PipelineError::ProtocolViolation {
                operation: "push",
                ..
            })
        ));
        assert!(matches!(
            merger.flush(),
            Err(PipelineError::ProtocolViolation { .. })
        ));
    }

    #[test]
    fn test_flush_without_last_is_violation() {
        let mut merger = StreamMerger::new(false);
        merger.push(Interval::new(1u64, 2), false).unwrap();
        assert!(merger.flush().is_err());
    }

    #[test]
    fn test_out_of_order_rejected() {
        let mut merger = StreamMerger::new(false);
        merger.push(Interval::new(10u64, 20), false).unwrap();
        assert!(matches!(
            merger.push(Interval::new(5, 30), false),
            Err(PipelineError::OutOfOrder { index: 1 })
        ));
    }

    #[test]
    fn test_coverage_is_wide() {
        let mut merger = StreamMerger::new(true);
        merger.push(Interval::new(0u64, u64::MAX - 10), false).unwrap();
        merger.push(Interval::new(u64::MAX - 5, u64::MAX), true).unwrap();
        merger.flush().unwrap();
        assert_eq!(merger.total_coverage(), (1u128 << 64) - 4);
    }

    #[test]
    fn test_coverage_disabled() {
        let mut merger = StreamMerger::new(false);
        merger.push(Interval::new(1u64, 10), true).unwrap();
        merger.flush().unwrap();
        assert_eq!(merger.total_coverage(), 0);
    }

    #[test]
    fn test_reset() {
        let mut merger = StreamMerger::new(true);
        merger.push(Interval::new(1u64, 10), true).unwrap();
        merger.flush().unwrap();
        merger.reset();
        assert_eq!(merger.state(), MergerState::Idle);
        assert_eq!(merger.accumulator(), None);
        assert_eq!(merger.total_coverage(), 0);
        assert!(merger.push(Interval::new(0, 1), false).is_ok());
    }
}
