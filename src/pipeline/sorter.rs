//! Bottom-up merge sort over two fixed-capacity banks.
//!
//! # Algorithm
//!
//! Intervals are loaded into bank A. Each pass merges runs of
//! `pass_width` elements pairwise into the other bank, then the banks
//! swap roles and `pass_width` doubles. Sorting ends once
//! `pass_width >= n`; the bank written last holds the result.
//!
//! A pass over `n` elements that is not a multiple of `2 * pass_width`
//! ends with a remainder block: a left run with no right partner. It is
//! still copied into the destination bank, otherwise that bank keeps
//! stale data from two passes earlier.
//!
//! # Memory Complexity
//!
//! Two banks of `max_ranges` intervals, allocated once. No other storage
//! grows with the input.
//!
//! # Stepping
//!
//! [`BoundedMergeSort::step`] performs one unit of work: a block setup, a
//! single element write, a block advance or a pass end.

use crate::error::{PipelineError, Resource, Result};
use crate::interval::{Coord, Interval};
use log::{debug, trace};

/// One of the two ping-pong banks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bank {
    A,
    B,
}

impl Bank {
    #[inline]
    pub fn other(self) -> Bank {
        match self {
            Bank::A => Bank::B,
            Bank::B => Bank::A,
        }
    }
}

/// Sorter control state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortPhase {
    /// Accepting intervals into bank A.
    Loading,
    PassStart,
    BlockSetup,
    /// Writing one element per step from the source bank to the other.
    Merging,
    BlockNext,
    PassEnd,
    /// Result available through [`BoundedMergeSort::sorted`].
    Sorted,
}

impl SortPhase {
    pub fn name(&self) -> &'static str {
        match self {
            SortPhase::Loading => "sorter LOADING",
            SortPhase::PassStart => "sorter PASS_START",
            SortPhase::BlockSetup => "sorter BLOCK_SETUP",
            SortPhase::Merging => "sorter MERGING",
            SortPhase::BlockNext => "sorter BLOCK_NEXT",
            SortPhase::PassEnd => "sorter PASS_END",
            SortPhase::Sorted => "sorter SORTED",
        }
    }
}

/// Read/write positions for the block being merged.
#[derive(Debug, Clone, Copy, Default)]
struct MergeCursor {
    block_start: usize,
    left: usize,
    left_limit: usize,
    right: usize,
    right_limit: usize,
    out: usize,
}

/// Counters for one sort run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SortStats {
    /// Number of intervals sorted
    pub intervals: usize,
    /// Completed merge passes
    pub passes: usize,
    /// Interval comparisons performed
    pub comparisons: u64,
    /// Steps taken from `begin` until sorted
    pub steps: u64,
}

impl std::fmt::Display for SortStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Sorted: {}, Passes: {}, Comparisons: {}, Steps: {}",
            self.intervals, self.passes, self.comparisons, self.steps
        )
    }
}

/// Merge sort bounded to `max_ranges` intervals.
#[derive(Debug, Clone)]
pub struct BoundedMergeSort<C: Coord = u64> {
    bank_a: Vec<Interval<C>>,
    bank_b: Vec<Interval<C>>,
    max_ranges: usize,
    len: usize,
    source: Bank,
    pass_width: usize,
    phase: SortPhase,
    cursor: MergeCursor,
    stats: SortStats,
}

impl<C: Coord> BoundedMergeSort<C> {
    /// Allocate both banks for up to `max_ranges` intervals.
    pub fn new(max_ranges: usize) -> Self {
        Self {
            bank_a: Vec::with_capacity(max_ranges),
            bank_b: Vec::with_capacity(max_ranges),
            max_ranges,
            len: 0,
            source: Bank::A,
            pass_width: 1,
            phase: SortPhase::Loading,
            cursor: MergeCursor::default(),
            stats: SortStats::default(),
        }
    }

    /// Load one interval into bank A.
    pub fn load(&mut self, interval: Interval<C>) -> Result<()> {
        if self.phase != SortPhase::Loading {
            return Err(self.violation("load"));
        }
        if self.bank_a.len() >= self.max_ranges {
            return Err(PipelineError::CapacityExceeded {
                resource: Resource::Ranges,
                requested: self.bank_a.len() + 1,
                max: self.max_ranges,
            });
        }
        interval.validate()?;
        self.bank_a.push(interval);
        Ok(())
    }

    /// Start sorting the `count` loaded intervals.
    pub fn begin(&mut self, count: usize) -> Result<()> {
        if self.phase != SortPhase::Loading {
            return Err(self.violation("begin"));
        }
        if count > self.max_ranges {
            return Err(PipelineError::CapacityExceeded {
                resource: Resource::Ranges,
                requested: count,
                max: self.max_ranges,
            });
        }
        if count != self.bank_a.len() {
            return Err(PipelineError::CountMismatch {
                declared: count,
                received: self.bank_a.len(),
            });
        }

        self.len = count;
        self.source = Bank::A;
        self.pass_width = 1;
        self.stats = SortStats {
            intervals: count,
            ..SortStats::default()
        };

        if count <= 1 {
            self.phase = SortPhase::Sorted;
        } else {
            // Size bank B to match; every slot is overwritten by the first pass.
            self.bank_b.clear();
            self.bank_b.extend_from_slice(&self.bank_a);
            self.phase = SortPhase::PassStart;
        }
        debug!("sort started: {} intervals", count);
        Ok(())
    }

    /// Advance by one unit of work. Returns true once sorted.
    pub fn step(&mut self) -> bool {
        if matches!(self.phase, SortPhase::Loading | SortPhase::Sorted) {
            return self.phase == SortPhase::Sorted;
        }
        self.stats.steps += 1;

        let n = self.len;
        let width = self.pass_width;

        match self.phase {
            SortPhase::PassStart => {
                self.cursor.block_start = 0;
                self.phase = SortPhase::BlockSetup;
            }
            SortPhase::BlockSetup => {
                let block_start = self.cursor.block_start;
                let left_limit = (block_start + width).min(n);
                let right_limit = (block_start + 2 * width).min(n);
                if left_limit == right_limit {
                    trace!(
                        "remainder block at {} (width {}, n {})",
                        block_start,
                        width,
                        n
                    );
                }
                self.cursor = MergeCursor {
                    block_start,
                    left: block_start,
                    left_limit,
                    right: left_limit,
                    right_limit,
                    out: block_start,
                };
                self.phase = SortPhase::Merging;
            }
            SortPhase::Merging => self.merge_one(),
            SortPhase::BlockNext => {
                self.cursor.block_start += 2 * width;
                self.phase = if self.cursor.block_start >= n {
                    SortPhase::PassEnd
                } else {
                    SortPhase::BlockSetup
                };
            }
            SortPhase::PassEnd => {
                self.source = self.source.other();
                self.stats.passes += 1;
                self.pass_width = width * 2;
                trace!("pass {} done, width now {}", self.stats.passes, self.pass_width);
                if self.pass_width >= n {
                    self.phase = SortPhase::Sorted;
                    debug!("sort finished: {}", self.stats);
                } else {
                    self.phase = SortPhase::PassStart;
                }
            }
            SortPhase::Loading | SortPhase::Sorted => {}
        }

        self.phase == SortPhase::Sorted
    }

    /// Write one element of the current block into the destination bank.
    fn merge_one(&mut self) {
        let (src, dst) = match self.source {
            Bank::A => (&self.bank_a, &mut self.bank_b),
            Bank::B => (&self.bank_b, &mut self.bank_a),
        };
        let c = &mut self.cursor;

        let left_open = c.left < c.left_limit;
        let right_open = c.right < c.right_limit;

        match (left_open, right_open) {
            (true, true) => {
                self.stats.comparisons += 1;
                let left = src[c.left];
                let right = src[c.right];
                // Equal keys keep left first
                if left <= right {
                    dst[c.out] = left;
                    c.left += 1;
                } else {
                    dst[c.out] = right;
                    c.right += 1;
                }
                c.out += 1;
            }
            (true, false) => {
                dst[c.out] = src[c.left];
                c.left += 1;
                c.out += 1;
            }
            (false, true) => {
                dst[c.out] = src[c.right];
                c.right += 1;
                c.out += 1;
            }
            (false, false) => self.phase = SortPhase::BlockNext,
        }
    }

    /// Step until sorted, returning the number of steps taken.
    pub fn run(&mut self) -> u64 {
        let before = self.stats.steps;
        while self.phase != SortPhase::Loading && !self.step() {}
        self.stats.steps - before
    }

    /// The sorted intervals, once sorting has finished.
    pub fn sorted(&self) -> Option<&[Interval<C>]> {
        if self.phase != SortPhase::Sorted {
            return None;
        }
        let bank = match self.source {
            Bank::A => &self.bank_a,
            Bank::B => &self.bank_b,
        };
        Some(&bank[..self.len])
    }

    /// Read the sorted interval at `index`.
    #[inline]
    pub fn get_sorted(&self, index: usize) -> Option<Interval<C>> {
        self.sorted().and_then(|s| s.get(index).copied())
    }

    pub fn is_sorted(&self) -> bool {
        self.phase == SortPhase::Sorted
    }

    pub fn phase(&self) -> SortPhase {
        self.phase
    }

    /// Bank holding the most recently written data.
    pub fn source(&self) -> Bank {
        self.source
    }

    pub fn pass_width(&self) -> usize {
        self.pass_width
    }

    /// Intervals loaded so far.
    pub fn loaded(&self) -> usize {
        self.bank_a.len()
    }

    pub fn capacity(&self) -> usize {
        self.max_ranges
    }

    pub fn stats(&self) -> SortStats {
        self.stats
    }

    /// Discard all data and return to loading.
    pub fn reset(&mut self) {
        self.bank_a.clear();
        self.bank_b.clear();
        self.len = 0;
        self.source = Bank::A;
        self.pass_width = 1;
        self.phase = SortPhase::Loading;
        self.cursor = MergeCursor::default();
        self.stats = SortStats::default();
    }

    fn violation(&self, operation: &'static str) -> PipelineError {
        PipelineError::ProtocolViolation {
            operation,
            state: self.phase.name(),
        }
    }
}

/// Sort `intervals` with a fresh sorter sized to `max_ranges`.
pub fn bounded_sort<C: Coord>(
    intervals: &[Interval<C>],
    max_ranges: usize,
) -> Result<Vec<Interval<C>>> {
    if intervals.len() > max_ranges {
        return Err(PipelineError::CapacityExceeded {
            resource: Resource::Ranges,
            requested: intervals.len(),
            max: max_ranges,
        });
    }
    let mut sorter = BoundedMergeSort::new(intervals.len());
    for &interval in intervals {
        sorter.load(interval)?;
    }
    sorter.begin(intervals.len())?;
    sorter.run();
    Ok(sorter.sorted().unwrap_or_default().to_vec())
}
