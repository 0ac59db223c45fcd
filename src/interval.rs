//! Core interval types.
//!
//! Intervals are inclusive on both ends: `[start, end]` covers
//! `end - start + 1` integers.

use crate::error::{PipelineError, Result};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Fixed-width integer usable as an interval coordinate.
pub trait Coord:
    Copy
    + Ord
    + Default
    + fmt::Debug
    + fmt::Display
    + FromStr
    + itoa::Integer
    + Send
    + Sync
    + 'static
{
    /// Bit width of the coordinate.
    const BITS: u32;

    /// Number of integers in `[start, end]`. Callers guarantee `start <= end`.
    fn span(start: Self, end: Self) -> u128;
}

macro_rules! impl_coord_unsigned {
    ($($t:ty),*) => {
        $(
            impl Coord for $t {
                const BITS: u32 = <$t>::BITS;

                #[inline]
                fn span(start: Self, end: Self) -> u128 {
                    (end as u128) - (start as u128) + 1
                }
            }
        )*
    };
}

macro_rules! impl_coord_signed {
    ($($t:ty),*) => {
        $(
            impl Coord for $t {
                const BITS: u32 = <$t>::BITS;

                #[inline]
                fn span(start: Self, end: Self) -> u128 {
                    ((end as i128) - (start as i128)) as u128 + 1
                }
            }
        )*
    };
}

impl_coord_unsigned!(u8, u16, u32, u64);
impl_coord_signed!(i8, i16, i32, i64);

/// An inclusive integer interval ordered by `(start, end)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Interval<C: Coord = u64> {
    pub start: C,
    pub end: C,
}

impl<C: Coord> Interval<C> {
    /// Create an interval without checking `start <= end`.
    #[inline]
    pub fn new(start: C, end: C) -> Self {
        Self { start, end }
    }

    /// Create an interval, rejecting `start > end`.
    pub fn try_new(start: C, end: C) -> Result<Self> {
        let interval = Self { start, end };
        interval.validate()?;
        Ok(interval)
    }

    /// Check the `start <= end` invariant.
    pub fn validate(&self) -> Result<()> {
        if self.start > self.end {
            return Err(PipelineError::InvalidInterval {
                start: self.start.to_string(),
                end: self.end.to_string(),
            });
        }
        Ok(())
    }

    /// Number of integers covered.
    #[inline]
    pub fn span(&self) -> u128 {
        C::span(self.start, self.end)
    }

    /// Check if `value` lies inside the interval.
    #[inline]
    pub fn contains(&self, value: C) -> bool {
        self.start <= value && value <= self.end
    }

    /// True when `next` (which must not start before `self`) overlaps or
    /// touches this interval, i.e. `next.start <= self.end`.
    ///
    /// Consecutive single points such as `[1,1]` and `[2,2]` do not touch.
    #[inline]
    pub fn absorbs(&self, next: &Interval<C>) -> bool {
        next.start <= self.end
    }

    /// Position of `value` relative to this interval.
    #[inline]
    pub fn locate(&self, value: C) -> Ordering {
        if value < self.start {
            Ordering::Less
        } else if value > self.end {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    }
}

impl<C: Coord> fmt::Display for Interval<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

impl<C: Coord> From<(C, C)> for Interval<C> {
    fn from((start, end): (C, C)) -> Self {
        Self::new(start, end)
    }
}

/// Sorted, strictly non-overlapping, non-touching intervals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntervalSet<C: Coord = u64> {
    intervals: Vec<Interval<C>>,
}

impl<C: Coord> IntervalSet<C> {
    /// Create an empty set.
    pub fn new() -> Self {
        Self {
            intervals: Vec::new(),
        }
    }

    /// Build a set from intervals that already satisfy the invariant.
    ///
    /// Fails with `NotCoalesced` at the first entry that does not start
    /// strictly after the previous entry's end.
    pub fn from_coalesced(intervals: Vec<Interval<C>>) -> Result<Self> {
        for (index, interval) in intervals.iter().enumerate() {
            interval.validate()?;
            if index > 0 && intervals[index - 1].end >= interval.start {
                return Err(PipelineError::NotCoalesced { index });
            }
        }
        Ok(Self { intervals })
    }

    /// Check membership with a binary search.
    pub fn contains(&self, value: C) -> bool {
        self.intervals
            .binary_search_by(|interval| interval.locate(value).reverse())
            .is_ok()
    }

    /// Total number of integers covered.
    pub fn total_coverage(&self) -> u128 {
        self.intervals.iter().map(Interval::span).sum()
    }

    pub fn as_slice(&self) -> &[Interval<C>] {
        &self.intervals
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Interval<C>> {
        self.intervals.iter()
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn into_vec(self) -> Vec<Interval<C>> {
        self.intervals
    }
}

impl<'a, C: Coord> IntoIterator for &'a IntervalSet<C> {
    type Item = &'a Interval<C>;
    type IntoIter = std::slice::Iter<'a, Interval<C>>;

    fn into_iter(self) -> Self::IntoIter {
        self.intervals.iter()
    }
}
