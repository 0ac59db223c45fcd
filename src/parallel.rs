//! Parallel batch membership using Rayon.
//!
//! This answers a whole batch against a finished [`IntervalSet`] at once
//! and sits outside the one-query-in-flight protocol of
//! [`RangeChecker`](crate::pipeline::RangeChecker). Results are identical.

use crate::interval::{Coord, IntervalSet};
use rayon::prelude::*;

/// Minimum number of queries before enabling parallelization.
/// Below this threshold, sequential processing is faster due to
/// thread spawn overhead.
pub const PARALLEL_THRESHOLD: usize = 10_000;

/// Membership of every query, in input order.
pub fn check_batch<C: Coord>(set: &IntervalSet<C>, queries: &[C]) -> Vec<bool> {
    if queries.len() < PARALLEL_THRESHOLD {
        return queries.iter().map(|&q| set.contains(q)).collect();
    }
    queries.par_iter().map(|&q| set.contains(q)).collect()
}

/// Number of queries covered by `set`.
pub fn count_covered<C: Coord>(set: &IntervalSet<C>, queries: &[C]) -> u32 {
    let count = if queries.len() < PARALLEL_THRESHOLD {
        queries.iter().filter(|&&q| set.contains(q)).count()
    } else {
        queries.par_iter().filter(|&&q| set.contains(q)).count()
    };
    count as u32
}

/// Statistics for a parallel batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchStats {
    pub queries: usize,
    pub covered: u32,
    pub parallel: bool,
}

impl BatchStats {
    pub fn new(queries: usize, covered: u32) -> Self {
        Self {
            queries,
            covered,
            parallel: queries >= PARALLEL_THRESHOLD,
        }
    }
}
