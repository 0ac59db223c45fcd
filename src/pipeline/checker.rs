//! Binary-search membership checks over a coalesced lookup table.
//!
//! The table is loaded once from coalesced output and is read-only while
//! queries run. Queries are answered strictly one at a time: a new id is
//! accepted only after the previous search has concluded.

use crate::error::{PipelineError, Resource, Result};
use crate::interval::{Coord, Interval};
use log::{debug, trace};

/// Checker control state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckerPhase {
    /// Filling the lookup table.
    Loading,
    /// Waiting for the next query id.
    AwaitQuery,
    /// A binary search is in flight.
    Searching,
    /// Every declared query has concluded.
    Done,
}

impl CheckerPhase {
    pub fn name(&self) -> &'static str {
        match self {
            CheckerPhase::Loading => "checker LOADING",
            CheckerPhase::AwaitQuery => "checker AWAIT_QUERY",
            CheckerPhase::Searching => "checker SEARCHING",
            CheckerPhase::Done => "checker DONE",
        }
    }
}

/// Result of one search step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    /// No search in flight.
    Idle,
    /// The window narrowed; more probes needed.
    Pending,
    /// The in-flight query concluded.
    Resolved(bool),
}

/// Search window `[lo, hi)` for the in-flight query.
#[derive(Debug, Clone, Copy)]
struct Search<C: Coord> {
    query: C,
    lo: usize,
    hi: usize,
}

/// Lookup table plus one-query-in-flight binary search.
#[derive(Debug, Clone)]
pub struct RangeChecker<C: Coord = u64> {
    table: Vec<Interval<C>>,
    max_ranges: usize,
    max_checks: usize,
    phase: CheckerPhase,
    num_checks: usize,
    checks_done: usize,
    match_count: u32,
    search: Option<Search<C>>,
    last_result: Option<bool>,
    probes: u64,
}

impl<C: Coord> RangeChecker<C> {
    pub fn new(max_ranges: usize, max_checks: usize) -> Self {
        Self {
            table: Vec::with_capacity(max_ranges),
            max_ranges,
            max_checks,
            phase: CheckerPhase::Loading,
            num_checks: 0,
            checks_done: 0,
            match_count: 0,
            search: None,
            last_result: None,
            probes: 0,
        }
    }

    /// Append one coalesced interval to the lookup table.
    ///
    /// Each entry must start strictly after the previous entry ends.
    pub fn load(&mut self, interval: Interval<C>) -> Result<()> {
        if self.phase != CheckerPhase::Loading {
            return Err(self.violation("load"));
        }
        if self.table.len() >= self.max_ranges {
            return Err(PipelineError::CapacityExceeded {
                resource: Resource::Ranges,
                requested: self.table.len() + 1,
                max: self.max_ranges,
            });
        }
        interval.validate()?;
        if let Some(prev) = self.table.last() {
            if prev.end >= interval.start {
                return Err(PipelineError::NotCoalesced {
                    index: self.table.len(),
                });
            }
        }
        self.table.push(interval);
        Ok(())
    }

    /// Close the table and expect `num_checks` queries.
    pub fn begin(&mut self, num_checks: usize) -> Result<()> {
        if self.phase != CheckerPhase::Loading {
            return Err(self.violation("begin"));
        }
        if num_checks > self.max_checks {
            return Err(PipelineError::CapacityExceeded {
                resource: Resource::Checks,
                requested: num_checks,
                max: self.max_checks,
            });
        }
        self.num_checks = num_checks;
        self.checks_done = 0;
        self.match_count = 0;
        self.phase = if num_checks == 0 {
            CheckerPhase::Done
        } else {
            CheckerPhase::AwaitQuery
        };
        debug!(
            "checker armed: {} ranges, {} queries",
            self.table.len(),
            num_checks
        );
        Ok(())
    }

    /// Present the next query id.
    ///
    /// Returns true if its result is already available (an empty table
    /// answers "not covered" without searching), false if a search started.
    pub fn present(&mut self, id: C) -> Result<bool> {
        if self.phase != CheckerPhase::AwaitQuery {
            return Err(self.violation("present"));
        }
        self.last_result = None;
        if self.table.is_empty() {
            self.resolve(id, false);
            return Ok(true);
        }
        self.search = Some(Search {
            query: id,
            lo: 0,
            hi: self.table.len(),
        });
        self.phase = CheckerPhase::Searching;
        Ok(false)
    }

    /// Run one probe of the in-flight search.
    pub fn step(&mut self) -> Probe {
        let Some(mut search) = self.search else {
            return Probe::Idle;
        };
        if search.lo >= search.hi {
            self.resolve(search.query, false);
            return Probe::Resolved(false);
        }

        self.probes += 1;
        // Same midpoint as (left + right) / 2 over the inclusive window.
        let mid = search.lo + (search.hi - 1 - search.lo) / 2;
        match self.table[mid].locate(search.query) {
            std::cmp::Ordering::Less => search.hi = mid,
            std::cmp::Ordering::Greater => search.lo = mid + 1,
            std::cmp::Ordering::Equal => {
                self.resolve(search.query, true);
                return Probe::Resolved(true);
            }
        }
        self.search = Some(search);
        Probe::Pending
    }

    fn resolve(&mut self, query: C, covered: bool) {
        if covered {
            self.match_count += 1;
        }
        self.checks_done += 1;
        self.last_result = Some(covered);
        self.search = None;
        trace!("query {} -> {}", query, covered);
        self.phase = if self.checks_done >= self.num_checks {
            debug!(
                "checker done: {} of {} queries covered",
                self.match_count, self.num_checks
            );
            CheckerPhase::Done
        } else {
            CheckerPhase::AwaitQuery
        };
    }

    /// Present `id` and probe until it resolves.
    pub fn check(&mut self, id: C) -> Result<bool> {
        if !self.present(id)? {
            while self.step() == Probe::Pending {}
        }
        Ok(self.last_result.unwrap_or(false))
    }

    /// Whole membership search in one call, outside the query protocol.
    pub fn contains(&self, value: C) -> bool {
        self.table
            .binary_search_by(|interval| interval.locate(value).reverse())
            .is_ok()
    }

    pub fn table(&self) -> &[Interval<C>] {
        &self.table
    }

    pub fn phase(&self) -> CheckerPhase {
        self.phase
    }

    pub fn is_done(&self) -> bool {
        self.phase == CheckerPhase::Done
    }

    /// True while a search is in flight.
    pub fn is_busy(&self) -> bool {
        self.phase == CheckerPhase::Searching
    }

    /// Result of the most recently concluded query.
    pub fn last_result(&self) -> Option<bool> {
        self.last_result
    }

    pub fn match_count(&self) -> u32 {
        self.match_count
    }

    pub fn checks_done(&self) -> usize {
        self.checks_done
    }

    /// Table probes across all queries.
    pub fn probes(&self) -> u64 {
        self.probes
    }

    pub fn reset(&mut self) {
        self.table.clear();
        self.phase = CheckerPhase::Loading;
        self.num_checks = 0;
        self.checks_done = 0;
        self.match_count = 0;
        self.search = None;
        self.last_result = None;
        self.probes = 0;
    }

    fn violation(&self, operation: &'static str) -> PipelineError {
        PipelineError::ProtocolViolation {
            operation,
            state: self.phase.name(),
        }
    }
}
