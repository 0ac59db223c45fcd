//! Coordinator sequencing sort → merge → check.
//!
//! # States
//!
//! ```text
//! IDLE --begin--> SORTING --sorted--> MERGING --terminal output--> CHECKING --all queries--> DONE
//!                                              \-----------(no queries declared)-----------> DONE
//! ```
//!
//! Any capacity or protocol violation moves the coordinator to FAULTED,
//! which only [`PipelineCoordinator::reset`] leaves. `begin` in DONE returns
//! to IDLE for the next run.
//!
//! Each call to [`PipelineCoordinator::step`] performs one unit of work in
//! the active stage. Without queries the coordinator is the coverage-only
//! composition (sort → merge).

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Resource, Result};
use crate::interval::{Coord, Interval, IntervalSet};
use crate::pipeline::checker::{Probe, RangeChecker};
use crate::pipeline::merger::{MergeOutput, MergerState, StreamMerger};
use crate::pipeline::sorter::BoundedMergeSort;
use log::{debug, info, warn};
use std::fmt;

/// Coordinator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    Sorting,
    Merging,
    Checking,
    Done,
    /// A fatal error poisoned the run; call `reset`.
    Faulted,
}

impl CoordinatorState {
    pub fn name(&self) -> &'static str {
        match self {
            CoordinatorState::Idle => "IDLE",
            CoordinatorState::Sorting => "SORTING",
            CoordinatorState::Merging => "MERGING",
            CoordinatorState::Checking => "CHECKING",
            CoordinatorState::Done => "DONE",
            CoordinatorState::Faulted => "FAULTED",
        }
    }
}

impl fmt::Display for CoordinatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Owner of every buffer of one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineCoordinator<C: Coord = u64> {
    config: PipelineConfig,
    state: CoordinatorState,
    sorter: BoundedMergeSort<C>,
    merger: StreamMerger<C>,
    checker: RangeChecker<C>,
    /// Interval count announced by `ingest_done`.
    declared: Option<usize>,
    /// Query count announced by `declare_queries`; `None` means coverage only.
    queries: Option<usize>,
    /// Sorted outputs handed to the merger so far.
    sorted_fed: usize,
    coalesced: Vec<Interval<C>>,
    table_loaded: usize,
    checker_armed: bool,
    sorted_cursor: usize,
    coalesced_cursor: usize,
    steps: u64,
}

impl<C: Coord> PipelineCoordinator<C> {
    /// Allocate all stage buffers for `config`.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: CoordinatorState::Idle,
            sorter: BoundedMergeSort::new(config.max_ranges),
            merger: StreamMerger::new(config.compute_coverage),
            checker: RangeChecker::new(config.max_ranges, config.max_checks),
            declared: None,
            queries: None,
            sorted_fed: 0,
            coalesced: Vec::with_capacity(config.max_ranges),
            table_loaded: 0,
            checker_armed: false,
            sorted_cursor: 0,
            coalesced_cursor: 0,
            steps: 0,
        })
    }

    /// Load one raw interval.
    pub fn ingest(&mut self, interval: Interval<C>) -> Result<()> {
        if self.state != CoordinatorState::Idle || self.declared.is_some() {
            return Err(self.fault_with_violation("ingest"));
        }
        let result = self.sorter.load(interval);
        self.guard(result)
    }

    /// Declare the total number of ingested intervals.
    pub fn ingest_done(&mut self, count: usize) -> Result<()> {
        if self.state != CoordinatorState::Idle || self.declared.is_some() {
            return Err(self.fault_with_violation("ingest_done"));
        }
        if count > self.config.max_ranges {
            return Err(self.fault(PipelineError::CapacityExceeded {
                resource: Resource::Ranges,
                requested: count,
                max: self.config.max_ranges,
            }));
        }
        if count != self.sorter.loaded() {
            return Err(self.fault(PipelineError::CountMismatch {
                declared: count,
                received: self.sorter.loaded(),
            }));
        }
        self.declared = Some(count);
        Ok(())
    }

    /// Enable query mode for this run with `count` query ids.
    pub fn declare_queries(&mut self, count: usize) -> Result<()> {
        if self.state != CoordinatorState::Idle || self.queries.is_some() {
            return Err(self.fault_with_violation("declare_queries"));
        }
        if count > self.config.max_checks {
            return Err(self.fault(PipelineError::CapacityExceeded {
                resource: Resource::Checks,
                requested: count,
                max: self.config.max_checks,
            }));
        }
        self.queries = Some(count);
        Ok(())
    }

    /// Start processing, or return to IDLE after a finished run.
    pub fn begin(&mut self) -> Result<()> {
        match self.state {
            CoordinatorState::Done => {
                self.clear();
                self.transition(CoordinatorState::Idle);
                Ok(())
            }
            CoordinatorState::Idle => {
                let Some(count) = self.declared else {
                    return Err(self.fault_with_violation("begin"));
                };
                let result = self.sorter.begin(count);
                self.guard(result)?;
                self.transition(CoordinatorState::Sorting);
                Ok(())
            }
            _ => Err(self.fault_with_violation("begin")),
        }
    }

    /// Perform one unit of work and return the resulting state.
    pub fn step(&mut self) -> Result<CoordinatorState> {
        match self.state {
            CoordinatorState::Sorting => {
                self.steps += 1;
                if self.sorter.step() {
                    self.transition(CoordinatorState::Merging);
                }
            }
            CoordinatorState::Merging => {
                self.steps += 1;
                let result = self.merge_step();
                self.guard(result)?;
            }
            CoordinatorState::Checking => {
                self.steps += 1;
                let result = self.check_step();
                self.guard(result)?;
            }
            CoordinatorState::Idle | CoordinatorState::Done | CoordinatorState::Faulted => {}
        }
        Ok(self.state)
    }

    fn merge_step(&mut self) -> Result<()> {
        let declared = self.declared.unwrap_or(0);

        if self.merger.state() == MergerState::Flushing {
            let terminal = self.merger.flush()?;
            self.record(terminal);
            self.finish_merge();
            return Ok(());
        }
        if declared == 0 {
            self.finish_merge();
            return Ok(());
        }

        let interval = self.sorter.get_sorted(self.sorted_fed).ok_or(
            PipelineError::CountMismatch {
                declared,
                received: self.sorted_fed,
            },
        )?;
        self.sorted_fed += 1;
        // Only the output whose ordinal equals the declared count is last.
        let last = self.sorted_fed == declared;
        if let Some(output) = self.merger.push(interval, last)? {
            self.record(output);
        }
        Ok(())
    }

    fn record(&mut self, output: MergeOutput<C>) {
        self.coalesced.push(output.interval);
    }

    fn finish_merge(&mut self) {
        info!(
            "coalesced {} intervals into {} (coverage {})",
            self.sorted_fed,
            self.coalesced.len(),
            self.merger.total_coverage()
        );
        if self.queries.is_some() {
            self.transition(CoordinatorState::Checking);
        } else {
            self.transition(CoordinatorState::Done);
        }
    }

    fn check_step(&mut self) -> Result<()> {
        if self.table_loaded < self.coalesced.len() {
            self.checker.load(self.coalesced[self.table_loaded])?;
            self.table_loaded += 1;
            return Ok(());
        }
        if !self.checker_armed {
            self.checker.begin(self.queries.unwrap_or(0))?;
            self.checker_armed = true;
        } else if let Probe::Resolved(_) = self.checker.step() {
            debug!(
                "query {} resolved, {} matches so far",
                self.checker.checks_done(),
                self.checker.match_count()
            );
        }
        if self.checker.is_done() {
            info!(
                "checked {} queries: {} covered",
                self.checker.checks_done(),
                self.checker.match_count()
            );
            self.transition(CoordinatorState::Done);
        }
        Ok(())
    }

    /// Present one query id.
    ///
    /// Only valid in CHECKING once the lookup table is loaded and the
    /// previous query has concluded. Returns true when this query's result
    /// is ready now; otherwise keep calling [`step`](Self::step) until
    /// [`query_ready`](Self::query_ready).
    pub fn submit_query(&mut self, id: C) -> Result<bool> {
        if !self.accepts_queries() {
            return Err(self.fault_with_violation("submit_query"));
        }
        let result = self.checker.present(id);
        let ready = self.guard(result)?;
        if self.checker.is_done() {
            self.transition(CoordinatorState::Done);
        }
        Ok(ready)
    }

    /// True when a new query id may be submitted.
    pub fn accepts_queries(&self) -> bool {
        self.state == CoordinatorState::Checking
            && self.checker_armed
            && !self.checker.is_busy()
            && !self.checker.is_done()
    }

    /// True when the most recently submitted query has concluded.
    pub fn query_ready(&self) -> bool {
        self.checker_armed && !self.checker.is_busy() && self.checker.last_result().is_some()
    }

    /// Result of the most recently concluded query.
    pub fn last_query_result(&self) -> Option<bool> {
        if self.checker.is_busy() {
            None
        } else {
            self.checker.last_result()
        }
    }

    /// Drain the next sorted interval (available once sorting finished).
    pub fn poll_sorted(&mut self) -> Option<Interval<C>> {
        if matches!(
            self.state,
            CoordinatorState::Idle | CoordinatorState::Faulted
        ) {
            return None;
        }
        let interval = self.sorter.get_sorted(self.sorted_cursor)?;
        self.sorted_cursor += 1;
        Some(interval)
    }

    /// Drain the next coalesced interval and whether it is the terminal one.
    pub fn poll_coalesced(&mut self) -> Option<(Interval<C>, bool)> {
        let interval = *self.coalesced.get(self.coalesced_cursor)?;
        self.coalesced_cursor += 1;
        let is_last =
            self.coalesced_cursor == self.coalesced.len() && self.merger.is_done();
        Some((interval, is_last))
    }

    pub fn match_count(&self) -> u32 {
        self.checker.match_count()
    }

    /// Integers covered by the coalesced output so far.
    pub fn total_coverage(&self) -> u128 {
        self.merger.total_coverage()
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    /// Units of work performed in this run.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Sorted intervals, once sorting finished.
    pub fn sorted(&self) -> Option<&[Interval<C>]> {
        match self.state {
            CoordinatorState::Idle | CoordinatorState::Faulted => None,
            _ => self.sorter.sorted(),
        }
    }

    /// Coalesced intervals produced so far.
    pub fn coalesced(&self) -> &[Interval<C>] {
        &self.coalesced
    }

    /// The finished coalesced set, once merging completed.
    pub fn coalesced_set(&self) -> Option<IntervalSet<C>> {
        match self.state {
            CoordinatorState::Checking | CoordinatorState::Done => {
                IntervalSet::from_coalesced(self.coalesced.clone()).ok()
            }
            _ => None,
        }
    }

    pub fn sorter(&self) -> &BoundedMergeSort<C> {
        &self.sorter
    }

    pub fn merger(&self) -> &StreamMerger<C> {
        &self.merger
    }

    pub fn checker(&self) -> &RangeChecker<C> {
        &self.checker
    }

    /// Discard every buffer and return to IDLE.
    pub fn reset(&mut self) {
        self.clear();
        self.transition(CoordinatorState::Idle);
    }

    fn clear(&mut self) {
        self.sorter.reset();
        self.merger.reset();
        self.checker.reset();
        self.declared = None;
        self.queries = None;
        self.sorted_fed = 0;
        self.coalesced.clear();
        self.table_loaded = 0;
        self.checker_armed = false;
        self.sorted_cursor = 0;
        self.coalesced_cursor = 0;
        self.steps = 0;
    }

    fn transition(&mut self, next: CoordinatorState) {
        if self.state != next {
            debug!("coordinator {} -> {}", self.state, next);
            self.state = next;
        }
    }

    /// Pass non-fatal errors through; fault the run on fatal ones.
    fn guard<T>(&mut self, result: Result<T>) -> Result<T> {
        match result {
            Err(err) if err.is_fatal() => Err(self.fault(err)),
            other => other,
        }
    }

    fn fault(&mut self, err: PipelineError) -> PipelineError {
        warn!("run faulted in {}: {}", self.state, err);
        self.clear();
        self.transition(CoordinatorState::Faulted);
        err
    }

    fn fault_with_violation(&mut self, operation: &'static str) -> PipelineError {
        let err = PipelineError::ProtocolViolation {
            operation,
            state: self.state.name(),
        };
        self.fault(err)
    }
}
