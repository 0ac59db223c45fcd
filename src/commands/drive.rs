//! Drive a [`PipelineCoordinator`] through one complete run.
//!
//! The coordinator itself never loops; this is the caller-side loop that
//! feeds it, steps it under a budget, and collects the results.

use crate::error::{PipelineError, Result};
use crate::interval::{Coord, Interval};
use crate::pipeline::{CoordinatorState, MergeStats, PipelineCoordinator, SortStats};
use log::debug;

/// Everything one run produced.
#[derive(Debug, Clone)]
pub struct PipelineReport<C: Coord = u64> {
    pub sorted: Vec<Interval<C>>,
    pub coalesced: Vec<Interval<C>>,
    pub total_coverage: u128,
    pub match_count: u32,
    /// Per-query verdicts in submission order.
    pub covered: Vec<bool>,
    pub steps: u64,
    pub sort_stats: SortStats,
    pub merge_stats: MergeStats,
}

/// Run `intervals` (and `queries`, if any) through `coord`.
///
/// A coordinator left in DONE by a previous run is returned to IDLE first;
/// one left FAULTED is reset. Fails with `DidNotComplete` once the
/// coordinator has taken `step_budget` steps without finishing.
pub fn run_pipeline<C: Coord>(
    coord: &mut PipelineCoordinator<C>,
    intervals: &[Interval<C>],
    queries: Option<&[C]>,
    step_budget: u64,
) -> Result<PipelineReport<C>> {
    match coord.state() {
        CoordinatorState::Done => coord.begin()?,
        CoordinatorState::Idle => {}
        _ => coord.reset(),
    }

    for &interval in intervals {
        coord.ingest(interval)?;
    }
    coord.ingest_done(intervals.len())?;
    if let Some(queries) = queries {
        coord.declare_queries(queries.len())?;
    }
    coord.begin()?;

    while matches!(
        coord.state(),
        CoordinatorState::Sorting | CoordinatorState::Merging
    ) {
        advance(coord, step_budget)?;
    }
    let sorted = coord.sorted().map(<[_]>::to_vec).unwrap_or_default();

    let mut covered = Vec::new();
    if let Some(queries) = queries {
        covered.reserve(queries.len());
        for &id in queries {
            while coord.state() == CoordinatorState::Checking && !coord.accepts_queries() {
                advance(coord, step_budget)?;
            }
            if !coord.submit_query(id)? {
                while !coord.query_ready() {
                    advance(coord, step_budget)?;
                }
            }
            covered.push(coord.last_query_result().unwrap_or(false));
        }
        // Zero queries still have to load the table and arm the checker.
        while coord.state() == CoordinatorState::Checking {
            advance(coord, step_budget)?;
        }
    }

    debug!("run finished in {} steps", coord.steps());
    Ok(PipelineReport {
        sorted,
        coalesced: coord.coalesced().to_vec(),
        total_coverage: coord.total_coverage(),
        match_count: coord.match_count(),
        covered,
        steps: coord.steps(),
        sort_stats: coord.sorter().stats(),
        merge_stats: coord.merger().stats(),
    })
}

fn advance<C: Coord>(coord: &mut PipelineCoordinator<C>, step_budget: u64) -> Result<()> {
    if coord.steps() >= step_budget {
        return Err(PipelineError::DidNotComplete {
            steps: coord.steps(),
        });
    }
    coord.step()?;
    Ok(())
}
