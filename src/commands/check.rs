//! Check command implementation.
//!
//! Runs ranges and query ids through sort → merge → check and reports how
//! many ids fall inside any range. With `parallel` the batch is answered
//! at once with Rayon instead of one query at a time.

use crate::commands::drive::run_pipeline;
use crate::config::{PipelineConfig, DEFAULT_STEP_BUDGET};
use crate::error::{PipelineError, Resource, Result};
use crate::input::{RangeInput, RangeReader};
use crate::interval::{Coord, IntervalSet};
use crate::output::RangeWriter;
use crate::parallel::{check_batch, BatchStats};
use crate::pipeline::{bounded_sort, coalesce, PipelineCoordinator};
use log::info;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

/// Check command configuration.
#[derive(Debug, Clone)]
pub struct CheckCommand {
    pub config: PipelineConfig,
    pub step_budget: u64,
    /// Answer the whole batch with Rayon.
    pub parallel: bool,
    /// Print one verdict line per query before the count.
    pub verbose: bool,
}

impl Default for CheckCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckCommand {
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            step_budget: DEFAULT_STEP_BUDGET,
            parallel: false,
            verbose: false,
        }
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_step_budget(mut self, budget: u64) -> Self {
        self.step_budget = budget;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Run check on a file.
    pub fn run<P: AsRef<Path>, W: Write>(&self, input: P, output: &mut W) -> Result<CheckStats> {
        let file = File::open(input.as_ref())?;
        self.run_reader::<u64, _, _>(file, output)
    }

    /// Run check from stdin.
    pub fn run_stdin<W: Write>(&self, output: &mut W) -> Result<CheckStats> {
        let stdin = io::stdin();
        self.run_reader::<u64, _, _>(stdin.lock(), output)
    }

    /// Check everything `reader` yields.
    pub fn run_reader<C: Coord, R: Read, W: Write>(
        &self,
        reader: R,
        output: &mut W,
    ) -> Result<CheckStats> {
        let input = RangeReader::<R, C>::new(reader).read_all()?;
        let (verdicts, stats) = self.check(&input)?;

        let mut writer = RangeWriter::new(output);
        if self.verbose {
            for (&id, &covered) in input.queries.iter().zip(&verdicts) {
                writer.write_verdict(id, covered)?;
            }
        }
        writer.write_count(stats.covered)?;
        writer.flush()?;

        info!("check: {}", stats);
        Ok(stats)
    }

    /// Per-query verdicts and summary for parsed input.
    pub fn check<C: Coord>(&self, input: &RangeInput<C>) -> Result<(Vec<bool>, CheckStats)> {
        if self.parallel {
            return self.check_parallel(input);
        }
        let mut coord = PipelineCoordinator::new(self.config)?;
        let report = run_pipeline(
            &mut coord,
            &input.ranges,
            Some(input.queries.as_slice()),
            self.step_budget,
        )?;
        let stats = CheckStats {
            ranges: input.ranges.len(),
            coalesced: report.coalesced.len(),
            queries: input.queries.len(),
            covered: report.match_count,
            steps: report.steps,
            parallel: false,
        };
        Ok((report.covered, stats))
    }

    fn check_parallel<C: Coord>(&self, input: &RangeInput<C>) -> Result<(Vec<bool>, CheckStats)> {
        self.config.validate()?;
        if input.queries.len() > self.config.max_checks {
            return Err(PipelineError::CapacityExceeded {
                resource: Resource::Checks,
                requested: input.queries.len(),
                max: self.config.max_checks,
            });
        }
        let sorted = bounded_sort(&input.ranges, self.config.max_ranges)?;
        let set = IntervalSet::from_coalesced(coalesce(&sorted)?)?;

        let verdicts = check_batch(&set, &input.queries);
        let covered = verdicts.iter().filter(|&&v| v).count() as u32;
        let batch = BatchStats::new(input.queries.len(), covered);
        let stats = CheckStats {
            ranges: input.ranges.len(),
            coalesced: set.len(),
            queries: batch.queries,
            covered: batch.covered,
            steps: 0,
            parallel: batch.parallel,
        };
        Ok((verdicts, stats))
    }
}

/// Statistics from check operation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CheckStats {
    pub ranges: usize,
    pub coalesced: usize,
    pub queries: usize,
    pub covered: u32,
    /// Coordinator steps; zero in parallel mode.
    pub steps: u64,
    /// True when the batch was large enough to fan out across threads.
    pub parallel: bool,
}

impl std::fmt::Display for CheckStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Ranges: {} ({} coalesced), Queries: {}, Covered: {}, Steps: {}",
            self.ranges, self.coalesced, self.queries, self.covered, self.steps
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PUZZLE: &str = "3-5\n10-14\n16-20\n12-18\n\n1\n5\n8\n11\n17\n32\n";

    fn run(cmd: &CheckCommand, input: &str) -> String {
        let mut output = Vec::new();
        cmd.run_reader::<u64, _, _>(input.as_bytes(), &mut output)
            .unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_check_count() {
        assert_eq!(run(&CheckCommand::new(), PUZZLE), "3\n");
    }

    #[test]
    fn test_check_verbose() {
        let out = run(&CheckCommand::new().with_verbose(true), "1-10\n15-25\n\n0\n5\n12\n");
        assert_eq!(out, "0\tmissing\n5\tcovered\n12\tmissing\n1\n");
    }

    #[test]
    fn test_parallel_matches_stepped() {
        let stepped = run(&CheckCommand::new().with_verbose(true), PUZZLE);
        let parallel = run(
            &CheckCommand::new().with_verbose(true).with_parallel(true),
            PUZZLE,
        );
        assert_eq!(stepped, parallel);
    }

    #[test]
    fn test_check_stats() {
        let input: RangeInput = crate::input::parse_input(PUZZLE).unwrap();
        let (_, stats) = CheckCommand::new().check(&input).unwrap();
        assert_eq!(stats.ranges, 4);
        assert_eq!(stats.coalesced, 2);
        assert_eq!(stats.queries, 6);
        assert_eq!(stats.covered, 3);
        assert!(stats.steps > 0);
    }

    #[test]
    fn test_too_many_queries() {
        let cmd = CheckCommand::new().with_config(PipelineConfig::new().with_max_checks(2));
        let input: RangeInput = crate::input::parse_input("1-2\n\n1\n2\n3\n").unwrap();
        for cmd in [cmd.clone(), cmd.with_parallel(true)] {
            assert!(matches!(
                cmd.check(&input),
                Err(PipelineError::CapacityExceeded {
                    resource: Resource::Checks,
                    requested: 3,
                    max: 2
                })
            ));
        }
    }

    #[test]
    fn test_no_ranges() {
        assert_eq!(run(&CheckCommand::new(), "\n4\n5\n"), "0\n");
    }
}
