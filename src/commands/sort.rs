//! Sort command implementation.
//!
//! Sorts the range section of an input with the bounded merge sorter and
//! writes one `start-end` line per interval. Query ids are ignored.

use crate::config::{PipelineConfig, DEFAULT_STEP_BUDGET};
use crate::error::{PipelineError, Result};
use crate::input::RangeReader;
use crate::interval::{Coord, Interval};
use crate::output::RangeWriter;
use crate::pipeline::{BoundedMergeSort, SortStats};
use log::info;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

/// Sort command configuration.
#[derive(Debug, Clone)]
pub struct SortCommand {
    pub config: PipelineConfig,
    pub step_budget: u64,
    /// Reverse the output order.
    pub reverse: bool,
}

impl Default for SortCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl SortCommand {
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            step_budget: DEFAULT_STEP_BUDGET,
            reverse: false,
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

    pub fn with_reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    /// Sort intervals in memory.
    pub fn sort<C: Coord>(&self, intervals: &[Interval<C>]) -> Result<(Vec<Interval<C>>, SortStats)> {
        self.config.validate()?;
        let mut sorter = BoundedMergeSort::new(self.config.max_ranges);
        for &interval in intervals {
            sorter.load(interval)?;
        }
        sorter.begin(intervals.len())?;
        while !sorter.step() {
            if sorter.stats().steps >= self.step_budget {
                return Err(PipelineError::DidNotComplete {
                    steps: sorter.stats().steps,
                });
            }
        }

        let mut sorted = sorter.sorted().unwrap_or_default().to_vec();
        if self.reverse {
            sorted.reverse();
        }
        Ok((sorted, sorter.stats()))
    }

    /// Run sort on a file.
    pub fn run<P: AsRef<Path>, W: Write>(&self, input: P, output: &mut W) -> Result<SortStats> {
        let file = File::open(input.as_ref())?;
        self.run_reader::<u64, _, _>(file, output)
    }

    /// Run sort from stdin.
    pub fn run_stdin<W: Write>(&self, output: &mut W) -> Result<SortStats> {
        let stdin = io::stdin();
        self.run_reader::<u64, _, _>(stdin.lock(), output)
    }

    /// Sort everything `reader` yields.
    pub fn run_reader<C: Coord, R: Read, W: Write>(
        &self,
        reader: R,
        output: &mut W,
    ) -> Result<SortStats> {
        let input = RangeReader::<R, C>::new(reader).read_all()?;
        let (sorted, stats) = self.sort(&input.ranges)?;

        let mut writer = RangeWriter::new(output);
        writer.write_intervals(&sorted)?;
        writer.flush()?;

        info!("sorted {} intervals in {} passes", stats.intervals, stats.passes);
        Ok(stats)
    }
}
