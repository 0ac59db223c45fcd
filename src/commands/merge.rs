//! Merge command implementation.
//!
//! Coalesces overlapping and touching ranges. By default the ranges go
//! through the full sort → merge pipeline; with `presorted` they stream
//! straight into a [`StreamMerger`] in O(1) memory and must arrive in
//! start order.

use crate::commands::drive::run_pipeline;
use crate::config::{PipelineConfig, DEFAULT_STEP_BUDGET};
use crate::error::Result;
use crate::input::{RangeReader, Record};
use crate::interval::{Coord, Interval};
use crate::output::RangeWriter;
use crate::pipeline::{MergeOutput, MergeStats, PipelineCoordinator, StreamMerger};
use log::info;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

/// Merge command configuration.
#[derive(Debug, Clone)]
pub struct MergeCommand {
    pub config: PipelineConfig,
    pub step_budget: u64,
    /// Input is already sorted by start; skip the sort stage.
    pub presorted: bool,
    /// Append the total covered integer count after the ranges.
    pub report_coverage: bool,
}

impl Default for MergeCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl MergeCommand {
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            step_budget: DEFAULT_STEP_BUDGET,
            presorted: false,
            report_coverage: false,
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

    pub fn with_presorted(mut self, presorted: bool) -> Self {
        self.presorted = presorted;
        self
    }

    pub fn with_coverage(mut self, report: bool) -> Self {
        self.report_coverage = report;
        self
    }

    /// Run merge on a file.
    pub fn run<P: AsRef<Path>, W: Write>(&self, input: P, output: &mut W) -> Result<MergeStats> {
        let file = File::open(input.as_ref())?;
        self.run_reader::<u64, _, _>(file, output)
    }

    /// Run merge from stdin.
    pub fn run_stdin<W: Write>(&self, output: &mut W) -> Result<MergeStats> {
        let stdin = io::stdin();
        self.run_reader::<u64, _, _>(stdin.lock(), output)
    }

    /// Merge everything `reader` yields.
    pub fn run_reader<C: Coord, R: Read, W: Write>(
        &self,
        reader: R,
        output: &mut W,
    ) -> Result<MergeStats> {
        let reader = RangeReader::<R, C>::new(reader);
        let mut writer = RangeWriter::new(output);

        let (stats, coverage) = if self.presorted {
            self.merge_streaming(reader, &mut writer)?
        } else {
            let input = reader.read_all()?;
            let mut coord = PipelineCoordinator::new(self.config)?;
            let report = run_pipeline(&mut coord, &input.ranges, None, self.step_budget)?;
            writer.write_intervals(&report.coalesced)?;
            (report.merge_stats, report.total_coverage)
        };

        if self.report_coverage {
            writer.write_count(coverage)?;
        }
        writer.flush()?;

        info!("merge: {}", stats);
        Ok(stats)
    }

    /// Feed records one at a time, holding back one interval so the final
    /// one can be flagged as last.
    fn merge_streaming<C: Coord, R: Read, W: Write>(
        &self,
        reader: RangeReader<R, C>,
        writer: &mut RangeWriter<W>,
    ) -> Result<(MergeStats, u128)> {
        let mut merger = StreamMerger::new(self.config.compute_coverage);
        let mut pending: Option<Interval<C>> = None;

        for record in reader.records() {
            let Record::Range(interval) = record? else {
                break;
            };
            if let Some(prev) = pending.replace(interval) {
                if let Some(MergeOutput { interval, .. }) = merger.push(prev, false)? {
                    writer.write_interval_line(&interval)?;
                }
            }
        }

        if let Some(prev) = pending {
            if let Some(MergeOutput { interval, .. }) = merger.push(prev, true)? {
                writer.write_interval_line(&interval)?;
            }
            let terminal = merger.flush()?;
            writer.write_interval_line(&terminal.interval)?;
        }
        Ok((merger.stats(), merger.total_coverage()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;

    fn run(cmd: &MergeCommand, input: &str) -> String {
        let mut output = Vec::new();
        cmd.run_reader::<u64, _, _>(input.as_bytes(), &mut output)
            .unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_merge_unsorted() {
        let out = run(&MergeCommand::new(), "15-20\n1-5\n3-10\n18-25\n");
        assert_eq!(out, "1-10\n15-25\n");
    }

    #[test]
    fn test_merge_with_coverage() {
        let out = run(
            &MergeCommand::new().with_coverage(true),
            "3-5\n10-14\n16-20\n12-18\n\n1\n",
        );
        assert_eq!(out, "3-5\n10-20\n14\n");
    }

    #[test]
    fn test_merge_presorted_matches_pipeline() {
        let input = "1-3\n2-6\n8-10\n10-12\n15-18\n";
        let piped = run(&MergeCommand::new().with_coverage(true), input);
        let streamed = run(
            &MergeCommand::new().with_presorted(true).with_coverage(true),
            input,
        );
        assert_eq!(piped, "1-6\n8-12\n15-18\n15\n");
        assert_eq!(streamed, piped);
    }

    #[test]
    fn test_presorted_rejects_unsorted() {
        let mut output = Vec::new();
        let err = MergeCommand::new()
            .with_presorted(true)
            .run_reader::<u64, _, _>("5-6\n1-2\n".as_bytes(), &mut output)
            .unwrap_err();
        assert!(matches!(err, PipelineError::OutOfOrder { index: 1 }));
    }

    #[test]
    fn test_presorted_has_no_capacity_limit() {
        let input: String = (0..600u64).map(|i| format!("{}-{}\n", i * 3, i * 3 + 1)).collect();
        let cmd = MergeCommand::new()
            .with_config(PipelineConfig::new().with_max_ranges(4))
            .with_presorted(true);
        let mut output = Vec::new();
        let stats = cmd
            .run_reader::<u64, _, _>(input.as_bytes(), &mut output)
            .unwrap();
        assert_eq!(stats.intervals_written, 600);
    }

    #[test]
    fn test_merge_empty() {
        assert_eq!(run(&MergeCommand::new().with_coverage(true), ""), "0\n");
        assert_eq!(
            run(&MergeCommand::new().with_presorted(true).with_coverage(true), ""),
            "0\n"
        );
    }

    #[test]
    fn test_consecutive_points_stay_apart() {
        assert_eq!(run(&MergeCommand::new(), "2-2\n1-1\n"), "1-1\n2-2\n");
    }
}
