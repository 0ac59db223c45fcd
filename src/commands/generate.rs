//! Generate synthetic range inputs for testing and benchmarking.
//!
//! Output is the same format every other command reads: ranges, a blank
//! line, then query ids. Generation is deterministic for a given seed.

use crate::error::{PipelineError, Result};
use crate::input::RangeInput;
use crate::interval::Interval;
use crate::output::RangeWriter;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::io::Write;

/// Generation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerateConfig {
    /// Number of ranges
    pub ranges: usize,
    /// Number of query ids
    pub queries: usize,
    /// Largest coordinate any range or query may use
    pub max_coord: u64,
    /// Largest range length (end - start)
    pub max_len: u64,
    pub seed: u64,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            ranges: 200,
            queries: 1000,
            max_coord: 1_000_000,
            max_len: 10_000,
            seed: 42,
        }
    }
}

impl GenerateConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_len > self.max_coord {
            return Err(PipelineError::InvalidConfig(format!(
                "max_len ({}) exceeds max_coord ({})",
                self.max_len, self.max_coord
            )));
        }
        Ok(())
    }
}

/// Statistics from generate operation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GenerateStats {
    pub ranges: usize,
    pub queries: usize,
    pub seed: u64,
}

impl std::fmt::Display for GenerateStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ranges, {} queries (seed {})",
            self.ranges, self.queries, self.seed
        )
    }
}

/// Synthetic input generator.
#[derive(Debug, Clone, Default)]
pub struct GenerateCommand {
    pub config: GenerateConfig,
}

impl GenerateCommand {
    pub fn new(config: GenerateConfig) -> Self {
        Self { config }
    }

    /// Build the input in memory.
    pub fn generate(&self) -> Result<RangeInput> {
        self.config.validate()?;
        let mut rng = SmallRng::seed_from_u64(self.config.seed);

        let ranges = (0..self.config.ranges)
            .map(|_| self.random_range(&mut rng))
            .collect();
        let queries = (0..self.config.queries)
            .map(|_| rng.gen_range(0..=self.config.max_coord))
            .collect();
        Ok(RangeInput { ranges, queries })
    }

    fn random_range(&self, rng: &mut SmallRng) -> Interval {
        let len = rng.gen_range(0..=self.config.max_len);
        let start = rng.gen_range(0..=self.config.max_coord - len);
        Interval::new(start, start + len)
    }

    /// Generate and write the input.
    pub fn run<W: Write>(&self, output: &mut W) -> Result<GenerateStats> {
        let input = self.generate()?;
        let mut writer = RangeWriter::new(output);
        writer.write_intervals(&input.ranges)?;
        if !input.queries.is_empty() {
            writer.write_line(b"")?;
            for &id in &input.queries {
                writer.write_count(id)?;
            }
        }
        writer.flush()?;

        Ok(GenerateStats {
            ranges: input.ranges.len(),
            queries: input.queries.len(),
            seed: self.config.seed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::parse_input;

    fn config(ranges: usize, queries: usize, seed: u64) -> GenerateConfig {
        GenerateConfig {
            ranges,
            queries,
            max_coord: 500,
            max_len: 20,
            seed,
        }
    }

    #[test]
    fn test_deterministic() {
        let a = GenerateCommand::new(config(50, 50, 12345)).generate().unwrap();
        let b = GenerateCommand::new(config(50, 50, 12345)).generate().unwrap();
        let c = GenerateCommand::new(config(50, 50, 54321)).generate().unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_bounds() {
        let input = GenerateCommand::new(config(500, 500, 7)).generate().unwrap();
        for iv in &input.ranges {
            assert!(iv.start <= iv.end);
            assert!(iv.end <= 500);
            assert!(iv.end - iv.start <= 20);
        }
        assert!(input.queries.iter().all(|&q| q <= 500));
    }

    #[test]
    fn test_output_parses_back() {
        let cmd = GenerateCommand::new(config(30, 10, 3));
        let mut output = Vec::new();
        let stats = cmd.run(&mut output).unwrap();
        assert_eq!(stats.ranges, 30);
        assert_eq!(stats.queries, 10);

        let parsed: RangeInput = parse_input(std::str::from_utf8(&output).unwrap()).unwrap();
        assert_eq!(parsed, cmd.generate().unwrap());
    }

    #[test]
    fn test_rejects_len_over_coord() {
        let mut cfg = config(1, 1, 1);
        cfg.max_len = 501;
        assert!(matches!(
            GenerateCommand::new(cfg).generate(),
            Err(PipelineError::InvalidConfig(_))
        ));
    }
}
