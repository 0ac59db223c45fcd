//! Pipeline sizing and runtime configuration.
//!
//! Every buffer in a pipeline run is sized from a [`PipelineConfig`] once,
//! when the run is created. Nothing grows past these limits afterwards.

use crate::error::{PipelineError, Result};

/// Default interval capacity of the sort banks and the lookup table.
pub const DEFAULT_MAX_RANGES: usize = 256;

/// Default number of query ids accepted in one batch.
pub const DEFAULT_MAX_CHECKS: usize = 1024;

/// Largest accepted interval capacity. Four buffers of this many intervals
/// are reserved when a coordinator is created.
pub const MAX_RANGES_LIMIT: usize = 1 << 24;

/// Default step budget used by callers that drive a run to completion.
pub const DEFAULT_STEP_BUDGET: u64 = 10_000_000;

/// Capacity and feature switches for one pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Maximum number of intervals per run.
    pub max_ranges: usize,
    /// Maximum number of query ids per run.
    pub max_checks: usize,
    /// Accumulate the 128-bit coverage total while coalescing.
    pub compute_coverage: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_ranges: DEFAULT_MAX_RANGES,
            max_checks: DEFAULT_MAX_CHECKS,
            compute_coverage: true,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the interval capacity.
    pub fn with_max_ranges(mut self, max_ranges: usize) -> Self {
        self.max_ranges = max_ranges;
        self
    }

    /// Set the query batch capacity.
    pub fn with_max_checks(mut self, max_checks: usize) -> Self {
        self.max_checks = max_checks;
        self
    }

    /// Enable or disable coverage accounting.
    pub fn with_coverage(mut self, enabled: bool) -> Self {
        self.compute_coverage = enabled;
        self
    }

    /// Reject configurations no run could use.
    pub fn validate(&self) -> Result<()> {
        if self.max_ranges == 0 {
            return Err(PipelineError::InvalidConfig(
                "max_ranges must be at least 1".to_string(),
            ));
        }
        if self.max_ranges > MAX_RANGES_LIMIT {
            return Err(PipelineError::InvalidConfig(format!(
                "max_ranges must not exceed {}",
                MAX_RANGES_LIMIT
            )));
        }
        // The match count is a u32.
        if self.max_checks > u32::MAX as usize {
            return Err(PipelineError::InvalidConfig(format!(
                "max_checks must not exceed {}",
                u32::MAX
            )));
        }
        Ok(())
    }
}
