// Clippy allows for the whole crate
#![allow(clippy::should_implement_trait)]

//! rangecov: a bounded interval pipeline
//!
//! Sorts integer ranges, coalesces overlapping or touching ones, and
//! answers membership queries against the result. Every buffer is sized
//! once from a [`PipelineConfig`] and every stage advances one unit of
//! work per `step`, so a run can be driven and inspected incrementally.
//!
//! # Features
//!
//! - **Bounded memory**: ping-pong merge sort over two fixed banks
//! - **Streaming coalescer**: O(1) state with 128-bit coverage totals
//! - **Generic coordinates**: any fixed-width integer, signed or unsigned
//! - **Parallel batches**: Rayon fan-out for large query sets
//!
//! # Example
//!
//! ```rust
//! use rangecov::prelude::*;
//!
//! let input: RangeInput = parse_input("3-5\n10-14\n16-20\n12-18\n\n1\n5\n8\n11\n17\n32\n").unwrap();
//!
//! let mut coord = PipelineCoordinator::new(PipelineConfig::default()).unwrap();
//! let report = run_pipeline(&mut coord, &input.ranges, Some(&input.queries[..]), 1_000_000).unwrap();
//!
//! assert_eq!(report.coalesced, vec![Interval::new(3, 5), Interval::new(10, 20)]);
//! assert_eq!(report.total_coverage, 14);
//! assert_eq!(report.match_count, 3);
//! ```

pub mod commands;
pub mod config;
pub mod error;
pub mod input;
pub mod interval;
pub mod output;
pub mod parallel;
pub mod pipeline;

// Re-export commonly used types
pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use input::{parse_input, read_input, RangeInput, RangeReader};
pub use interval::{Coord, Interval, IntervalSet};
pub use pipeline::{BoundedMergeSort, PipelineCoordinator, RangeChecker, StreamMerger};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::commands::{
        run_pipeline, CheckCommand, MergeCommand, PipelineReport, SortCommand,
    };
    pub use crate::config::PipelineConfig;
    pub use crate::error::{PipelineError, Result};
    pub use crate::input::{parse_input, read_input, RangeInput};
    pub use crate::interval::{Coord, Interval, IntervalSet};
    pub use crate::pipeline::{
        BoundedMergeSort, CoordinatorState, PipelineCoordinator, RangeChecker, StreamMerger,
    };
}
