//! The three-stage processing pipeline.
//!
//! - [`sorter`]: bounded bottom-up merge sort over ping-pong banks
//! - [`merger`]: O(1) memory streaming coalescer
//! - [`checker`]: binary-search membership over the coalesced set
//! - [`coordinator`]: state machine sequencing the stages
//!
//! Every stage is sized once from a [`PipelineConfig`](crate::config::PipelineConfig)
//! and advances one unit of work per `step`.

pub mod checker;
pub mod coordinator;
pub mod merger;
pub mod sorter;

pub use checker::{CheckerPhase, Probe, RangeChecker};
pub use coordinator::{CoordinatorState, PipelineCoordinator};
pub use merger::{coalesce, MergeOutput, MergeStats, MergerState, StreamMerger};
pub use sorter::{bounded_sort, Bank, BoundedMergeSort, SortPhase, SortStats};
