//! Command implementations for rangecov.

pub mod check;
pub mod drive;
pub mod generate;
pub mod merge;
pub mod sort;

pub use check::{CheckCommand, CheckStats};
pub use drive::{run_pipeline, PipelineReport};
pub use generate::{GenerateCommand, GenerateConfig, GenerateStats};
pub use merge::MergeCommand;
pub use sort::SortCommand;
