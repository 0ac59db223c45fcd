//! Error types shared by every pipeline stage.

use std::fmt;
use std::io;
use thiserror::Error;

/// Bounded resource that a capacity check guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// Interval slots in the sort banks or lookup table.
    Ranges,
    /// Query ids in one batch.
    Checks,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Ranges => write!(f, "ranges"),
            Resource::Checks => write!(f, "checks"),
        }
    }
}

/// Errors raised by the pipeline and the layers around it.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("capacity exceeded: {requested} {resource} requested, maximum is {max}")]
    CapacityExceeded {
        resource: Resource,
        requested: usize,
        max: usize,
    },

    #[error("protocol violation: `{operation}` is not allowed while {state}")]
    ProtocolViolation {
        operation: &'static str,
        state: &'static str,
    },

    #[error("declared count {declared} does not match the {received} intervals received")]
    CountMismatch { declared: usize, received: usize },

    #[error("invalid interval: start ({start}) > end ({end})")]
    InvalidInterval { start: String, end: String },

    #[error("input {index} starts before the interval received ahead of it")]
    OutOfOrder { index: usize },

    #[error("lookup table entry {index} overlaps, touches or precedes the previous entry")]
    NotCoalesced { index: usize },

    #[error("pipeline did not complete within {steps} steps")]
    DidNotComplete { steps: u64 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },
}

impl PipelineError {
    /// True for errors that poison the current run until it is reset.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PipelineError::CapacityExceeded { .. }
                | PipelineError::ProtocolViolation { .. }
                | PipelineError::CountMismatch { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
