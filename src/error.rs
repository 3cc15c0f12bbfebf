//! Error types for timing aggregation and report loading
//!
//! Only startup (run directory and sink creation) and report lookup can fail
//! loudly. Everything on the per-event path degrades to defaults instead.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while setting up or finalizing a benchmark run
#[derive(Error, Debug)]
pub enum TimingError {
    #[error("Failed to create benchmark run directory {path}: {source}")]
    CreateRunDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to open timing output {path}: {source}")]
    OpenSink {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write timing output {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize timing data: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type for aggregation operations
pub type Result<T> = std::result::Result<T, TimingError>;

/// Errors raised while locating or loading a run for the report tool
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Benchmark root does not exist: {}", .0.display())]
    RootMissing(PathBuf),

    #[error("No completed benchmark runs found under: {}", .0.display())]
    NoCompletedRuns(PathBuf),

    #[error("Timing summary was not found: {}. Run make benchmark-cold first.", .0.display())]
    SummaryMissing(PathBuf),

    #[error("Invalid timing summary {}: {source}", .path.display())]
    InvalidSummary {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
