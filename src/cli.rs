//! CLI argument parsing for the tasktime binaries

use crate::config::DEFAULT_BENCHMARK_ROOT;
use clap::Parser;
use std::path::PathBuf;

/// Arguments of `benchmark-report`
#[derive(Parser, Debug)]
#[command(name = "benchmark-report")]
#[command(version)]
#[command(about = "Print benchmark summary for provisioning task timings", long_about = None)]
pub struct ReportCli {
    /// Root directory that stores benchmark run folders
    #[arg(long = "benchmark-root", value_name = "DIR", default_value = DEFAULT_BENCHMARK_ROOT)]
    pub benchmark_root: PathBuf,

    /// Specific benchmark run directory. If omitted, the latest run is used
    #[arg(long = "benchmark-dir", value_name = "DIR")]
    pub benchmark_dir: Option<PathBuf>,

    /// Number of slow tasks to print from the timing summary (minimum 1)
    #[arg(long = "top", value_name = "N", default_value = "20", allow_negative_numbers = true)]
    pub top: i64,

    /// Enable debug tracing output (to stderr)
    #[arg(long = "debug")]
    pub debug: bool,
}

impl ReportCli {
    /// `--top` clamped to at least one task
    pub fn top_limit(&self) -> usize {
        usize::try_from(self.top.max(1)).unwrap_or(usize::MAX)
    }
}

/// Arguments of `tasktime-replay`
#[derive(Parser, Debug)]
#[command(name = "tasktime-replay")]
#[command(version)]
#[command(about = "Replay a task lifecycle event log through the timing aggregator", long_about = None)]
pub struct ReplayCli {
    /// Event log (JSON lines); `-` reads stdin
    #[arg(value_name = "EVENTS", default_value = "-")]
    pub events: PathBuf,

    /// Collect timings even if IDOPS_BENCHMARK is not set
    #[arg(long = "enable")]
    pub enable: bool,

    /// Run directory, overriding IDOPS_BENCHMARK_DIR
    #[arg(long = "benchmark-dir", value_name = "DIR")]
    pub benchmark_dir: Option<PathBuf>,

    /// Enable debug tracing output (to stderr)
    #[arg(long = "debug")]
    pub debug: bool,
}
