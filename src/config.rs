//! Benchmark enablement and run directory configuration
//!
//! The environment is read once, here. The aggregator only ever sees the
//! resulting `BenchmarkConfig`.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Toggle for timing collection
pub const ENABLE_VAR: &str = "IDOPS_BENCHMARK";

/// Explicit run directory override
pub const RUN_DIR_VAR: &str = "IDOPS_BENCHMARK_DIR";

/// Default root for run directories, relative to the working directory
pub const DEFAULT_BENCHMARK_ROOT: &str = "logs/benchmark";

const TRUE_VALUES: [&str; 4] = ["1", "true", "yes", "on"];

/// Configuration for a `TimingAggregator`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BenchmarkConfig {
    /// Collect timings at all
    pub enabled: bool,
    /// Output directory; derived from the current time when absent
    pub run_dir: Option<PathBuf>,
}

impl BenchmarkConfig {
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            run_dir: None,
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn with_run_dir(mut self, run_dir: impl Into<PathBuf>) -> Self {
        self.run_dir = Some(run_dir.into());
        self
    }

    /// Read `IDOPS_BENCHMARK` and `IDOPS_BENCHMARK_DIR` from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let enabled = lookup(ENABLE_VAR).is_some_and(|value| is_truthy(&value));
        let run_dir = lookup(RUN_DIR_VAR)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);

        Self { enabled, run_dir }
    }

    /// The directory this run writes to
    ///
    /// An explicit `run_dir` wins; otherwise `<cwd>/logs/benchmark/<UTC YYYYMMDD-HHMMSS>`.
    pub fn resolve_run_dir(&self, cwd: &Path, now: DateTime<Utc>) -> PathBuf {
        match &self.run_dir {
            Some(dir) => dir.clone(),
            None => cwd
                .join(DEFAULT_BENCHMARK_ROOT)
                .join(now.format("%Y%m%d-%H%M%S").to_string()),
        }
    }
}

fn is_truthy(value: &str) -> bool {
    let normalized = value.trim().to_lowercase();
    TRUE_VALUES.contains(&normalized.as_str())
}
