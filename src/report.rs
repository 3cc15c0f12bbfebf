//! Human-readable benchmark report
//!
//! Reads a run directory written by the aggregator (`timing_summary.json`)
//! plus an optional `time.txt` produced by an external `time` wrapper, and
//! renders the stage totals and slowest tasks for a terminal.

use crate::error::ReportError;
use crate::record::format_seconds;
use crate::summary::SUMMARY_FILE;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Shell timing file written next to the summary
pub const TIME_FILE: &str = "time.txt";

/// Keys read from `time.txt`, in display order
pub const TIME_KEYS: [&str; 4] = ["real_seconds", "user_seconds", "sys_seconds", "max_rss_kb"];

pub const ADVISORY_NOTE: &str = "Note: apt update/upgrade excluded in benchmark-cold.";

const MISSING: &str = "n/a";

/// Result type for report operations
pub type Result<T> = std::result::Result<T, ReportError>;

/// Summary fields as read back by the report; every field is optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportSummary {
    #[serde(default)]
    pub total_wall_seconds: Option<f64>,
    #[serde(default)]
    pub task_count: Option<u64>,
    #[serde(default)]
    pub stage_totals_seconds: BTreeMap<String, f64>,
    #[serde(default)]
    pub top_20_slowest_tasks: Vec<ReportTask>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportTask {
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub task_name: Option<String>,
}

/// A loaded run, ready to render
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_dir: PathBuf,
    pub summary: ReportSummary,
    pub time_data: HashMap<String, String>,
}

/// Pick the run to report on: the explicit directory, or the latest completed run under `root`
pub fn locate_run(root: &Path, explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(dir) => Ok(dir.to_path_buf()),
        None => pick_latest_run(root),
    }
}

/// Most recently modified subdirectory of `root` that contains a summary
pub fn pick_latest_run(root: &Path) -> Result<PathBuf> {
    if !root.exists() {
        return Err(ReportError::RootMissing(root.to_path_buf()));
    }

    let mut latest: Option<(SystemTime, PathBuf)> = None;
    for entry in fs::read_dir(root)? {
        let path = entry?.path();
        if !path.is_dir() || !path.join(SUMMARY_FILE).exists() {
            continue;
        }
        let modified = fs::metadata(&path)?.modified()?;
        let newer = match &latest {
            Some((best, _)) => modified > *best,
            None => true,
        };
        if newer {
            latest = Some((modified, path));
        }
    }

    latest
        .map(|(_, path)| path)
        .ok_or_else(|| ReportError::NoCompletedRuns(root.to_path_buf()))
}

/// Parse `key=value` lines; blank lines and lines without `=` are ignored
pub fn parse_time_text(text: &str) -> HashMap<String, String> {
    text.lines()
        .filter_map(|line| line.trim().split_once('='))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect()
}

/// Read `time.txt`, treating a missing file as empty
pub fn parse_time_file(path: &Path) -> Result<HashMap<String, String>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    Ok(parse_time_text(&fs::read_to_string(path)?))
}

impl RunReport {
    /// Load the summary and shell timings of a run directory
    pub fn load(run_dir: &Path) -> Result<Self> {
        let summary_path = run_dir.join(SUMMARY_FILE);
        if !summary_path.exists() {
            return Err(ReportError::SummaryMissing(summary_path));
        }

        let text = fs::read_to_string(&summary_path)?;
        let summary = serde_json::from_str(&text).map_err(|source| {
            ReportError::InvalidSummary {
                path: summary_path.clone(),
                source,
            }
        })?;
        let time_data = parse_time_file(&run_dir.join(TIME_FILE))?;

        Ok(Self {
            run_dir: run_dir.to_path_buf(),
            summary,
            time_data,
        })
    }

    /// Render the report, listing at most `top` tasks (at least one)
    pub fn render(&self, top: usize) -> String {
        let top = top.max(1);
        let mut out = String::new();

        let _ = writeln!(out, "Benchmark run: {}", self.run_dir.display());
        let _ = writeln!(out, "{}", ADVISORY_NOTE);

        if !self.time_data.is_empty() {
            let fields: Vec<String> = TIME_KEYS
                .iter()
                .map(|key| {
                    let value = self.time_data.get(*key).map_or(MISSING, String::as_str);
                    format!("{}={}", key, value)
                })
                .collect();
            let _ = writeln!(out, "Wall clock (shell time): {}", fields.join(" "));
        }

        let wall = self
            .summary
            .total_wall_seconds
            .map_or_else(|| MISSING.to_string(), format_seconds);
        let count = self
            .summary
            .task_count
            .map_or_else(|| MISSING.to_string(), |n| n.to_string());
        let _ = writeln!(
            out,
            "Aggregator wall clock: {} seconds (task_count={})",
            wall, count
        );

        let _ = writeln!(out, "\nStage totals (seconds):");
        let mut stages: Vec<(&String, &f64)> = self.summary.stage_totals_seconds.iter().collect();
        stages.sort_by(|a, b| b.1.total_cmp(a.1));
        for (stage, seconds) in stages {
            let _ = writeln!(out, "  {:<16} {:>9.3}", stage, seconds);
        }

        let _ = writeln!(out, "\nTop {} slow tasks:", top);
        for (index, task) in self.summary.top_20_slowest_tasks.iter().take(top).enumerate() {
            let _ = writeln!(
                out,
                "  {:02}. {:>8.3}s | {:<11} | {:<12} | {}",
                index + 1,
                task.duration_seconds.unwrap_or(0.0),
                task.stage.as_deref().unwrap_or(MISSING),
                task.host.as_deref().unwrap_or(MISSING),
                task.task_name.as_deref().unwrap_or(MISSING)
            );
        }

        out
    }
}
