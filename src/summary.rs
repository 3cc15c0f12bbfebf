//! End-of-run summary: per-stage totals and the slowest tasks
//!
//! Built once from the aggregator's in-memory records and persisted as
//! `timing_summary.json`, the only channel to the report tool.

use crate::error::{Result, TimingError};
use crate::record::{round_micros, TimingRecord};
use crate::stage::Stage;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

pub const SUMMARY_FILE: &str = "timing_summary.json";

/// Number of records kept in `top_20_slowest_tasks`
pub const TOP_SLOWEST: usize = 20;

/// Persisted summary of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub benchmark_run_dir: String,
    pub total_wall_seconds: f64,
    /// Stage label -> seconds, ordered by label
    pub stage_totals_seconds: BTreeMap<String, f64>,
    pub task_count: usize,
    pub top_20_slowest_tasks: Vec<TimingRecord>,
}

impl RunSummary {
    /// Derive the summary from a run's records and stage totals
    pub fn build(
        records: &[TimingRecord],
        stage_totals: &HashMap<Stage, f64>,
        run_dir: &Path,
        wall_seconds: f64,
    ) -> Self {
        Self {
            benchmark_run_dir: run_dir.display().to_string(),
            total_wall_seconds: round_micros(wall_seconds.max(0.0)),
            stage_totals_seconds: stage_totals
                .iter()
                .map(|(stage, seconds)| (stage.as_str().to_string(), round_micros(*seconds)))
                .collect(),
            task_count: records.len(),
            top_20_slowest_tasks: slowest(records, TOP_SLOWEST),
        }
    }

    /// Serialize with 2-space indentation and sorted keys
    pub fn to_pretty_json(&self) -> Result<String> {
        let value = serde_json::to_value(self)?;
        Ok(serde_json::to_string_pretty(&value)?)
    }

    /// Write `timing_summary.json` into `run_dir`, replacing any previous summary
    pub fn write_to(&self, run_dir: &Path) -> Result<()> {
        let path = run_dir.join(SUMMARY_FILE);
        let mut json = self.to_pretty_json()?;
        json.push('\n');
        fs::write(&path, json).map_err(|source| TimingError::Write { path, source })
    }

    /// Console lines announcing a written summary
    pub fn announcement(&self, summary_path: &Path) -> Vec<String> {
        let mut lines = vec![format!(
            "benchmark timing summary written to {}",
            summary_path.display()
        )];
        if !self.top_20_slowest_tasks.is_empty() {
            lines.push(format!("Top {} slowest tasks (seconds):", TOP_SLOWEST));
            for (index, task) in self.top_20_slowest_tasks.iter().enumerate() {
                lines.push(format!(
                    "{:02}. {:.3}s | {} | {} | {}",
                    index + 1,
                    task.duration_seconds,
                    task.stage,
                    task.host,
                    task.task_name
                ));
            }
        }
        lines
    }
}

/// The `limit` slowest records, descending; equal durations keep arrival order
pub fn slowest(records: &[TimingRecord], limit: usize) -> Vec<TimingRecord> {
    let mut sorted: Vec<&TimingRecord> = records.iter().collect();
    // sort_by is stable
    sorted.sort_by(|a, b| b.duration_seconds.total_cmp(&a.duration_seconds));
    sorted.into_iter().take(limit).cloned().collect()
}
