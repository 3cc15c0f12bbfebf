//! Per-task timing records
//!
//! One `TimingRecord` is produced for every completed task execution on one
//! host. Every field is always populated; unresolvable inputs fall back to
//! empty strings, `"unknown"` for the host, and `0.0` for the duration.

use crate::stage::Stage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Host label used when the originating host cannot be resolved
pub const UNKNOWN_HOST: &str = "unknown";

/// CSV column order, matching the field order of `TimingRecord`
pub const RECORD_FIELDS: [&str; 8] = [
    "task_name",
    "status",
    "duration_seconds",
    "host",
    "stage",
    "play_name",
    "task_path",
    "task_action",
];

/// Final outcome of a task on one host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Ok,
    Failed,
    Unreachable,
    Skipped,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Ok => "ok",
            TaskStatus::Failed => "failed",
            TaskStatus::Unreachable => "unreachable",
            TaskStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Timing of a single completed task execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingRecord {
    pub task_name: String,
    pub status: TaskStatus,
    /// Seconds, rounded to microseconds, never negative
    pub duration_seconds: f64,
    pub host: String,
    pub stage: Stage,
    pub play_name: String,
    pub task_path: String,
    pub task_action: String,
}

impl TimingRecord {
    /// Field values in `RECORD_FIELDS` order, as written to the CSV file
    pub fn csv_values(&self) -> [String; 8] {
        [
            self.task_name.clone(),
            self.status.as_str().to_string(),
            format_seconds(self.duration_seconds),
            self.host.clone(),
            self.stage.as_str().to_string(),
            self.play_name.clone(),
            self.task_path.clone(),
            self.task_action.clone(),
        ]
    }

    /// Serialize as a single JSON line with keys in sorted order
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        // serde_json::Value keeps object keys in a BTreeMap
        let value = serde_json::to_value(self)?;
        serde_json::to_string(&value)
    }
}

/// Replace newlines with spaces and trim; `None` becomes an empty string
pub fn sanitize_text(value: Option<&str>) -> String {
    match value {
        Some(text) => text.replace('\n', " ").trim().to_string(),
        None => String::new(),
    }
}

/// Round seconds to 6 decimal places
pub fn round_micros(seconds: f64) -> f64 {
    (seconds * 1_000_000.0).round() / 1_000_000.0
}

/// Format seconds the way they appear in JSON (`0.0`, `1.25`)
pub fn format_seconds(seconds: f64) -> String {
    if seconds.is_finite() && seconds.fract() == 0.0 {
        format!("{:.1}", seconds)
    } else {
        seconds.to_string()
    }
}
