//! Timing-event aggregation for orchestration runs
//!
//! `TimingAggregator` receives task lifecycle events from the runtime's
//! executor threads, pairs each completion with its start by
//! `(host, task execution id)`, and produces one `TimingRecord` per
//! completion. Records are written through an `EventSink` as they arrive and
//! summarized into `timing_summary.json` when the run ends.
//!
//! All mutable state lives behind one mutex, so every handler is a single
//! critical section. A disabled aggregator holds no state and opens no files.

use crate::clock::{Clock, MonotonicClock};
use crate::config::BenchmarkConfig;
use crate::error::{Result, TimingError};
use crate::record::{round_micros, sanitize_text, TaskStatus, TimingRecord, UNKNOWN_HOST};
use crate::sink::EventSink;
use crate::stage::Stage;
use crate::summary::{RunSummary, SUMMARY_FILE};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, SystemTime};

/// The parts of a runtime task object the aggregator reads
///
/// Every accessor may return `None`; missing values fall back to empty
/// strings when the record is built.
pub trait TaskSource {
    /// Identifier of this task execution, shared by its start and completion
    fn execution_id(&self) -> Option<&str>;
    fn name(&self) -> Option<&str>;
    /// Source locator, e.g. `roles/vm/tasks/ping.yml:12`
    fn path(&self) -> Option<&str>;
    /// Short name of the underlying operation
    fn action(&self) -> Option<&str>;
}

/// Plain owned task description
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskInfo {
    pub execution_id: Option<String>,
    pub name: Option<String>,
    pub path: Option<String>,
    pub action: Option<String>,
}

impl TaskInfo {
    pub fn new(execution_id: impl Into<String>) -> Self {
        Self {
            execution_id: Some(execution_id.into()),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }
}

impl TaskSource for TaskInfo {
    fn execution_id(&self) -> Option<&str> {
        self.execution_id.as_deref()
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }
}

/// Correlation key for a pending start
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TaskKey {
    host: String,
    execution_id: String,
}

impl TaskKey {
    fn resolve<T: TaskSource + ?Sized>(host: Option<&str>, task: &T) -> Self {
        Self {
            host: host.unwrap_or(UNKNOWN_HOST).to_string(),
            execution_id: task.execution_id().unwrap_or_default().to_string(),
        }
    }
}

/// Mutable state of an enabled aggregator
#[derive(Debug)]
struct RunState {
    pending: HashMap<TaskKey, Duration>,
    records: Vec<TimingRecord>,
    stage_totals: HashMap<Stage, f64>,
    play_name: String,
    sink: EventSink,
    finished: bool,
}

struct ActiveRun {
    run_dir: PathBuf,
    started_at: SystemTime,
    clock: Box<dyn Clock>,
    state: Mutex<RunState>,
}

impl ActiveRun {
    fn lock(&self) -> MutexGuard<'_, RunState> {
        // A panicking caller must not disable timing for the rest of the run
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Collects per-task timings for one run
pub struct TimingAggregator {
    run: Option<ActiveRun>,
}

impl std::fmt::Debug for TimingAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimingAggregator")
            .field("enabled", &self.is_enabled())
            .field("run_dir", &self.run_dir())
            .finish()
    }
}

impl TimingAggregator {
    /// Start a run using the real monotonic clock
    pub fn new(config: BenchmarkConfig) -> Result<Self> {
        Self::with_clock(config, MonotonicClock::new())
    }

    /// Start a run with an explicit monotonic clock
    ///
    /// When enabled, creates the run directory and opens both timing files;
    /// this is the only point where the aggregator can fail.
    pub fn with_clock<C: Clock + 'static>(config: BenchmarkConfig, clock: C) -> Result<Self> {
        if !config.enabled {
            return Ok(Self { run: None });
        }

        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let run_dir = config.resolve_run_dir(&cwd, chrono::Utc::now());
        fs::create_dir_all(&run_dir).map_err(|source| TimingError::CreateRunDir {
            path: run_dir.clone(),
            source,
        })?;
        let sink = EventSink::open(&run_dir)?;

        tracing::debug!("Benchmark timing enabled, writing to {}", run_dir.display());

        Ok(Self {
            run: Some(ActiveRun {
                run_dir,
                started_at: SystemTime::now(),
                clock: Box::new(clock),
                state: Mutex::new(RunState {
                    pending: HashMap::new(),
                    records: Vec::new(),
                    stage_totals: HashMap::new(),
                    play_name: String::new(),
                    sink,
                    finished: false,
                }),
            }),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.run.is_some()
    }

    /// Output directory of this run, `None` when disabled
    pub fn run_dir(&self) -> Option<&Path> {
        self.run.as_ref().map(|run| run.run_dir.as_path())
    }

    /// Path the summary is written to at run end
    pub fn summary_path(&self) -> Option<PathBuf> {
        self.run_dir().map(|dir| dir.join(SUMMARY_FILE))
    }

    /// A new play (group of tasks) started
    pub fn on_group_start(&self, name: Option<&str>) {
        let Some(run) = &self.run else { return };
        let play_name = sanitize_text(name);
        tracing::debug!("Play started: {}", play_name);
        run.lock().play_name = play_name;
    }

    /// A task started on a host; a repeated key overwrites the earlier start
    pub fn on_task_start<T: TaskSource + ?Sized>(&self, host: Option<&str>, task: &T) {
        let Some(run) = &self.run else { return };
        let key = TaskKey::resolve(host, task);
        let started = run.clock.now();

        let mut state = run.lock();
        if state.pending.insert(key.clone(), started).is_some() {
            tracing::debug!(
                "Duplicate start for task {} on {}, keeping latest",
                key.execution_id,
                key.host
            );
        }
    }

    /// A task finished on a host with the given outcome
    ///
    /// Never fails: a missing start yields a `0.0` duration and unresolvable
    /// fields become empty strings. Sink write errors are logged and dropped.
    pub fn on_task_complete<T: TaskSource + ?Sized>(
        &self,
        host: Option<&str>,
        task: &T,
        status: TaskStatus,
    ) {
        let Some(run) = &self.run else { return };
        let key = TaskKey::resolve(host, task);
        let task_path = sanitize_text(task.path());
        let stage = Stage::classify(&task_path);
        let task_name = sanitize_text(task.name());
        let task_action = sanitize_text(task.action());

        let mut state = run.lock();
        let ended = run.clock.now();
        let duration_seconds = match state.pending.remove(&key) {
            Some(started) => round_micros(ended.saturating_sub(started).as_secs_f64()),
            None => {
                tracing::debug!(
                    "No start recorded for task {} on {}, duration defaults to 0",
                    key.execution_id,
                    key.host
                );
                0.0
            }
        };

        let record = TimingRecord {
            task_name,
            status,
            duration_seconds,
            host: key.host,
            stage,
            play_name: state.play_name.clone(),
            task_path,
            task_action,
        };

        *state.stage_totals.entry(stage).or_insert(0.0) += record.duration_seconds;
        if let Err(e) = state.sink.append(&record) {
            tracing::warn!("Failed to persist timing record: {}", e);
        }
        state.records.push(record);
    }

    /// Finish the run: write the summary and close the timing files
    ///
    /// Returns the summary on the first call only; later calls and disabled
    /// aggregators return `None`.
    pub fn on_run_end(&self) -> Option<RunSummary> {
        let run = self.run.as_ref()?;
        let mut state = run.lock();
        if state.finished {
            return None;
        }
        state.finished = true;

        let wall_seconds = run
            .started_at
            .elapsed()
            .map(|elapsed| elapsed.as_secs_f64())
            .unwrap_or(0.0);
        let summary = RunSummary::build(
            &state.records,
            &state.stage_totals,
            &run.run_dir,
            wall_seconds,
        );

        match summary.write_to(&run.run_dir) {
            Ok(()) => tracing::info!(
                "Timing summary for {} tasks written to {}",
                summary.task_count,
                run.run_dir.join(SUMMARY_FILE).display()
            ),
            Err(e) => tracing::warn!("Failed to write timing summary: {}", e),
        }

        state.sink.close();
        Some(summary)
    }

    /// Snapshot of all records produced so far, in completion order
    pub fn records(&self) -> Vec<TimingRecord> {
        self.run
            .as_ref()
            .map(|run| run.lock().records.clone())
            .unwrap_or_default()
    }

    /// Running per-stage totals
    pub fn stage_totals(&self) -> HashMap<Stage, f64> {
        self.run
            .as_ref()
            .map(|run| run.lock().stage_totals.clone())
            .unwrap_or_default()
    }

    /// Number of starts still waiting for a completion
    pub fn pending_count(&self) -> usize {
        self.run
            .as_ref()
            .map(|run| run.lock().pending.len())
            .unwrap_or(0)
    }
}

impl Drop for TimingAggregator {
    fn drop(&mut self) {
        if let Some(run) = &self.run {
            run.lock().sink.close();
        }
    }
}
