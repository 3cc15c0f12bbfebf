//! Lifecycle event log replay
//!
//! An out-of-process runtime can record its task lifecycle as JSON lines and
//! have them replayed through a `TimingAggregator`:
//!
//! ```text
//! {"event":"play_start","name":"Provision VMs"}
//! {"event":"task_start","host":"vm-1","task_id":"7f3a","at":0.0}
//! {"event":"task_complete","host":"vm-1","task_id":"7f3a","name":"Create disk","path":"tasks/provision-instances.yml:14","action":"command","status":"ok","at":4.2}
//! {"event":"run_end"}
//! ```
//!
//! `at` is seconds on the run's monotonic timeline. Events without `at`
//! reuse the most recent reading.

use crate::aggregator::{TaskSource, TimingAggregator};
use crate::clock::ManualClock;
use crate::record::TaskStatus;
use crate::summary::RunSummary;
use serde::{Deserialize, Serialize};
use std::io::BufRead;

/// One recorded lifecycle event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    PlayStart {
        #[serde(default)]
        name: Option<String>,
    },
    TaskStart {
        #[serde(default)]
        host: Option<String>,
        #[serde(default)]
        task_id: Option<String>,
        #[serde(default)]
        at: Option<f64>,
    },
    TaskComplete {
        #[serde(default)]
        host: Option<String>,
        #[serde(default)]
        task_id: Option<String>,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        path: Option<String>,
        #[serde(default)]
        action: Option<String>,
        status: TaskStatus,
        #[serde(default)]
        at: Option<f64>,
    },
    RunEnd,
}

/// Borrowed view of the task fields of an event
#[derive(Debug, Clone, Copy, Default)]
struct EventTask<'e> {
    task_id: Option<&'e str>,
    name: Option<&'e str>,
    path: Option<&'e str>,
    action: Option<&'e str>,
}

impl TaskSource for EventTask<'_> {
    fn execution_id(&self) -> Option<&str> {
        self.task_id
    }

    fn name(&self) -> Option<&str> {
        self.name
    }

    fn path(&self) -> Option<&str> {
        self.path
    }

    fn action(&self) -> Option<&str> {
        self.action
    }
}

impl LifecycleEvent {
    /// Parse one line of an event log
    pub fn from_line(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }
}

/// Counters from a replay
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplayOutcome {
    pub events: usize,
    pub skipped_lines: usize,
    /// Present when the run was ended during this replay
    pub summary: Option<RunSummary>,
}

/// Feeds recorded events into an aggregator, driving its clock from `at`
pub struct Replayer<'a> {
    aggregator: &'a TimingAggregator,
    clock: ManualClock,
}

impl<'a> Replayer<'a> {
    /// `clock` must be the clock the aggregator was built with
    pub fn new(aggregator: &'a TimingAggregator, clock: ManualClock) -> Self {
        Self { aggregator, clock }
    }

    /// Apply a single event; returns the summary if this event ended the run
    pub fn apply(&self, event: &LifecycleEvent) -> Option<RunSummary> {
        match event {
            LifecycleEvent::PlayStart { name } => {
                self.aggregator.on_group_start(name.as_deref());
                None
            }
            LifecycleEvent::TaskStart { host, task_id, at } => {
                let task = EventTask {
                    task_id: task_id.as_deref(),
                    ..Default::default()
                };
                self.advance_to(*at);
                self.aggregator.on_task_start(host.as_deref(), &task);
                None
            }
            LifecycleEvent::TaskComplete {
                host,
                task_id,
                name,
                path,
                action,
                status,
                at,
            } => {
                let task = EventTask {
                    task_id: task_id.as_deref(),
                    name: name.as_deref(),
                    path: path.as_deref(),
                    action: action.as_deref(),
                };
                self.advance_to(*at);
                self.aggregator
                    .on_task_complete(host.as_deref(), &task, *status);
                None
            }
            LifecycleEvent::RunEnd => self.aggregator.on_run_end(),
        }
    }

    /// Replay an event log; the run is ended at EOF if no `run_end` was seen
    pub fn replay<R: BufRead>(&self, reader: R) -> std::io::Result<ReplayOutcome> {
        let mut outcome = ReplayOutcome::default();

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match LifecycleEvent::from_line(trimmed) {
                Ok(event) => {
                    outcome.events += 1;
                    if let Some(summary) = self.apply(&event) {
                        outcome.summary = Some(summary);
                    }
                }
                Err(e) => {
                    outcome.skipped_lines += 1;
                    tracing::warn!("Skipping event log line {}: {}", index + 1, e);
                }
            }
        }

        if outcome.summary.is_none() {
            outcome.summary = self.aggregator.on_run_end();
        }
        Ok(outcome)
    }

    fn advance_to(&self, at: Option<f64>) {
        if let Some(seconds) = at {
            self.clock.set_seconds(seconds);
        }
    }
}
