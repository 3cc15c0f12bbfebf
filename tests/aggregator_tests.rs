// Integration tests for the timing aggregator: concurrency, durable output,
// append semantics across runs, and the disabled mode.

use std::collections::HashMap;
use std::fs;
use std::sync::Arc;
use std::thread;
use tasktime::clock::ManualClock;
use tasktime::record::{round_micros, RECORD_FIELDS};
use tasktime::sink::{CSV_FILE, JSONL_FILE};
use tasktime::summary::SUMMARY_FILE;
use tasktime::{BenchmarkConfig, RunSummary, Stage, TaskInfo, TaskStatus, TimingAggregator, TimingRecord};
use tempfile::TempDir;

const STAGE_PATHS: [&str; 4] = [
    "roles/kvm/tasks/provision-preflight.yml:4",
    "roles/kvm/tasks/provision-instances.yml:22",
    "roles/kvm/tasks/cleanup.yml:8",
    "site.yml:1",
];

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn test_concurrent_hosts_produce_every_record() {
    let dir = TempDir::new().unwrap();
    let aggregator = Arc::new(
        TimingAggregator::new(BenchmarkConfig::enabled().with_run_dir(dir.path())).unwrap(),
    );
    aggregator.on_group_start(Some("Provision fleet"));

    let hosts = 8;
    let tasks_per_host = 50;

    let handles: Vec<_> = (0..hosts)
        .map(|h| {
            let aggregator = Arc::clone(&aggregator);
            thread::spawn(move || {
                let host = format!("host-{}", h);
                for t in 0..tasks_per_host {
                    // Every host runs the same task ids, like a play fanning out
                    let task = TaskInfo::new(format!("task-{}", t))
                        .with_name(format!("Step {}", t))
                        .with_path(STAGE_PATHS[t % STAGE_PATHS.len()])
                        .with_action("command");
                    aggregator.on_task_start(Some(host.as_str()), &task);
                    aggregator.on_task_complete(Some(host.as_str()), &task, TaskStatus::Ok);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let total = hosts * tasks_per_host;
    assert_eq!(aggregator.records().len(), total);
    assert_eq!(aggregator.pending_count(), 0);

    let summary = aggregator.on_run_end().unwrap();
    assert_eq!(summary.task_count, total);

    let jsonl = fs::read_to_string(dir.path().join(JSONL_FILE)).unwrap();
    assert_eq!(jsonl.lines().count(), total);
    for line in jsonl.lines() {
        let record: TimingRecord = serde_json::from_str(line).unwrap();
        assert!(record.duration_seconds >= 0.0);
        assert_eq!(record.play_name, "Provision fleet");
        assert!(record.host.starts_with("host-"));
    }

    let csv = fs::read_to_string(dir.path().join(CSV_FILE)).unwrap();
    assert_eq!(csv.lines().count(), total + 1);
}

#[test]
fn test_interleaved_out_of_order_events() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::new();
    let aggregator = TimingAggregator::with_clock(
        BenchmarkConfig::enabled().with_run_dir(dir.path()),
        clock.clone(),
    )
    .unwrap();
    let task = TaskInfo::new("uuid-1").with_path(STAGE_PATHS[1]);

    // Starts for three hosts, completions in reverse order
    for (seconds, host) in [(0.0, "a"), (0.5, "b"), (1.0, "c")] {
        clock.set_seconds(seconds);
        aggregator.on_task_start(Some(host), &task);
    }
    for (seconds, host) in [(2.0, "c"), (3.0, "b"), (4.0, "a")] {
        clock.set_seconds(seconds);
        aggregator.on_task_complete(Some(host), &task, TaskStatus::Ok);
    }

    let by_host: HashMap<String, f64> = aggregator
        .records()
        .into_iter()
        .map(|r| (r.host, r.duration_seconds))
        .collect();
    assert_eq!(by_host["a"], 4.0);
    assert_eq!(by_host["b"], 2.5);
    assert_eq!(by_host["c"], 1.0);
}

// ============================================================================
// Summary
// ============================================================================

#[test]
fn test_twenty_five_tasks_summary() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::new();
    let aggregator = TimingAggregator::with_clock(
        BenchmarkConfig::enabled().with_run_dir(dir.path()),
        clock.clone(),
    )
    .unwrap();

    for i in 0..25 {
        let task = TaskInfo::new(format!("t{}", i)).with_name(format!("task {}", i));
        clock.set_seconds(0.0);
        aggregator.on_task_start(Some("hostA"), &task);
        // Distinct durations, not in sorted order
        clock.set_seconds(((i * 7) % 25) as f64 + 0.125);
        aggregator.on_task_complete(Some("hostA"), &task, TaskStatus::Ok);
    }

    aggregator.on_run_end().unwrap();

    let text = fs::read_to_string(dir.path().join(SUMMARY_FILE)).unwrap();
    let summary: RunSummary = serde_json::from_str(&text).unwrap();
    assert_eq!(summary.task_count, 25);
    assert_eq!(summary.top_20_slowest_tasks.len(), 20);
    assert_eq!(summary.top_20_slowest_tasks[0].duration_seconds, 24.125);
    assert!(summary
        .top_20_slowest_tasks
        .windows(2)
        .all(|w| w[0].duration_seconds > w[1].duration_seconds));
    assert_eq!(summary.benchmark_run_dir, dir.path().display().to_string());
    assert!(summary.total_wall_seconds >= 0.0);
}

#[test]
fn test_stage_totals_match_record_sums() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::new();
    let aggregator = TimingAggregator::with_clock(
        BenchmarkConfig::enabled().with_run_dir(dir.path()),
        clock.clone(),
    )
    .unwrap();

    for i in 0..12 {
        let task = TaskInfo::new(format!("t{}", i)).with_path(STAGE_PATHS[i % STAGE_PATHS.len()]);
        clock.set_seconds(i as f64);
        aggregator.on_task_start(Some("h"), &task);
        clock.set_seconds(i as f64 * 1.5 + 0.333333);
        aggregator.on_task_complete(Some("h"), &task, TaskStatus::Ok);
    }

    let records = aggregator.records();
    let summary = aggregator.on_run_end().unwrap();

    for stage in Stage::ALL {
        let sum: f64 = records
            .iter()
            .filter(|r| r.stage == stage)
            .map(|r| r.duration_seconds)
            .sum();
        match summary.stage_totals_seconds.get(stage.as_str()) {
            Some(total) => assert_eq!(*total, round_micros(sum), "stage {}", stage),
            None => assert!(records.iter().all(|r| r.stage != stage)),
        }
    }
}

// ============================================================================
// Durable, append-only output
// ============================================================================

#[test]
fn test_rerun_in_same_directory_appends() {
    let dir = TempDir::new().unwrap();

    for run in 0..3 {
        let aggregator =
            TimingAggregator::new(BenchmarkConfig::enabled().with_run_dir(dir.path())).unwrap();
        aggregator.on_task_complete(
            Some("h"),
            &TaskInfo::new(format!("run-{}", run)),
            TaskStatus::Skipped,
        );
        aggregator.on_run_end();
    }

    let csv = fs::read_to_string(dir.path().join(CSV_FILE)).unwrap();
    let header = RECORD_FIELDS.join(",");
    assert_eq!(csv.lines().filter(|line| *line == header).count(), 1);
    assert_eq!(csv.lines().count(), 4);

    let jsonl = fs::read_to_string(dir.path().join(JSONL_FILE)).unwrap();
    assert_eq!(jsonl.lines().count(), 3);

    // The summary only describes the latest run
    let summary: RunSummary =
        serde_json::from_str(&fs::read_to_string(dir.path().join(SUMMARY_FILE)).unwrap())
            .unwrap();
    assert_eq!(summary.task_count, 1);
}

#[test]
fn test_records_visible_without_run_end() {
    let dir = TempDir::new().unwrap();
    let aggregator =
        TimingAggregator::new(BenchmarkConfig::enabled().with_run_dir(dir.path())).unwrap();
    aggregator.on_task_complete(Some("h"), &TaskInfo::new("t"), TaskStatus::Failed);

    // Aborted run: no run end, but the record is already on disk
    let jsonl = fs::read_to_string(dir.path().join(JSONL_FILE)).unwrap();
    assert!(jsonl.contains("\"status\":\"failed\""));
    assert!(!dir.path().join(SUMMARY_FILE).exists());
}

// ============================================================================
// Disabled mode
// ============================================================================

#[test]
fn test_disabled_creates_no_files() {
    let dir = TempDir::new().unwrap();
    let run_dir = dir.path().join("run");
    let aggregator =
        TimingAggregator::new(BenchmarkConfig::disabled().with_run_dir(&run_dir)).unwrap();

    aggregator.on_group_start(Some("play"));
    for i in 0..10 {
        let task = TaskInfo::new(i.to_string());
        aggregator.on_task_start(Some("h"), &task);
        aggregator.on_task_complete(Some("h"), &task, TaskStatus::Ok);
    }
    assert!(aggregator.on_run_end().is_none());

    assert!(!run_dir.exists());
    assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
    assert!(aggregator.records().is_empty());
    assert!(aggregator.stage_totals().is_empty());
}
