//! tasktime - per-task timing aggregation for orchestration runs
//!
//! This library instruments a multi-host task run: it pairs task start and
//! completion events per host, classifies tasks into pipeline stages, writes
//! every timing as JSON lines and CSV, and summarizes the slowest tasks when
//! the run ends. A report renderer turns the persisted summary into a
//! terminal report.

pub mod aggregator;
pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod record;
pub mod report;
pub mod sink;
pub mod stage;
pub mod summary;

pub use aggregator::{TaskInfo, TaskSource, TimingAggregator};
pub use config::BenchmarkConfig;
pub use record::{TaskStatus, TimingRecord};
pub use stage::Stage;
pub use summary::RunSummary;
