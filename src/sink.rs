//! Durable per-record output: JSON lines and CSV
//!
//! Both files are opened once in append mode and held for the whole run.
//! Every record is written and flushed before `append` returns, so a
//! completed task is on disk even if the process dies right after.

use crate::error::{Result, TimingError};
use crate::record::{TimingRecord, RECORD_FIELDS};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const JSONL_FILE: &str = "task_timings.jsonl";
pub const CSV_FILE: &str = "task_timings.csv";

const CSV_LINE_END: &str = "\r\n";

/// An open append-only destination
#[derive(Debug)]
struct Destination {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl Destination {
    fn open(path: PathBuf) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| TimingError::OpenSink {
                path: path.clone(),
                source,
            })?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    fn is_empty(&self) -> Result<bool> {
        let len = self
            .writer
            .get_ref()
            .metadata()
            .map_err(|source| TimingError::OpenSink {
                path: self.path.clone(),
                source,
            })?
            .len();
        Ok(len == 0)
    }

    fn write_line(&mut self, line: &str, line_end: &str) -> Result<()> {
        self.writer
            .write_all(line.as_bytes())
            .and_then(|_| self.writer.write_all(line_end.as_bytes()))
            .and_then(|_| self.writer.flush())
            .map_err(|source| TimingError::Write {
                path: self.path.clone(),
                source,
            })
    }
}

/// Writer for the two per-record timing files of a run
#[derive(Debug)]
pub struct EventSink {
    jsonl: Option<Destination>,
    csv: Option<Destination>,
}

impl EventSink {
    /// Open (or create) both timing files under `run_dir`
    ///
    /// The CSV header is written only if the CSV file is empty, so repeated
    /// runs against the same directory accumulate rows under one header.
    pub fn open(run_dir: &Path) -> Result<Self> {
        let jsonl = Destination::open(run_dir.join(JSONL_FILE))?;
        let mut csv = Destination::open(run_dir.join(CSV_FILE))?;

        if csv.is_empty()? {
            csv.write_line(&RECORD_FIELDS.join(","), CSV_LINE_END)?;
        }

        Ok(Self {
            jsonl: Some(jsonl),
            csv: Some(csv),
        })
    }

    /// Append one record to both files. A no-op once the sink is closed.
    pub fn append(&mut self, record: &TimingRecord) -> Result<()> {
        if let Some(jsonl) = self.jsonl.as_mut() {
            jsonl.write_line(&record.to_json_line()?, "\n")?;
        }
        if let Some(csv) = self.csv.as_mut() {
            csv.write_line(&format_csv_row(record), CSV_LINE_END)?;
        }
        Ok(())
    }

    /// Release both files. Safe to call more than once.
    pub fn close(&mut self) {
        for destination in [self.jsonl.take(), self.csv.take()].into_iter().flatten() {
            let Destination { path, mut writer } = destination;
            if let Err(e) = writer.flush() {
                tracing::warn!("Failed to flush {}: {}", path.display(), e);
            }
        }
    }

    pub fn is_open(&self) -> bool {
        self.jsonl.is_some() || self.csv.is_some()
    }
}

/// Format a record as one CSV row (without line terminator)
pub fn format_csv_row(record: &TimingRecord) -> String {
    record
        .csv_values()
        .iter()
        .map(|value| escape_field(value))
        .collect::<Vec<_>>()
        .join(",")
}

/// Escape CSV field (handle commas, quotes, line breaks)
fn escape_field(field: &str) -> String {
    if field.contains(&[',', '"', '\n', '\r'][..]) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
