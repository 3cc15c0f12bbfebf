//! Task path to pipeline stage classification
//!
//! Stages are derived from the task file a task was declared in. Matching is
//! an ordered substring search: the first marker found in the path wins.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse pipeline phase a task belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Preflight,
    ImageCache,
    Provision,
    Runtime,
    Cleanup,
    Ping,
    /// Catch-all for paths matching no marker
    Other,
}

/// Ordered classification table. Order is significant.
pub const STAGE_RULES: [(&str, Stage); 6] = [
    ("tasks/provision-preflight.yml", Stage::Preflight),
    ("tasks/provision-image-cache.yml", Stage::ImageCache),
    ("tasks/provision-instances.yml", Stage::Provision),
    ("tasks/provision-runtime.yml", Stage::Runtime),
    ("tasks/cleanup.yml", Stage::Cleanup),
    ("tasks/ping.yml", Stage::Ping),
];

impl Stage {
    /// Every stage label, in table order followed by the catch-all
    pub const ALL: [Stage; 7] = [
        Stage::Preflight,
        Stage::ImageCache,
        Stage::Provision,
        Stage::Runtime,
        Stage::Cleanup,
        Stage::Ping,
        Stage::Other,
    ];

    /// Classify a task source path
    pub fn classify(task_path: &str) -> Self {
        STAGE_RULES
            .iter()
            .find(|(marker, _)| task_path.contains(marker))
            .map(|&(_, stage)| stage)
            .unwrap_or(Stage::Other)
    }

    /// Label used in every output format
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Preflight => "preflight",
            Stage::ImageCache => "image-cache",
            Stage::Provision => "provision",
            Stage::Runtime => "runtime",
            Stage::Cleanup => "cleanup",
            Stage::Ping => "ping",
            Stage::Other => "other",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
