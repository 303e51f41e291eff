//! Session outcome reporting
//!
//! Outcomes are stored in resolved order, never completion order, so a
//! report reads like the playlist it came from.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use url::Url;

use crate::app::manifest::SegmentRef;

/// Final state of one segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SegmentStatus {
    /// Written to disk
    Succeeded { path: PathBuf },
    /// Gave up after the retry budget or on cancellation
    Failed { error: String },
}

/// Outcome of one distinct segment
#[derive(Debug, Clone, Serialize)]
pub struct SegmentOutcome {
    pub file_name: String,
    pub url: Url,
    pub status: SegmentStatus,
}

impl SegmentOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, SegmentStatus::Succeeded { .. })
    }
}

/// Event sent on the progress channel as each segment finishes
#[derive(Debug, Clone, Serialize)]
pub struct SegmentProgress {
    pub file_name: String,
    pub succeeded: bool,
    /// Segments finished so far, this one included
    pub completed: usize,
    pub total: usize,
}

/// Final result of a download session
#[derive(Debug, Clone, Serialize)]
pub struct SessionResult {
    /// Root manifest URL as requested
    pub manifest_url: Url,
    /// Every resolved segment reference, duplicates included
    pub segments: Vec<SegmentRef>,
    /// One outcome per distinct segment, in resolved order
    pub outcomes: Vec<SegmentOutcome>,
    pub succeeded: usize,
    pub failed: usize,
    /// Whether the session was cancelled before it finished
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed: Duration,
}

impl SessionResult {
    /// True when every distinct segment was written
    pub fn is_complete(&self) -> bool {
        self.failed == 0 && !self.cancelled
    }

    /// Outcomes that did not succeed, in resolved order
    pub fn failures(&self) -> impl Iterator<Item = &SegmentOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.is_success())
    }

    /// Percentage of distinct segments written
    pub fn success_rate(&self) -> f64 {
        if self.outcomes.is_empty() {
            return 100.0;
        }
        (self.succeeded as f64 / self.outcomes.len() as f64) * 100.0
    }
}
