//! Stopwatch session model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::time_utils::format_elapsed;

/// Description used when a session is saved without one.
pub const UNTITLED_DESCRIPTION: &str = "Untitled Action";

/// Saved stopwatch session stored at `users/{uid}/timers/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerEntry {
    /// Generated at save time; older documents fall back to the document ID
    #[serde(default)]
    pub id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub elapsed_seconds: f64,
    /// Assigned by the backend when the entry is written
    pub saved_at: DateTime<Utc>,
    #[serde(default)]
    pub description: String,
}

impl TimerEntry {
    pub fn elapsed(&self) -> Duration {
        Duration::try_from_secs_f64(self.elapsed_seconds).unwrap_or_default()
    }

    /// Elapsed time as `MM:SS.cc`.
    pub fn formatted_elapsed(&self) -> String {
        format_elapsed(self.elapsed())
    }
}
