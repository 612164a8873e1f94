// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Task and section models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::not_blank;

/// Section every task without an explicit section belongs to.
pub const DEFAULT_SECTION: &str = "Inbox";

/// A to-do item stored at `users/{uid}/tasks/{id}`.
///
/// `date_completed` is set exactly when `is_complete` is true; use
/// [`Task::completed`] and [`Task::reopened`] to change completion state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_complete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_completed: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
}

impl Task {
    /// Build a new incomplete task with a fresh ID.
    pub fn new(input: NewTask) -> Self {
        let section = input
            .section
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SECTION.to_string());

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: input.title.trim().to_string(),
            description: input.description.filter(|d| !d.trim().is_empty()),
            is_complete: false,
            due_date: input.due_date,
            date_completed: None,
            section: Some(section),
        }
    }

    /// Section label, falling back to [`DEFAULT_SECTION`].
    pub fn section_name(&self) -> &str {
        self.section.as_deref().unwrap_or(DEFAULT_SECTION)
    }

    /// Copy of this task marked complete at `now`.
    pub fn completed(&self, now: DateTime<Utc>) -> Self {
        Self {
            is_complete: true,
            date_completed: Some(now),
            ..self.clone()
        }
    }

    /// Copy of this task marked incomplete.
    pub fn reopened(&self) -> Self {
        Self {
            is_complete: false,
            date_completed: None,
            ..self.clone()
        }
    }
}

/// Input for creating a task.
#[derive(Debug, Clone, Default, Validate)]
pub struct NewTask {
    #[validate(custom(function = "not_blank", message = "Task title must not be empty"))]
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub section: Option<String>,
}

impl NewTask {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

/// Named task grouping stored at `users/{uid}/sections/{name}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Section {
    #[validate(custom(function = "not_blank", message = "Section name must not be empty"))]
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_new_task_defaults_to_inbox() {
        let task = Task::new(NewTask::titled("  Buy milk "));
        assert_eq!(task.title, "Buy milk");
        assert_eq!(task.section_name(), DEFAULT_SECTION);
        assert!(!task.is_complete);
        assert!(task.date_completed.is_none());
    }

    #[test]
    fn test_blank_section_falls_back_to_inbox() {
        let task = Task::new(NewTask {
            section: Some("   ".to_string()),
            ..NewTask::titled("Call mom")
        });
        assert_eq!(task.section.as_deref(), Some(DEFAULT_SECTION));
    }

    #[test]
    fn test_completion_keeps_other_fields() {
        let due = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 2, 27, 18, 30, 0).unwrap();
        let task = Task::new(NewTask {
            due_date: Some(due),
            section: Some("Errands".to_string()),
            ..NewTask::titled("Post office")
        });

        let done = task.completed(now);
        assert!(done.is_complete);
        assert_eq!(done.date_completed, Some(now));
        assert_eq!(done.due_date, Some(due));
        assert_eq!(done.section_name(), "Errands");

        let reopened = done.reopened();
        assert!(!reopened.is_complete);
        assert!(reopened.date_completed.is_none());
        assert_eq!(reopened, task);
    }

    #[test]
    fn test_blank_title_fails_validation() {
        assert!(NewTask::titled(" \t").validate().is_err());
        assert!(NewTask::titled("Water plants").validate().is_ok());
    }

    #[test]
    fn test_missing_optional_fields_decode() {
        let task: Task = serde_json::from_value(serde_json::json!({
            "id": "t1",
            "title": "Legacy",
            "is_complete": false
        }))
        .unwrap();
        assert_eq!(task.section_name(), DEFAULT_SECTION);
        assert!(task.due_date.is_none());
    }
}
